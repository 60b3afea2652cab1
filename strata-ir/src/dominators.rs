//! Dominator Analysis
//!
//! Lengauer–Tarjan over the CFG built by [`crate::cfg::build_cfg`], in the
//! formulation with path compression (`eval`/`link`/`compress`). Vertices are
//! addressed by their 1-based DFS number; 0 means "not reached".
//!
//! Each function is validated before it is analysed. A function whose blocks
//! or edges refer outside the module, or into another function, is skipped
//! with a warning and does not disturb the other functions.

use crate::error::IrError;
use crate::ids::{BlockId, FuncId};
use crate::module::Module;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Summary of one `compute_dominators` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DominatorStats {
    pub functions_analyzed: usize,
    pub functions_skipped: usize,
    pub unreachable_blocks: usize,
}

/// Working storage, sized once for the whole module
struct LengauerTarjan {
    /// DFS number per block index
    dfnum: Vec<usize>,
    /// Block index per DFS number
    vertex: Vec<usize>,
    parent: Vec<usize>,
    semi: Vec<usize>,
    label: Vec<usize>,
    ancestor: Vec<usize>,
    idom: Vec<usize>,
    bucket: Vec<Vec<usize>>,
    path: Vec<usize>,
}

impl LengauerTarjan {
    fn new(total_blocks: usize) -> Self {
        let n = total_blocks + 1;
        Self {
            dfnum: vec![0; total_blocks],
            vertex: vec![0; n],
            parent: vec![0; n],
            semi: vec![0; n],
            label: vec![0; n],
            ancestor: vec![0; n],
            idom: vec![0; n],
            bucket: vec![Vec::new(); n],
            path: Vec::new(),
        }
    }

    fn reset(&mut self, blocks: &[BlockId]) {
        for block in blocks {
            self.dfnum[block.index()] = 0;
        }
        let used = blocks.len().min(self.vertex.len() - 1);
        for i in 0..=used {
            self.vertex[i] = 0;
            self.parent[i] = 0;
            self.semi[i] = 0;
            self.label[i] = 0;
            self.ancestor[i] = 0;
            self.idom[i] = 0;
            self.bucket[i].clear();
        }
    }

    fn number(&mut self, block: usize, parent: usize, n: usize) {
        self.dfnum[block] = n;
        self.vertex[n] = block;
        self.parent[n] = parent;
        self.semi[n] = n;
        self.label[n] = n;
    }

    /// Iterative DFS from the entry; returns the number of reached blocks
    fn dfs(&mut self, module: &Module, entry: usize) -> usize {
        let mut n = 1;
        self.number(entry, 0, n);
        let mut stack = vec![(entry, 0usize)];
        while let Some(&(block, next)) = stack.last() {
            let succs = &module.blocks[block].succs;
            if next < succs.len() {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let succ = succs[next].index();
                if self.dfnum[succ] == 0 {
                    n += 1;
                    self.number(succ, self.dfnum[block], n);
                    stack.push((succ, 0));
                }
            } else {
                stack.pop();
            }
        }
        n
    }

    fn compress(&mut self, v: usize) {
        self.path.clear();
        let mut u = v;
        while self.ancestor[self.ancestor[u]] != 0 {
            self.path.push(u);
            u = self.ancestor[u];
        }
        while let Some(x) = self.path.pop() {
            let a = self.ancestor[x];
            if self.semi[self.label[a]] < self.semi[self.label[x]] {
                self.label[x] = self.label[a];
            }
            self.ancestor[x] = self.ancestor[a];
        }
    }

    fn eval(&mut self, v: usize) -> usize {
        if self.ancestor[v] == 0 {
            v
        } else {
            self.compress(v);
            self.label[v]
        }
    }

    fn link(&mut self, v: usize, w: usize) {
        self.ancestor[w] = v;
    }

    /// Compute immediate dominators (as DFS numbers) for vertices `1..=n`
    fn solve(&mut self, module: &Module, n: usize) {
        for w in (2..=n).rev() {
            let block = self.vertex[w];
            for pred in &module.blocks[block].preds {
                let v = self.dfnum[pred.index()];
                if v == 0 {
                    // Unreachable predecessor
                    continue;
                }
                let u = self.eval(v);
                if self.semi[u] < self.semi[w] {
                    self.semi[w] = self.semi[u];
                }
            }
            let s = self.semi[w];
            self.bucket[s].push(w);
            let p = self.parent[w];
            self.link(p, w);

            let drained = std::mem::take(&mut self.bucket[p]);
            for v in drained {
                let u = self.eval(v);
                self.idom[v] = if self.semi[u] < self.semi[v] { u } else { p };
            }
        }

        for w in 2..=n {
            if self.idom[w] != self.semi[w] {
                self.idom[w] = self.idom[self.idom[w]];
            }
        }
        self.idom[1] = 1;
    }
}

/// Every block and edge of `func` must stay inside the module and the function
fn validate(module: &Module, func: FuncId, blocks: &[BlockId]) -> Result<(), IrError> {
    // A block tagged with `func` but missing from its list would still be
    // reached by the DFS, so edges are checked against the list itself
    let listed: HashSet<BlockId> = blocks.iter().copied().collect();
    let owned = |b: BlockId| -> Result<(), IrError> {
        match module.block(b) {
            Some(block) if block.func == func && listed.contains(&b) => Ok(()),
            _ => Err(IrError::InvalidBlock(b)),
        }
    };
    for block in blocks {
        owned(*block)?;
        let b = &module.blocks[block.index()];
        for edge in b.succs.iter().chain(b.preds.iter()) {
            owned(*edge)?;
        }
    }
    Ok(())
}

/// Compute immediate dominators and dominance trees for every function
pub fn compute_dominators(module: &mut Module) -> DominatorStats {
    let mut stats = DominatorStats::default();
    let mut lt = LengauerTarjan::new(module.total_blocks());

    for index in 0..module.funcs.len() {
        let func = FuncId::new(index);
        let blocks = module.funcs[index].blocks.clone();
        if blocks.is_empty() {
            continue;
        }

        // Clear stale results on whatever blocks are addressable
        for block in &blocks {
            if let Some(b) = module.block_mut(*block) {
                b.idom = None;
                b.dom_children.clear();
            }
        }

        if let Err(err) = validate(module, func, &blocks) {
            warn!(
                "dominators: skipping {}: {}",
                module.funcs[index].name, err
            );
            stats.functions_skipped += 1;
            continue;
        }

        lt.reset(&blocks);
        let n = lt.dfs(module, blocks[0].index());
        lt.solve(module, n);

        for w in 1..=n {
            let block = lt.vertex[w];
            let idom = BlockId::new(lt.vertex[lt.idom[w]]);
            module.blocks[block].idom = Some(idom);
            if w > 1 {
                module.blocks[idom.index()].dom_children.push(BlockId::new(block));
            }
        }

        let unreachable = blocks.len().saturating_sub(n);
        stats.unreachable_blocks += unreachable;
        stats.functions_analyzed += 1;
        debug!(
            "dominators: {} has {} reachable and {} unreachable blocks",
            module.funcs[index].name, n, unreachable
        );
    }

    stats
}

/// Whether `a` dominates `b`. Every reachable block dominates itself;
/// unreachable blocks dominate and are dominated by nothing.
pub fn dominates(module: &Module, a: BlockId, b: BlockId) -> bool {
    if module.block(a).and_then(|blk| blk.idom).is_none() {
        return false;
    }
    let mut current = b;
    // Bounded walk up the tree, in case the idom fields were edited by hand
    for _ in 0..=module.total_blocks() {
        if current == a {
            return true;
        }
        match module.block(current).and_then(|blk| blk.idom) {
            Some(idom) if idom != current => current = idom,
            _ => return false,
        }
    }
    false
}
