//! Hand-built CFGs shared by the integration tests

#![allow(dead_code)]

use strata_ir::{build_cfg, BlockId, FuncId, Module};

/// Build a function with `n` blocks whose terminators realise `edges`.
///
/// Block 0 is the entry. Blocks without outgoing edges return; one edge
/// becomes a jump, two a conditional branch, more a switch.
pub fn graph(module: &mut Module, name: &str, n: usize, edges: &[(usize, usize)]) -> (FuncId, Vec<BlockId>) {
    let i32_ty = module.types.get_int(32);
    let f = module.add_function(name, &[i32_ty], i32_ty, false);
    let blocks: Vec<BlockId> = (0..n)
        .map(|i| module.add_block(f, &format!("b{i}")).unwrap())
        .collect();
    let param = module.function(f).unwrap().params[0];

    for (i, block) in blocks.iter().enumerate() {
        let succs: Vec<BlockId> = edges
            .iter()
            .filter(|(from, _)| *from == i)
            .map(|(_, to)| blocks[*to])
            .collect();
        match succs.as_slice() {
            [] => {
                module.build_ret(*block, Some(param)).unwrap();
            }
            [target] => {
                module.build_jmp(*block, *target).unwrap();
            }
            [then_block, else_block] => {
                let zero = module.const_int(i32_ty, 0);
                let cond = module
                    .build_binary(*block, strata_ir::Opcode::Ne, param, zero)
                    .unwrap();
                module.build_br(*block, cond, *then_block, *else_block).unwrap();
            }
            [default, cases @ ..] => {
                let cases: Vec<_> = cases
                    .iter()
                    .enumerate()
                    .map(|(k, target)| (module.const_int(i32_ty, k as i64), *target))
                    .collect();
                module.build_switch(*block, param, *default, &cases).unwrap();
            }
        }
    }
    build_cfg(module);
    (f, blocks)
}

/// Reachability from `entry` while pretending `removed` does not exist
pub fn reachable_without(module: &Module, entry: BlockId, removed: Option<BlockId>) -> Vec<BlockId> {
    let mut seen = Vec::new();
    if Some(entry) == removed {
        return seen;
    }
    let mut stack = vec![entry];
    while let Some(block) = stack.pop() {
        if seen.contains(&block) {
            continue;
        }
        seen.push(block);
        for succ in &module.block(block).unwrap().succs {
            if Some(*succ) != removed && !seen.contains(succ) {
                stack.push(*succ);
            }
        }
    }
    seen
}

/// Definition of dominance: every path from the entry to `b` passes `a`
pub fn brute_dominates(module: &Module, entry: BlockId, a: BlockId, b: BlockId) -> bool {
    let reachable = reachable_without(module, entry, None);
    if !reachable.contains(&a) || !reachable.contains(&b) {
        return false;
    }
    a == b || !reachable_without(module, entry, Some(a)).contains(&b)
}

/// Small deterministic generator for random graphs
pub struct Lcg(pub u64);

impl Lcg {
    pub fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}
