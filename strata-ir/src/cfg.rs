//! Control Flow Graph construction
//!
//! Edges are derived purely from block terminators. Every run clears and
//! rebuilds the predecessor and successor lists, so the pass can be repeated
//! after the IR has been edited.

use crate::ids::{BlockId, FuncId};
use crate::instructions::Opcode;
use crate::module::Module;
use log::{debug, trace, warn};

/// Rebuild predecessor and successor lists for every function in the module
pub fn build_cfg(module: &mut Module) {
    for index in 0..module.funcs.len() {
        build_function_cfg(module, FuncId::new(index));
    }
}

/// Rebuild the edges of a single function
pub fn build_function_cfg(module: &mut Module, func: FuncId) {
    let Some(blocks) = module.function(func).map(|f| f.blocks.clone()) else {
        return;
    };

    for block in &blocks {
        if let Some(b) = module.block_mut(*block) {
            b.preds.clear();
            b.succs.clear();
        }
    }

    let total = module.total_blocks();
    let mut edges = 0;
    for block in &blocks {
        let targets = terminator_targets(module, *block);
        let mut seen: Vec<BlockId> = Vec::with_capacity(targets.len());
        for target in targets {
            if target.index() >= total {
                warn!(
                    "cfg: {} in {} jumps to out-of-range {}",
                    block,
                    module.function(func).map_or("?", |f| f.name.as_str()),
                    target
                );
                continue;
            }
            if !seen.contains(&target) {
                seen.push(target);
            }
        }

        for target in &seen {
            if let Some(t) = module.block_mut(*target) {
                t.preds.push(*block);
            }
        }
        edges += seen.len();
        if let Some(b) = module.block_mut(*block) {
            b.succs = seen;
        }
    }

    debug!(
        "cfg: {} blocks, {} edges in {}",
        blocks.len(),
        edges,
        module.function(func).map_or("?", |f| f.name.as_str())
    );
}

/// Successor blocks named by the terminator of `block`, duplicates included
fn terminator_targets(module: &Module, block: BlockId) -> Vec<BlockId> {
    let Some(term) = module.terminator(block) else {
        trace!("cfg: {block} has no terminator");
        return Vec::new();
    };
    let operands = match term.op {
        Opcode::Switch => term.switch_targets(),
        _ => term.target_operands().to_vec(),
    };
    operands
        .into_iter()
        .filter_map(|v| module.value(v).and_then(|value| value.as_block()))
        .collect()
}
