//! Basic Block Management
//!
//! A basic block is a straight-line list of instruction values ending in one
//! terminator. The edge and dominator fields are derived data: they are
//! rebuilt from scratch by [`crate::cfg::build_cfg`] and
//! [`crate::dominators::compute_dominators`] and mean nothing before those run.

use crate::ids::{BlockId, FuncId, ValueId};
use serde::{Deserialize, Serialize};

/// Basic Block - a sequence of instructions with a single entry and exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub func: FuncId,
    pub instrs: Vec<ValueId>,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
    /// Immediate dominator; `None` for blocks unreachable from the entry
    pub idom: Option<BlockId>,
    pub dom_children: Vec<BlockId>,
}

impl Block {
    pub fn new(name: String, func: FuncId) -> Self {
        Self {
            name,
            func,
            instrs: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
            idom: None,
            dom_children: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn last(&self) -> Option<ValueId> {
        self.instrs.last().copied()
    }
}
