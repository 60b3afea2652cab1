//! Function Definitions

use crate::ids::{BlockId, TypeId, ValueId};
use serde::{Deserialize, Serialize};

/// Function in IR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Mangled symbol name
    pub name: String,
    pub ret: TypeId,
    pub params: Vec<ValueId>,
    /// Owned blocks, the first one is the entry
    pub blocks: Vec<BlockId>,
    pub is_extern: bool,
    pub is_variadic: bool,
}

impl Function {
    pub fn new(name: String, ret: TypeId) -> Self {
        Self {
            name,
            ret,
            params: Vec::new(),
            blocks: Vec::new(),
            is_extern: false,
            is_variadic: false,
        }
    }

    pub fn entry(&self) -> Option<BlockId> {
        self.blocks.first().copied()
    }

    /// Functions without blocks are declarations only
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }
}
