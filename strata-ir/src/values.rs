//! IR Value Representations
//!
//! A value is an SSA definition. Its producing definition never changes once
//! created; source-level mutation goes through stack slots instead.

use crate::ids::{BlockId, FuncId, GlobalId, InstrId, TypeId};
use serde::{Deserialize, Serialize};

/// What produced a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueKind {
    ConstInt(i64),
    ConstFloat(f64),
    ConstStr(String),
    ConstNull,
    /// All-zero value of any type, used for aggregate zero initialisation
    ConstZero,
    Undef,

    /// Address of a global variable
    Global(GlobalId),

    /// Reference to a function, the callee operand of direct calls
    Func(FuncId),

    /// Reference to a block, the target operand of terminators
    Block(BlockId),

    /// Incoming parameter of a function
    Param { func: FuncId, index: u32 },

    /// Result of an instruction
    Instr(InstrId),
}

/// An SSA value and its type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub kind: ValueKind,
    pub ty: TypeId,
}

impl Value {
    pub fn new(kind: ValueKind, ty: TypeId) -> Self {
        Self { kind, ty }
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::ConstInt(_)
                | ValueKind::ConstFloat(_)
                | ValueKind::ConstStr(_)
                | ValueKind::ConstNull
                | ValueKind::ConstZero
        )
    }

    pub fn as_const_int(&self) -> Option<i64> {
        match self.kind {
            ValueKind::ConstInt(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<BlockId> {
        match self.kind {
            ValueKind::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_instr(&self) -> Option<InstrId> {
        match self.kind {
            ValueKind::Instr(i) => Some(i),
            _ => None,
        }
    }
}
