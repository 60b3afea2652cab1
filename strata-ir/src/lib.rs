//! Strata IR
//!
//! Arena-based intermediate representation for the Strata middle-end.
//!
//! ## Architecture
//!
//! - `ids` - typed handles into the module arena
//! - `types` - Type Store (interning registry of IR types)
//! - `values` - SSA values
//! - `instructions` - opcodes and instructions
//! - `blocks` - basic blocks with derived CFG and dominator fields
//! - `function` - function definitions
//! - `module` - the arena owning everything above, plus globals
//! - `builder` - instruction construction helpers
//! - `display` - textual dumps
//! - `cfg` - edge construction from terminators
//! - `dominators` - Lengauer–Tarjan immediate dominators

pub use self::blocks::Block;
pub use self::cfg::{build_cfg, build_function_cfg};
pub use self::dominators::{compute_dominators, dominates, DominatorStats};
pub use self::error::IrError;
pub use self::function::Function;
pub use self::ids::{BlockId, FuncId, GlobalId, InstrId, TypeId, ValueId};
pub use self::instructions::{Instr, Opcode};
pub use self::module::{GlobalVar, Module};
pub use self::types::{FuncType, StructType, Type, TypeStore};
pub use self::values::{Value, ValueKind};

mod blocks;
mod builder;
mod cfg;
mod display;
mod dominators;
mod error;
mod function;
mod ids;
mod instructions;
mod module;
mod types;
mod values;

#[cfg(test)]
mod tests;
