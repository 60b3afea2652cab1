//! IR error types

use crate::ids::{BlockId, FuncId, GlobalId, TypeId, ValueId};
use strata_common::CompilerError;
use thiserror::Error;

/// Misuse of the module arena
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IrError {
    #[error("unknown block {0}")]
    InvalidBlock(BlockId),

    #[error("unknown value {0}")]
    InvalidValue(ValueId),

    #[error("unknown type {0}")]
    InvalidType(TypeId),

    #[error("unknown function {0}")]
    InvalidFunction(FuncId),

    #[error("unknown global {0}")]
    InvalidGlobal(GlobalId),

    #[error("block {0} already ends in a terminator")]
    BlockTerminated(BlockId),

    #[error("struct {0} cannot be filled: {1}")]
    InvalidStructFill(TypeId, String),
}

impl From<IrError> for CompilerError {
    fn from(err: IrError) -> Self {
        CompilerError::InternalError {
            message: format!("IR construction failed: {err}"),
        }
    }
}
