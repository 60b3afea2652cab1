//! Code generation error types

use strata_common::{CompilerError, SourceSpan};
use strata_ir::IrError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    #[error("Invalid lvalue at {span}")]
    InvalidLvalue { span: SourceSpan },

    #[error("{count} fallback(s) taken, first at {span}: {message}")]
    UnresolvedSymbol {
        count: usize,
        span: SourceSpan,
        message: String,
    },

    #[error("Internal error at {span}: {message}")]
    InternalError { span: SourceSpan, message: String },

    #[error(transparent)]
    Ir(#[from] IrError),
}

impl From<CodegenError> for CompilerError {
    fn from(err: CodegenError) -> Self {
        match err {
            CodegenError::InvalidLvalue { span } => {
                CompilerError::codegen_error("expression is not assignable".to_string(), span)
            }
            CodegenError::UnresolvedSymbol {
                count,
                span,
                message,
            } => CompilerError::codegen_error(
                format!("{count} unresolved symbol fallback(s) in strict mode; first: {message}"),
                span,
            ),
            CodegenError::InternalError { span, message } => {
                CompilerError::codegen_error(message, span)
            }
            CodegenError::Ir(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::BlockId;

    #[test]
    fn test_into_compiler_error() {
        let err: CompilerError = CodegenError::InvalidLvalue {
            span: SourceSpan::dummy(),
        }
        .into();
        assert!(matches!(err, CompilerError::CodegenError { .. }));

        let err: CompilerError = CodegenError::from(IrError::BlockTerminated(BlockId(3))).into();
        assert!(matches!(err, CompilerError::InternalError { .. }));
    }
}
