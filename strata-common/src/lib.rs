//! Strata middle-end - Common Types and Utilities
//! 
//! This crate contains the error type, diagnostics, and source locations
//! shared by the IR crate and the IR builder.

pub mod error;
pub mod source_loc;

pub use error::{CompilerError, Diagnostic, ErrorReporter, Severity};
pub use source_loc::{SourceLocation, SourceSpan};
