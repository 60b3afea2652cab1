//! Error handling for the Strata middle-end
//!
//! This module defines the error type returned across crate boundaries and
//! the diagnostic collector the IR builder records its fallbacks in.

use crate::source_loc::SourceSpan;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main compiler error type shared by every phase of the middle-end
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    #[error("Code generation error at {span}: {message}")]
    CodegenError {
        span: SourceSpan,
        message: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Internal compiler error: {message}")]
    InternalError { message: String },
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with location and severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: SourceSpan,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: String, span: SourceSpan) -> Self {
        Self {
            severity,
            message,
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.span, self.severity, self.message)
    }
}

/// Collects diagnostics while a pass runs
#[derive(Debug, Clone, Default)]
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an error diagnostic
    pub fn error(&mut self, message: String, span: SourceSpan) {
        self.diagnostics.push(Diagnostic::new(Severity::Error, message, span));
        self.error_count += 1;
    }

    /// Report a warning diagnostic
    pub fn warning(&mut self, message: String, span: SourceSpan) {
        self.diagnostics.push(Diagnostic::new(Severity::Warning, message, span));
        self.warning_count += 1;
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Create a summary string
    pub fn summary(&self) -> String {
        match (self.error_count, self.warning_count) {
            (0, 0) => "No errors or warnings".to_string(),
            (0, w) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (e, 0) => format!("{} error{}", e, if e == 1 { "" } else { "s" }),
            (e, w) => format!(
                "{} error{} and {} warning{}",
                e,
                if e == 1 { "" } else { "s" },
                w,
                if w == 1 { "" } else { "s" }
            ),
        }
    }
}

impl CompilerError {
    pub fn codegen_error(message: String, span: SourceSpan) -> Self {
        CompilerError::CodegenError { span, message }
    }

    pub fn config_error(message: String) -> Self {
        CompilerError::ConfigError { message }
    }
}

/// Convert from String (for simple error cases)
impl From<String> for CompilerError {
    fn from(message: String) -> Self {
        CompilerError::InternalError { message }
    }
}
