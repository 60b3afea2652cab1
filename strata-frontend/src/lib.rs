//! Strata middle-end - frontend side
//!
//! This crate turns a checked AST into the Strata IR:
//! - AST: input node definitions and construction helpers
//! - Env: the read-only type environment oracle
//! - Config: build options
//! - Codegen: the multi-phase IR builder

pub mod ast;
pub mod codegen;
pub mod config;
pub mod env;

pub use ast::SourceFile;
pub use codegen::CodegenError;
pub use config::BuildOptions;
pub use env::{CheckedType, MemoryEnv, TypeEnv};

use log::info;
use strata_common::{CompilerError, Diagnostic};
use strata_ir::{build_cfg, compute_dominators, DominatorStats, Module};

/// Finished module with everything learned while building it
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub module: Module,
    /// Fallback warnings recorded by the builder
    pub diagnostics: Vec<Diagnostic>,
    pub dominator_stats: DominatorStats,
}

/// High-level middle-end interface: IR construction, CFG edges, dominators
#[derive(Debug, Clone, Default)]
pub struct Frontend {
    options: BuildOptions,
}

impl Frontend {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build IR for all translation units and compute CFG edges and dominators
    pub fn build(&self, files: &[SourceFile], env: &dyn TypeEnv) -> Result<BuildOutput, CompilerError> {
        let (mut module, diagnostics) = codegen::build(files, env, &self.options)?;
        build_cfg(&mut module);
        let dominator_stats = compute_dominators(&mut module);
        info!(
            "built {}: {} functions, {} blocks, {} diagnostics",
            module.name,
            module.funcs.len(),
            module.total_blocks(),
            diagnostics.len()
        );
        Ok(BuildOutput {
            module,
            diagnostics,
            dominator_stats,
        })
    }

    /// Build IR only, without CFG edges or dominators
    pub fn build_ir(&self, files: &[SourceFile], env: &dyn TypeEnv) -> Result<(Module, Vec<Diagnostic>), CompilerError> {
        codegen::build(files, env, &self.options)
    }
}
