//! Abstract Syntax Tree consumed by the IR builder
//!
//! The parser and type checker are external; this module only defines the
//! shape of what they hand over. Every node carries a [`Pos`] that the type
//! environment oracle is keyed by.

pub mod build;
pub mod expressions;
pub mod items;
pub mod ops;
pub mod statements;

pub use expressions::{Expr, ExprKind, TypeExpr};
pub use items::{
    ConstDecl, EnumDecl, EnumMember, FieldDecl, FnDecl, GlobalDecl, Item, Param, SourceFile,
    StructDecl, SumTypeDecl,
};
pub use ops::{AssignOp, BinaryOp, UnaryOp};
pub use statements::{ForIter, MatchArm, Stmt, StmtKind};

use serde::{Deserialize, Serialize};

/// Position of a node; unique per node across all translation units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Pos {
    pub file: u32,
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn new(file: u32, line: u32, col: u32) -> Self {
        Self { file, line, col }
    }
}
