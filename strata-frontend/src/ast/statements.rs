//! Statement nodes

use super::expressions::Expr;
use super::ops::AssignOp;
use super::Pos;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Expr(Expr),

    /// `a := x` or `a, b := x, y` or `a, b := f()`
    Decl {
        names: Vec<String>,
        values: Vec<Expr>,
    },

    /// `a = x`, `a += x`, `a, b = b, a`
    Assign {
        op: AssignOp,
        targets: Vec<Expr>,
        values: Vec<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },

    /// C-style loop; all three header parts are optional
    For {
        label: Option<String>,
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },

    /// `for key, value in iter`
    ForIn {
        label: Option<String>,
        key: Option<String>,
        value: Option<String>,
        iter: ForIter,
        body: Vec<Stmt>,
    },

    Break(Option<String>),
    Continue(Option<String>),

    Goto(String),
    Label(String),

    Match {
        subject: Expr,
        arms: Vec<MatchArm>,
        else_body: Option<Vec<Stmt>>,
    },

    Assert(Expr),

    Return(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForIter {
    /// `lo .. hi`, exclusive upper bound
    Range(Expr, Expr),
    /// Fixed array, dynamic array or string
    Collection(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchArm {
    pub labels: Vec<Expr>,
    pub body: Vec<Stmt>,
}

impl Stmt {
    pub fn new(kind: StmtKind, pos: Pos) -> Self {
        Self { kind, pos }
    }
}
