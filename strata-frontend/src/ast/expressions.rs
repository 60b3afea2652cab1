//! Expression and type-expression nodes

use super::ops::{BinaryOp, UnaryOp};
use super::items::FnDecl;
use super::Pos;
use serde::{Deserialize, Serialize};

/// Expression with position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    CharLit(char),
    StringLit(String),
    Nil,

    Ident(String),

    /// `base.field`: field access, or a module-qualified reference when
    /// `base` names a module
    Selector {
        base: Box<Expr>,
        field: String,
    },

    /// `Enum.member`, or `.member` with the enum inferred from context
    EnumVal {
        enum_name: Option<String>,
        member: String,
    },

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Paren(Box<Expr>),

    Cast {
        ty: TypeExpr,
        expr: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },

    AddrOf(Box<Expr>),
    Deref(Box<Expr>),

    StructLit {
        ty: TypeExpr,
        fields: Vec<(String, Expr)>,
    },

    /// `[a, b, c]!` when `fixed`, otherwise a dynamic array
    ArrayLit {
        elems: Vec<Expr>,
        fixed: bool,
    },

    SizeOf(TypeExpr),

    AnonFn(Box<FnDecl>),
}

/// Source-level type annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    /// Builtin scalar or user type, optionally module-qualified
    Named {
        module: Option<String>,
        name: String,
    },
    Ptr(Box<TypeExpr>),
    /// Fixed-size array; the length is a constant expression
    Array {
        elem: Box<TypeExpr>,
        len: Box<Expr>,
    },
    DynArray(Box<TypeExpr>),
    /// Multi-value return shape
    Tuple(Vec<TypeExpr>),
    Fn {
        params: Vec<TypeExpr>,
        ret: Option<Box<TypeExpr>>,
    },
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Named {
            module: None,
            name: name.to_string(),
        }
    }
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Pos) -> Self {
        Self { kind, pos }
    }

    /// Strip any number of parentheses
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let ExprKind::Paren(inner) = &expr.kind {
            expr = inner;
        }
        expr
    }
}
