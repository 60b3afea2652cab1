//! Top-level declarations and translation units

use super::expressions::{Expr, TypeExpr};
use super::statements::Stmt;
use super::Pos;
use serde::{Deserialize, Serialize};

/// One translation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Declaring module, used for name mangling
    pub module: String,
    /// Path used in diagnostics
    pub path: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Struct(StructDecl),
    Enum(EnumDecl),
    SumType(SumTypeDecl),
    Const(ConstDecl),
    Global(GlobalDecl),
    Fn(FnDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    /// Embedded structs whose fields are prepended to this one's
    pub embeds: Vec<TypeExpr>,
    pub fields: Vec<FieldDecl>,
    pub is_union: bool,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    /// Flag enums number their members with powers of two
    pub is_flag: bool,
    pub members: Vec<EnumMember>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: Option<Expr>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumTypeDecl {
    pub name: String,
    pub variants: Vec<TypeExpr>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstDecl {
    pub name: String,
    pub value: Expr,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalDecl {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnDecl {
    pub name: String,
    /// Method receiver
    pub receiver: Option<Param>,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    /// `None` for declarations without a body
    pub body: Option<Vec<Stmt>>,
    /// Externally defined; keeps its bare symbol name
    pub is_extern: bool,
    pub is_variadic: bool,
    pub pos: Pos,
}
