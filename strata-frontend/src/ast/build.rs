//! AST construction helpers
//!
//! Every node built here gets a fresh position, so an oracle keyed by
//! position can annotate any of them independently.

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_LINE: AtomicU32 = AtomicU32::new(1);

/// A position no other node built through this module shares
pub fn pos() -> Pos {
    Pos::new(0, NEXT_LINE.fetch_add(1, Ordering::Relaxed), 1)
}

pub fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, pos())
}

pub fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, pos())
}

// Expressions

pub fn int(value: i64) -> Expr {
    expr(ExprKind::IntLit(value))
}

pub fn float(value: f64) -> Expr {
    expr(ExprKind::FloatLit(value))
}

pub fn boolean(value: bool) -> Expr {
    expr(ExprKind::BoolLit(value))
}

pub fn character(value: char) -> Expr {
    expr(ExprKind::CharLit(value))
}

pub fn string(value: &str) -> Expr {
    expr(ExprKind::StringLit(value.to_string()))
}

pub fn nil() -> Expr {
    expr(ExprKind::Nil)
}

pub fn ident(name: &str) -> Expr {
    expr(ExprKind::Ident(name.to_string()))
}

pub fn selector(base: Expr, field: &str) -> Expr {
    expr(ExprKind::Selector {
        base: Box::new(base),
        field: field.to_string(),
    })
}

pub fn enum_val(enum_name: Option<&str>, member: &str) -> Expr {
    expr(ExprKind::EnumVal {
        enum_name: enum_name.map(str::to_string),
        member: member.to_string(),
    })
}

pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    expr(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    expr(ExprKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn paren(inner: Expr) -> Expr {
    expr(ExprKind::Paren(Box::new(inner)))
}

pub fn cast(ty: TypeExpr, value: Expr) -> Expr {
    expr(ExprKind::Cast {
        ty,
        expr: Box::new(value),
    })
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call {
        callee: Box::new(callee),
        args,
    })
}

/// Call of a function by name
pub fn call_fn(name: &str, args: Vec<Expr>) -> Expr {
    call(ident(name), args)
}

/// `receiver.method(args)`, also used for `module.function(args)`
pub fn method_call(receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
    call(selector(receiver, method), args)
}

pub fn index(base: Expr, idx: Expr) -> Expr {
    expr(ExprKind::Index {
        base: Box::new(base),
        index: Box::new(idx),
    })
}

pub fn addr_of(inner: Expr) -> Expr {
    expr(ExprKind::AddrOf(Box::new(inner)))
}

pub fn deref(inner: Expr) -> Expr {
    expr(ExprKind::Deref(Box::new(inner)))
}

pub fn struct_lit(name: &str, fields: Vec<(&str, Expr)>) -> Expr {
    expr(ExprKind::StructLit {
        ty: TypeExpr::named(name),
        fields: fields
            .into_iter()
            .map(|(n, e)| (n.to_string(), e))
            .collect(),
    })
}

pub fn array(elems: Vec<Expr>, fixed: bool) -> Expr {
    expr(ExprKind::ArrayLit { elems, fixed })
}

pub fn size_of(ty: TypeExpr) -> Expr {
    expr(ExprKind::SizeOf(ty))
}

pub fn anon_fn(decl: FnDecl) -> Expr {
    expr(ExprKind::AnonFn(Box::new(decl)))
}

// Types

pub fn ty(name: &str) -> TypeExpr {
    TypeExpr::named(name)
}

pub fn ty_qualified(module: &str, name: &str) -> TypeExpr {
    TypeExpr::Named {
        module: Some(module.to_string()),
        name: name.to_string(),
    }
}

pub fn ty_ptr(base: TypeExpr) -> TypeExpr {
    TypeExpr::Ptr(Box::new(base))
}

pub fn ty_array(elem: TypeExpr, len: Expr) -> TypeExpr {
    TypeExpr::Array {
        elem: Box::new(elem),
        len: Box::new(len),
    }
}

pub fn ty_dyn_array(elem: TypeExpr) -> TypeExpr {
    TypeExpr::DynArray(Box::new(elem))
}

pub fn ty_tuple(elems: Vec<TypeExpr>) -> TypeExpr {
    TypeExpr::Tuple(elems)
}

// Statements

pub fn expr_stmt(e: Expr) -> Stmt {
    stmt(StmtKind::Expr(e))
}

pub fn decl(name: &str, value: Expr) -> Stmt {
    decl_multi(&[name], vec![value])
}

pub fn decl_multi(names: &[&str], values: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Decl {
        names: names.iter().map(|n| n.to_string()).collect(),
        values,
    })
}

pub fn assign(target: Expr, value: Expr) -> Stmt {
    assign_op(AssignOp::Assign, target, value)
}

pub fn assign_op(op: AssignOp, target: Expr, value: Expr) -> Stmt {
    stmt(StmtKind::Assign {
        op,
        targets: vec![target],
        values: vec![value],
    })
}

pub fn assign_multi(targets: Vec<Expr>, values: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Assign {
        op: AssignOp::Assign,
        targets,
        values,
    })
}

pub fn block(body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Block(body))
}

pub fn if_else(cond: Expr, then_body: Vec<Stmt>, else_body: Option<Vec<Stmt>>) -> Stmt {
    stmt(StmtKind::If {
        cond,
        then_body,
        else_body,
    })
}

pub fn for_c(init: Option<Stmt>, cond: Option<Expr>, post: Option<Stmt>, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::For {
        label: None,
        init: init.map(Box::new),
        cond,
        post: post.map(Box::new),
        body,
    })
}

pub fn for_range(var: &str, lo: Expr, hi: Expr, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::ForIn {
        label: None,
        key: None,
        value: Some(var.to_string()),
        iter: ForIter::Range(lo, hi),
        body,
    })
}

pub fn for_in(key: Option<&str>, value: Option<&str>, collection: Expr, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::ForIn {
        label: None,
        key: key.map(str::to_string),
        value: value.map(str::to_string),
        iter: ForIter::Collection(collection),
        body,
    })
}

/// Attach a label to a loop statement
pub fn labelled(name: &str, mut looping: Stmt) -> Stmt {
    match &mut looping.kind {
        StmtKind::For { label, .. } | StmtKind::ForIn { label, .. } => {
            *label = Some(name.to_string());
        }
        _ => {}
    }
    looping
}

pub fn break_(label: Option<&str>) -> Stmt {
    stmt(StmtKind::Break(label.map(str::to_string)))
}

pub fn continue_(label: Option<&str>) -> Stmt {
    stmt(StmtKind::Continue(label.map(str::to_string)))
}

pub fn goto(label: &str) -> Stmt {
    stmt(StmtKind::Goto(label.to_string()))
}

pub fn label(name: &str) -> Stmt {
    stmt(StmtKind::Label(name.to_string()))
}

pub fn match_(subject: Expr, arms: Vec<(Vec<Expr>, Vec<Stmt>)>, else_body: Option<Vec<Stmt>>) -> Stmt {
    stmt(StmtKind::Match {
        subject,
        arms: arms
            .into_iter()
            .map(|(labels, body)| MatchArm { labels, body })
            .collect(),
        else_body,
    })
}

pub fn assert_(cond: Expr) -> Stmt {
    stmt(StmtKind::Assert(cond))
}

pub fn ret(values: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Return(values))
}

// Declarations

pub fn param(name: &str, ty: TypeExpr) -> Param {
    Param {
        name: name.to_string(),
        ty,
        pos: pos(),
    }
}

pub fn function(name: &str, params: Vec<Param>, ret: Option<TypeExpr>, body: Vec<Stmt>) -> FnDecl {
    FnDecl {
        name: name.to_string(),
        receiver: None,
        params,
        ret,
        body: Some(body),
        is_extern: false,
        is_variadic: false,
        pos: pos(),
    }
}

pub fn method(
    receiver: Param,
    name: &str,
    params: Vec<Param>,
    ret: Option<TypeExpr>,
    body: Vec<Stmt>,
) -> FnDecl {
    FnDecl {
        receiver: Some(receiver),
        ..function(name, params, ret, body)
    }
}

pub fn extern_fn(name: &str, params: Vec<Param>, ret: Option<TypeExpr>, is_variadic: bool) -> FnDecl {
    FnDecl {
        body: None,
        is_extern: true,
        is_variadic,
        ..function(name, params, ret, Vec::new())
    }
}

pub fn field(name: &str, ty: TypeExpr) -> FieldDecl {
    FieldDecl {
        name: name.to_string(),
        ty,
        pos: pos(),
    }
}

pub fn struct_decl(name: &str, fields: Vec<FieldDecl>) -> Item {
    Item::Struct(StructDecl {
        name: name.to_string(),
        embeds: Vec::new(),
        fields,
        is_union: false,
        pos: pos(),
    })
}

pub fn struct_with_embeds(name: &str, embeds: Vec<TypeExpr>, fields: Vec<FieldDecl>) -> Item {
    Item::Struct(StructDecl {
        name: name.to_string(),
        embeds,
        fields,
        is_union: false,
        pos: pos(),
    })
}

pub fn union_decl(name: &str, fields: Vec<FieldDecl>) -> Item {
    Item::Struct(StructDecl {
        name: name.to_string(),
        embeds: Vec::new(),
        fields,
        is_union: true,
        pos: pos(),
    })
}

pub fn enum_decl(name: &str, is_flag: bool, members: Vec<(&str, Option<Expr>)>) -> Item {
    Item::Enum(EnumDecl {
        name: name.to_string(),
        is_flag,
        members: members
            .into_iter()
            .map(|(n, value)| EnumMember {
                name: n.to_string(),
                value,
                pos: pos(),
            })
            .collect(),
        pos: pos(),
    })
}

pub fn sum_type(name: &str, variants: Vec<TypeExpr>) -> Item {
    Item::SumType(SumTypeDecl {
        name: name.to_string(),
        variants,
        pos: pos(),
    })
}

pub fn const_decl(name: &str, value: Expr) -> Item {
    Item::Const(ConstDecl {
        name: name.to_string(),
        value,
        pos: pos(),
    })
}

pub fn global_decl(name: &str, ty: Option<TypeExpr>, init: Option<Expr>) -> Item {
    Item::Global(GlobalDecl {
        name: name.to_string(),
        ty,
        init,
        pos: pos(),
    })
}

pub fn file(module: &str, items: Vec<Item>) -> SourceFile {
    SourceFile {
        module: module.to_string(),
        path: format!("{module}.v"),
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_are_unique() {
        let a = int(1);
        let b = int(1);
        assert_ne!(a.pos, b.pos);
        assert_eq!(a.kind, b.kind);
    }

    #[test]
    fn test_labelled_loop() {
        let looping = labelled("outer", for_c(None, None, None, vec![]));
        match looping.kind {
            StmtKind::For { label, .. } => assert_eq!(label.as_deref(), Some("outer")),
            other => panic!("expected a for loop, got {other:?}"),
        }
    }
}
