//! Statement lowering

mod control_flow;
mod declarations;
mod jumps;
mod misc;

use super::context::FnCtx;
use super::errors::CodegenError;
use super::IrGenerator;
use crate::ast::{Stmt, StmtKind};

/// Lower one statement into the current block of `ctx`
pub(crate) fn lower_stmt(gen: &mut IrGenerator<'_>, ctx: &mut FnCtx, stmt: &Stmt) -> Result<(), CodegenError> {
    // Labels start their own block, everything else needs an open one
    if !matches!(stmt.kind, StmtKind::Label(_)) {
        ctx.ensure_open(gen)?;
    }
    match &stmt.kind {
        StmtKind::Expr(expr) => misc::lower_expr_stmt(gen, ctx, expr),
        StmtKind::Decl { names, values } => declarations::lower_decl(gen, ctx, stmt, names, values),
        StmtKind::Assign { op, targets, values } => declarations::lower_assign(gen, ctx, stmt, *op, targets, values),
        StmtKind::Block(body) => misc::lower_block(gen, ctx, body),
        StmtKind::If {
            cond,
            then_body,
            else_body,
        } => control_flow::lower_if(gen, ctx, cond, then_body, else_body.as_deref()),
        StmtKind::For {
            label,
            init,
            cond,
            post,
            body,
        } => control_flow::lower_for(
            gen,
            ctx,
            label.as_deref(),
            init.as_deref(),
            cond.as_ref(),
            post.as_deref(),
            body,
        ),
        StmtKind::ForIn {
            label,
            key,
            value,
            iter,
            body,
        } => control_flow::lower_for_in(
            gen,
            ctx,
            stmt,
            label.as_deref(),
            key.as_deref(),
            value.as_deref(),
            iter,
            body,
        ),
        StmtKind::Break(label) => jumps::lower_break(gen, ctx, stmt, label.as_deref()),
        StmtKind::Continue(label) => jumps::lower_continue(gen, ctx, stmt, label.as_deref()),
        StmtKind::Goto(label) => jumps::lower_goto(gen, ctx, stmt, label),
        StmtKind::Label(label) => jumps::lower_label(gen, ctx, stmt, label),
        StmtKind::Match {
            subject,
            arms,
            else_body,
        } => control_flow::lower_match(gen, ctx, subject, arms, else_body.as_deref()),
        StmtKind::Assert(cond) => misc::lower_assert(gen, ctx, cond),
        StmtKind::Return(values) => jumps::lower_return(gen, ctx, stmt, values),
    }
}

/// Lower a statement list in a fresh lexical scope
pub(crate) fn lower_body(gen: &mut IrGenerator<'_>, ctx: &mut FnCtx, body: &[Stmt]) -> Result<(), CodegenError> {
    ctx.push_scope();
    let result = body.iter().try_for_each(|stmt| lower_stmt(gen, ctx, stmt));
    ctx.pop_scope();
    result
}
