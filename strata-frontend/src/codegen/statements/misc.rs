//! Expression statements, blocks and assertions

use super::super::context::FnCtx;
use super::super::errors::CodegenError;
use super::super::expressions::{lower_cond, lower_expr};
use super::super::IrGenerator;
use super::lower_body;
use crate::ast::{Expr, Stmt};

pub(super) fn lower_expr_stmt(gen: &mut IrGenerator<'_>, ctx: &mut FnCtx, expr: &Expr) -> Result<(), CodegenError> {
    lower_expr(gen, ctx, expr)?;
    Ok(())
}

pub(super) fn lower_block(gen: &mut IrGenerator<'_>, ctx: &mut FnCtx, body: &[Stmt]) -> Result<(), CodegenError> {
    lower_body(gen, ctx, body)
}

/// `assert cond`: a failing condition calls the runtime panic and never returns
pub(super) fn lower_assert(gen: &mut IrGenerator<'_>, ctx: &mut FnCtx, cond: &Expr) -> Result<(), CodegenError> {
    let value = lower_cond(gen, ctx, cond)?;
    let ok = ctx.new_block(gen, "assert.ok")?;
    let fail = ctx.new_block(gen, "assert.fail")?;
    gen.module.build_br(ctx.block, value, ok, fail)?;

    let pos = gen.span(ctx.file, cond.pos);
    let string = gen.runtime.string;
    let message = gen.module.const_str(string, &format!("{pos}: assertion failed"));
    let panic = gen.module.func_ref(gen.runtime.panic);
    let void = gen.module.types.get_void();
    gen.module.build_call(fail, panic, &[message], void)?;
    gen.module.build_unreachable(fail)?;

    ctx.block = ok;
    Ok(())
}
