//! `break`, `continue`, `goto`, labels and `return`

use super::super::context::FnCtx;
use super::super::errors::CodegenError;
use super::super::expressions::{lower_expr, lower_expr_as};
use super::super::IrGenerator;
use crate::ast::{Expr, Stmt};
use log::trace;

pub(super) fn lower_break(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    stmt: &Stmt,
    label: Option<&str>,
) -> Result<(), CodegenError> {
    match ctx.find_loop(label).map(|l| l.break_block) {
        Some(target) => {
            gen.module.build_jmp(ctx.block, target)?;
        }
        None => gen.fallback(ctx.file, stmt.pos, "`break` outside of a loop".to_string()),
    }
    Ok(())
}

pub(super) fn lower_continue(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    stmt: &Stmt,
    label: Option<&str>,
) -> Result<(), CodegenError> {
    match ctx.find_loop(label).map(|l| l.continue_block) {
        Some(target) => {
            gen.module.build_jmp(ctx.block, target)?;
        }
        None => gen.fallback(ctx.file, stmt.pos, "`continue` outside of a loop".to_string()),
    }
    Ok(())
}

pub(super) fn lower_goto(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    stmt: &Stmt,
    label: &str,
) -> Result<(), CodegenError> {
    let target = ctx.goto_target(gen, label, stmt.pos)?;
    gen.module.build_jmp(ctx.block, target)?;
    Ok(())
}

pub(super) fn lower_label(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    stmt: &Stmt,
    label: &str,
) -> Result<(), CodegenError> {
    let block = match ctx.define_label(gen, label)? {
        Some(block) => block,
        None => {
            // Gotos already target the first definition; this one only falls through
            gen.fallback(ctx.file, stmt.pos, format!("label `{label}` is defined more than once"));
            ctx.new_block(gen, "label.dup")?
        }
    };
    ctx.switch_to(gen, block)?;
    trace!("label `{label}` at {block}");
    Ok(())
}

/// `return`, `return x` or `return x, y`; several values travel as one
/// aggregate of the return type
pub(super) fn lower_return(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    stmt: &Stmt,
    values: &[Expr],
) -> Result<(), CodegenError> {
    let ret = ctx.ret;
    if gen.module.types.is_void(ret) {
        for value in values {
            lower_expr(gen, ctx, value)?;
        }
        gen.module.build_ret(ctx.block, None)?;
        return Ok(());
    }

    let value = match values {
        [] => gen.zero_value(ret),
        [single] => lower_expr_as(gen, ctx, single, ret)?,
        _ => {
            let mut aggregate = gen.module.undef(ret);
            for (index, value) in values.iter().enumerate() {
                match gen.module.types.element_type(ret, index) {
                    Some(ty) => {
                        let value = lower_expr_as(gen, ctx, value, ty)?;
                        aggregate = gen.module.build_insert(ctx.block, aggregate, value, index)?;
                    }
                    None => {
                        lower_expr(gen, ctx, value)?;
                        let message = format!(
                            "return value {index} does not fit `{}`",
                            gen.module.types.display(ret)
                        );
                        gen.fallback(ctx.file, stmt.pos, message);
                    }
                }
            }
            aggregate
        }
    };
    gen.module.build_ret(ctx.block, Some(value))?;
    Ok(())
}
