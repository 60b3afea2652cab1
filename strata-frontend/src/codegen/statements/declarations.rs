//! Variable declarations and assignments

use super::super::context::{FnCtx, Local};
use super::super::errors::CodegenError;
use super::super::expressions::{binary_values, convert, lower_expr, lower_lvalue};
use super::super::IrGenerator;
use crate::ast::{AssignOp, Expr, ExprKind, Stmt};
use log::trace;
use strata_ir::ValueId;

/// Name that discards the value bound to it
const BLANK: &str = "_";

/// `a := x`, `a, b := x, y` or `a, b := f()`
pub(super) fn lower_decl(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    stmt: &Stmt,
    names: &[String],
    values: &[Expr],
) -> Result<(), CodegenError> {
    let values = lower_values(gen, ctx, stmt, values, names.len())?;
    for (name, value) in names.iter().zip(values) {
        if name == BLANK {
            continue;
        }
        let ty = gen.module.value_type(value);
        let slot = ctx.new_slot(gen, ty)?;
        gen.module.build_store(ctx.block, value, slot)?;
        ctx.bind(name, Local { slot, ty });
        trace!("declared `{name}` in {slot}");
    }
    Ok(())
}

pub(super) fn lower_assign(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    stmt: &Stmt,
    op: AssignOp,
    targets: &[Expr],
    values: &[Expr],
) -> Result<(), CodegenError> {
    if let Some(bin) = op.binary_op() {
        for (target, value) in targets.iter().zip(values) {
            let (ptr, ty) = lower_lvalue(gen, ctx, target)?;
            let current = gen.module.build_load(ctx.block, ptr, ty)?;
            let rhs = lower_expr(gen, ctx, value)?;
            let result = binary_values(gen, ctx, target, bin, current, rhs)?;
            let result = convert(gen, ctx, result, ty)?;
            gen.module.build_store(ctx.block, result, ptr)?;
        }
        return Ok(());
    }

    // Every right-hand side is read before the first store, so swaps work
    let values = lower_values(gen, ctx, stmt, values, targets.len())?;
    for (target, value) in targets.iter().zip(values) {
        if matches!(&target.kind, ExprKind::Ident(name) if name == BLANK) {
            continue;
        }
        let (ptr, ty) = lower_lvalue(gen, ctx, target)?;
        let value = convert(gen, ctx, value, ty)?;
        gen.module.build_store(ctx.block, value, ptr)?;
    }
    Ok(())
}

/// Lower the right-hand sides of a binding of `count` names. A single value
/// bound to several names is a multi-valued result split by extraction.
fn lower_values(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    stmt: &Stmt,
    values: &[Expr],
    count: usize,
) -> Result<Vec<ValueId>, CodegenError> {
    let mut lowered = Vec::with_capacity(values.len());
    for value in values {
        lowered.push(lower_expr(gen, ctx, value)?);
    }
    if lowered.len() == count {
        return Ok(lowered);
    }

    if let [aggregate] = lowered[..] {
        let ty = gen.module.value_type(aggregate);
        let mut parts = Vec::with_capacity(count);
        for index in 0..count {
            if gen.module.types.element_type(ty, index).is_some() {
                parts.push(gen.module.build_extract(ctx.block, aggregate, index)?);
            } else {
                parts.push(missing_value(gen, ctx, stmt, index));
            }
        }
        return Ok(parts);
    }

    let message = format!("{count} names bound to {} values", lowered.len());
    gen.fallback(ctx.file, stmt.pos, message);
    lowered.truncate(count);
    while lowered.len() < count {
        let ty = gen.fallback_int_type();
        lowered.push(gen.module.const_int(ty, 0));
    }
    Ok(lowered)
}

fn missing_value(gen: &mut IrGenerator<'_>, ctx: &FnCtx, stmt: &Stmt, index: usize) -> ValueId {
    gen.fallback(ctx.file, stmt.pos, format!("result {index} of a multi-valued expression is missing"));
    let ty = gen.fallback_int_type();
    gen.module.const_int(ty, 0)
}
