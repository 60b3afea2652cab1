//! Struct and array literals

use super::super::context::FnCtx;
use super::super::errors::CodegenError;
use super::super::IrGenerator;
use super::access::{element_type, resolve_field};
use super::identifiers::unresolved;
use super::{convert, lower_expr, lower_expr_as};
use crate::ast::{Expr, TypeExpr};
use crate::env::CheckedType;
use log::trace;
use strata_ir::{Opcode, TypeId, ValueId};

/// Struct literal built in a zeroed slot, so missing fields read as zero
pub(super) fn lower_struct_lit(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    ty: &TypeExpr,
    fields: &[(String, Expr)],
) -> Result<ValueId, CodegenError> {
    let st = gen.resolve_type(ctx.file, expr.pos, ty);
    if !gen.is_struct(st) {
        for (_, value) in fields {
            lower_expr(gen, ctx, value)?;
        }
        let message = format!("`{}` is not a struct", gen.module.types.display(st));
        return Ok(unresolved(gen, ctx, expr, message));
    }

    let slot = ctx.new_slot(gen, st)?;
    let zero = gen.module.const_zero(st);
    gen.module.build_store(ctx.block, zero, slot)?;

    for (name, value) in fields {
        match resolve_field(gen, expr, st, name) {
            Some(index) => {
                let field_ty = element_type(gen, st, index);
                let value = lower_expr_as(gen, ctx, value, field_ty)?;
                let field_ptr = gen.module.build_field_ptr(ctx.block, slot, index)?;
                gen.module.build_store(ctx.block, value, field_ptr)?;
            }
            None => {
                lower_expr(gen, ctx, value)?;
                let message = format!("`{}` has no field `{name}`", gen.module.types.display(st));
                gen.fallback(ctx.file, value.pos, message);
            }
        }
    }
    Ok(gen.module.build_load(ctx.block, slot, st)?)
}

/// Array literal: elements are stored into a fixed array slot; a dynamic
/// array is then created from it by the runtime
pub(super) fn lower_array_lit(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    elems: &[Expr],
    fixed: bool,
) -> Result<ValueId, CodegenError> {
    let hint = element_hint(gen, ctx, expr);
    let mut values = Vec::with_capacity(elems.len());
    for elem in elems {
        values.push(lower_expr(gen, ctx, elem)?);
    }
    let elem_ty = match (hint, values.first()) {
        (Some(ty), _) => ty,
        (None, Some(first)) => gen.module.value_type(*first),
        (None, None) => gen.int_type(),
    };

    let array_ty = gen.module.types.get_array(elem_ty, values.len() as u64);
    let slot = ctx.new_slot(gen, array_ty)?;
    let elem_ptr = gen.module.types.get_ptr(elem_ty);
    let first = gen.module.build_cast(ctx.block, Opcode::Bitcast, slot, elem_ptr)?;
    let i32_ty = gen.module.types.get_int(32);
    for (i, value) in values.into_iter().enumerate() {
        let value = convert(gen, ctx, value, elem_ty)?;
        let index = gen.module.const_int(i32_ty, i as i64);
        let ptr = gen.module.build_gep(ctx.block, first, index)?;
        gen.module.build_store(ctx.block, value, ptr)?;
    }

    if fixed {
        return Ok(gen.module.build_load(ctx.block, slot, array_ty)?);
    }

    let len = gen.module.const_int(i32_ty, elems.len() as i64);
    let size = i64::try_from(gen.module.types.size_of(elem_ty)).unwrap_or(0);
    let elem_size = gen.module.const_int(i32_ty, size);
    let byte_ptr = gen.byte_ptr_type();
    let data = gen.module.build_cast(ctx.block, Opcode::Bitcast, slot, byte_ptr)?;
    let callee = gen.module.func_ref(gen.runtime.new_array);
    let array = gen.runtime.array;
    trace!("dynamic array literal of {} x {}", elems.len(), gen.module.types.display(elem_ty));
    Ok(gen
        .module
        .build_call(ctx.block, callee, &[len, len, elem_size, data], array)?)
}

/// Element type the checker gave the literal
fn element_hint(gen: &mut IrGenerator<'_>, ctx: &FnCtx, expr: &Expr) -> Option<TypeId> {
    let env = gen.env;
    match env.type_of(expr.pos)? {
        CheckedType::Array { elem, .. } | CheckedType::DynArray(elem) => Some(gen.checked_to_ir(ctx.file, expr.pos, elem)),
        _ => None,
    }
}
