//! Field access, indexing, address-of and dereference

use super::super::context::FnCtx;
use super::super::errors::CodegenError;
use super::super::runtime::{ARRAY_DATA_FIELD, STRING_DATA_FIELD};
use super::super::IrGenerator;
use super::identifiers::unresolved;
use super::{is_addressable, lower_expr, lower_lvalue, spill};
use crate::ast::Expr;
use crate::env::CheckedType;
use log::trace;
use strata_ir::{Opcode, Type, TypeId, ValueId};

/// Rvalue `base.field`
pub(super) fn lower_field(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    base: &Expr,
    field: &str,
) -> Result<ValueId, CodegenError> {
    if is_addressable(gen, ctx, base) {
        let (ptr, ty) = field_address(gen, ctx, expr, base, field)?;
        return Ok(gen.module.build_load(ctx.block, ptr, ty)?);
    }

    let value = lower_expr(gen, ctx, base)?;
    let ty = gen.module.value_type(value);
    if gen.is_struct(ty) {
        return match resolve_field(gen, base, ty, field) {
            Some(index) => Ok(gen.module.build_extract(ctx.block, value, index)?),
            None => Ok(unknown_field(gen, ctx, expr, ty, field)),
        };
    }
    let (ptr, st) = pointee_struct(gen, ctx, value)?;
    match resolve_field(gen, base, st, field) {
        Some(index) => {
            let field_ptr = gen.module.build_field_ptr(ctx.block, ptr, index)?;
            let field_ty = element_type(gen, st, index);
            Ok(gen.module.build_load(ctx.block, field_ptr, field_ty)?)
        }
        None => Ok(unknown_field(gen, ctx, expr, st, field)),
    }
}

/// Address of `base.field`, dereferencing pointers to the struct on the way
pub(super) fn field_address(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    base: &Expr,
    field: &str,
) -> Result<(ValueId, TypeId), CodegenError> {
    let (ptr, st) = if is_addressable(gen, ctx, base) {
        let (ptr, ty) = lower_lvalue(gen, ctx, base)?;
        deref_chain(gen, ctx, ptr, ty)?
    } else {
        let value = lower_expr(gen, ctx, base)?;
        pointee_struct(gen, ctx, value)?
    };
    match resolve_field(gen, base, st, field) {
        Some(index) => {
            let field_ptr = gen.module.build_field_ptr(ctx.block, ptr, index)?;
            Ok((field_ptr, element_type(gen, st, index)))
        }
        None => {
            unknown_field(gen, ctx, expr, st, field);
            let ty = gen.fallback_int_type();
            Ok((ctx.new_slot(gen, ty)?, ty))
        }
    }
}

/// Pointer to the aggregate a value refers to: pointers are followed, plain
/// aggregates are spilled
pub(super) fn pointee_struct(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    value: ValueId,
) -> Result<(ValueId, TypeId), CodegenError> {
    let ty = gen.module.value_type(value);
    match gen.module.types.pointee(ty) {
        Some(pointee) => deref_chain(gen, ctx, value, pointee),
        None => {
            let slot = spill(gen, ctx, value)?;
            Ok((slot, ty))
        }
    }
}

/// Follow `ptr` (pointing at a `ty`) through any further pointer levels
pub(super) fn deref_chain(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    mut ptr: ValueId,
    mut ty: TypeId,
) -> Result<(ValueId, TypeId), CodegenError> {
    while let Some(pointee) = gen.module.types.pointee(ty) {
        ptr = gen.module.build_load(ctx.block, ptr, ty)?;
        ty = pointee;
    }
    Ok((ptr, ty))
}

/// Field index from the checker's structural view, falling back to the IR layout
pub(super) fn resolve_field(gen: &IrGenerator<'_>, base: &Expr, st: TypeId, field: &str) -> Option<usize> {
    let count = gen.module.types.struct_type(st)?.fields.len();
    let env = gen.env;
    if let Some(CheckedType::Struct { fields, .. }) = env.type_of(base.pos).map(CheckedType::strip_pointers) {
        if let Some(index) = fields.iter().position(|f| f == field) {
            if index < count {
                return Some(index);
            }
            trace!("checker field index {index} of `{field}` is outside the layout");
        }
    }
    gen.module.types.field_index(st, field)
}

pub(super) fn element_type(gen: &mut IrGenerator<'_>, aggregate: TypeId, index: usize) -> TypeId {
    match gen.module.types.element_type(aggregate, index) {
        Some(ty) => ty,
        None => gen.fallback_int_type(),
    }
}

fn unknown_field(gen: &mut IrGenerator<'_>, ctx: &FnCtx, expr: &Expr, st: TypeId, field: &str) -> ValueId {
    let message = format!("`{}` has no field `{field}`", gen.module.types.display(st));
    unresolved(gen, ctx, expr, message)
}

/// Address of `base[index]` and the element type
pub(crate) fn index_address(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    base: &Expr,
    index: &Expr,
) -> Result<(ValueId, TypeId), CodegenError> {
    let element_hint = gen.oracle_type(ctx.file, expr.pos);
    let (base_ptr, base_ty) = address_of(gen, ctx, base)?;
    let index = lower_expr(gen, ctx, index)?;

    let shape = gen.module.types.get(base_ty).cloned();
    match shape {
        Some(Type::Array { elem, .. }) => {
            let elem_ptr = gen.module.types.get_ptr(elem);
            let first = gen.module.build_cast(ctx.block, Opcode::Bitcast, base_ptr, elem_ptr)?;
            Ok((gen.module.build_gep(ctx.block, first, index)?, elem))
        }
        Some(Type::Ptr(elem)) => {
            let ptr = gen.module.build_load(ctx.block, base_ptr, base_ty)?;
            Ok((gen.module.build_gep(ctx.block, ptr, index)?, elem))
        }
        _ if gen.is_dyn_array(base_ty) => {
            let elem = match element_hint {
                Some(ty) => ty,
                None => {
                    gen.fallback(ctx.file, expr.pos, "element type of array is unknown".to_string());
                    gen.fallback_int_type()
                }
            };
            let data = load_field(gen, ctx, base_ptr, ARRAY_DATA_FIELD)?;
            let elem_ptr = gen.module.types.get_ptr(elem);
            let first = gen.module.build_cast(ctx.block, Opcode::Bitcast, data, elem_ptr)?;
            Ok((gen.module.build_gep(ctx.block, first, index)?, elem))
        }
        _ if gen.is_string(base_ty) => {
            let data = load_field(gen, ctx, base_ptr, STRING_DATA_FIELD)?;
            let byte = gen.module.types.get_uint(8);
            Ok((gen.module.build_gep(ctx.block, data, index)?, byte))
        }
        _ => {
            let message = format!("cannot index a `{}`", gen.module.types.display(base_ty));
            unresolved(gen, ctx, expr, message);
            let ty = gen.fallback_int_type();
            Ok((ctx.new_slot(gen, ty)?, ty))
        }
    }
}

/// Load field `index` of the runtime struct at `ptr`
pub(crate) fn load_field(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    ptr: ValueId,
    index: usize,
) -> Result<ValueId, CodegenError> {
    let field_ptr = gen.module.build_field_ptr(ctx.block, ptr, index)?;
    let ty = gen
        .module
        .types
        .pointee(gen.module.value_type(field_ptr))
        .unwrap_or_else(|| gen.module.value_type(field_ptr));
    Ok(gen.module.build_load(ctx.block, field_ptr, ty)?)
}

/// Address of `*inner` and the pointee type
pub(super) fn deref_address(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    inner: &Expr,
) -> Result<(ValueId, TypeId), CodegenError> {
    let ptr = lower_expr(gen, ctx, inner)?;
    let ty = gen.module.value_type(ptr);
    match gen.module.types.pointee(ty) {
        Some(pointee) => Ok((ptr, pointee)),
        None => {
            let message = format!("dereference of non-pointer `{}`", gen.module.types.display(ty));
            unresolved(gen, ctx, expr, message);
            let ty = gen.fallback_int_type();
            Ok((ctx.new_slot(gen, ty)?, ty))
        }
    }
}

/// Address of any expression; values without storage are spilled to a slot
pub(crate) fn address_of(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
) -> Result<(ValueId, TypeId), CodegenError> {
    if is_addressable(gen, ctx, expr) {
        return lower_lvalue(gen, ctx, expr);
    }
    let value = lower_expr(gen, ctx, expr)?;
    let ty = gen.module.value_type(value);
    Ok((spill(gen, ctx, value)?, ty))
}
