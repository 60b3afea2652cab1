//! Casts and implicit conversions

use super::super::const_eval::truncate;
use super::super::context::FnCtx;
use super::super::errors::CodegenError;
use super::super::IrGenerator;
use super::{lower_expr, spill};
use crate::ast::{Expr, TypeExpr};
use log::trace;
use strata_ir::{Opcode, Type, TypeId, ValueId, ValueKind};

pub(super) fn lower_cast(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    ty: &TypeExpr,
    inner: &Expr,
) -> Result<ValueId, CodegenError> {
    let to = gen.resolve_type(ctx.file, expr.pos, ty);
    let value = lower_expr(gen, ctx, inner)?;
    convert(gen, ctx, value, to)
}

/// Convert `value` to `to`, folding constants where possible
pub(crate) fn convert(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    value: ValueId,
    to: TypeId,
) -> Result<ValueId, CodegenError> {
    let from = gen.module.value_type(value);
    if from == to {
        return Ok(value);
    }
    if gen.sum_types.contains_key(&to) {
        return box_sum_type(gen, ctx, value, to);
    }
    if let Some(folded) = fold_constant(gen, value, to) {
        return Ok(folded);
    }

    if let Some(truth) = to_bool(gen, ctx, value, to)? {
        return Ok(truth);
    }

    let types = &gen.module.types;
    let (Some(from_ty), Some(to_ty)) = (types.get(from), types.get(to)) else {
        return Ok(value);
    };
    let op = match (from_ty, to_ty) {
        (
            Type::Int {
                width: fw,
                signed: fs,
            },
            Type::Int { width: tw, .. },
        ) => {
            if fw > tw {
                Opcode::Trunc
            } else if fw < tw {
                if *fs && *fw > 1 {
                    Opcode::SExt
                } else {
                    Opcode::ZExt
                }
            } else {
                Opcode::Bitcast
            }
        }
        (Type::Int { signed: true, .. }, Type::Float { .. }) => Opcode::SiToFp,
        (Type::Int { signed: false, .. }, Type::Float { .. }) => Opcode::UiToFp,
        (Type::Float { .. }, Type::Int { signed: true, .. }) => Opcode::FpToSi,
        (Type::Float { .. }, Type::Int { signed: false, .. }) => Opcode::FpToUi,
        (Type::Float { width: fw }, Type::Float { width: tw }) => {
            if fw < tw {
                Opcode::FpExt
            } else {
                Opcode::FpTrunc
            }
        }
        (Type::Ptr(_), Type::Int { .. }) => Opcode::PtrToInt,
        (Type::Int { .. }, Type::Ptr(_)) => Opcode::IntToPtr,
        (Type::Ptr(_), Type::Ptr(_)) | (Type::Func(_), Type::Ptr(_)) | (Type::Ptr(_), Type::Func(_)) => {
            Opcode::Bitcast
        }
        _ => {
            trace!(
                "no conversion from {} to {}, keeping {value}",
                types.display(from),
                types.display(to)
            );
            return Ok(value);
        }
    };
    Ok(gen.module.build_cast(ctx.block, op, value, to)?)
}

/// Any nonzero number is true, so a narrowing to `bool` is a compare with zero
fn to_bool(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    value: ValueId,
    to: TypeId,
) -> Result<Option<ValueId>, CodegenError> {
    if !gen.module.types.is_bool(to) {
        return Ok(None);
    }
    let from = gen.module.value_type(value);
    let op = match gen.module.types.get(from) {
        Some(Type::Int { width, .. }) if *width > 1 => Opcode::Ne,
        Some(Type::Float { .. }) => Opcode::FNe,
        _ => return Ok(None),
    };
    let zero = match op {
        Opcode::Ne => gen.module.const_int(from, 0),
        _ => gen.module.const_float(from, 0.0),
    };
    Ok(Some(gen.module.build_binary(ctx.block, op, value, zero)?))
}

/// Constant operands convert without an instruction
fn fold_constant(gen: &mut IrGenerator<'_>, value: ValueId, to: TypeId) -> Option<ValueId> {
    let kind = gen.module.value(value)?.kind.clone();
    let target = gen.module.types.get(to)?.clone();
    match (kind, target) {
        (ValueKind::ConstInt(v), Type::Int { width: 1, .. }) => Some(gen.module.const_int(to, i64::from(v != 0))),
        (ValueKind::ConstFloat(v), Type::Int { width: 1, .. }) => Some(gen.module.const_int(to, i64::from(v != 0.0))),
        (ValueKind::ConstInt(v), Type::Int { width, signed }) => Some(gen.module.const_int(to, truncate(v, width, signed))),
        (ValueKind::ConstInt(v), Type::Float { .. }) => Some(gen.module.const_float(to, v as f64)),
        (ValueKind::ConstFloat(v), Type::Float { width: 32 }) => Some(gen.module.const_float(to, f64::from(v as f32))),
        (ValueKind::ConstFloat(v), Type::Float { .. }) => Some(gen.module.const_float(to, v)),
        (ValueKind::ConstNull, Type::Ptr(_)) => Some(gen.module.const_null(to)),
        _ => None,
    }
}

/// Box a variant value into a sum type: copy it to the heap and record its tag
fn box_sum_type(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    value: ValueId,
    sum: TypeId,
) -> Result<ValueId, CodegenError> {
    let from = gen.module.value_type(value);
    let tag = gen
        .sum_types
        .get(&sum)
        .and_then(|info| info.variants.iter().position(|v| *v == from))
        .map_or(0, |i| i as i64 + 1);
    if tag == 0 {
        log::warn!(
            "{} is not a variant of {}",
            gen.module.types.display(from),
            gen.module.types.display(sum)
        );
    }

    let slot = spill(gen, ctx, value)?;
    let byte_ptr = gen.byte_ptr_type();
    let bytes = gen.module.build_cast(ctx.block, Opcode::Bitcast, slot, byte_ptr)?;
    let i32_ty = gen.module.types.get_int(32);
    let size = i64::try_from(gen.module.types.size_of(from)).unwrap_or(0);
    let size = gen.module.const_int(i32_ty, size);
    let memdup = gen.module.func_ref(gen.runtime.memdup);
    let data = gen.module.build_call(ctx.block, memdup, &[bytes, size], byte_ptr)?;

    let tag = gen.module.const_int(i32_ty, tag);
    let boxed = gen.module.undef(sum);
    let boxed = gen.module.build_insert(ctx.block, boxed, tag, 0)?;
    let boxed = gen.module.build_insert(ctx.block, boxed, data, 1)?;
    trace!("boxed {value} into {}", gen.module.types.display(sum));
    Ok(boxed)
}
