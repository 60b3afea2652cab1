//! Binary and unary operators

use super::super::context::FnCtx;
use super::super::errors::CodegenError;
use super::super::IrGenerator;
use super::identifiers::unresolved;
use super::{convert, lower_cond, lower_expr};
use crate::ast::{BinaryOp, Expr, UnaryOp};
use log::trace;
use strata_ir::{Opcode, TypeId, ValueId};

pub(super) fn lower_binary(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<ValueId, CodegenError> {
    if op.is_logical() {
        return lower_logical(gen, ctx, op, lhs, rhs);
    }
    let l = lower_expr(gen, ctx, lhs)?;
    let r = lower_expr(gen, ctx, rhs)?;
    binary_values(gen, ctx, expr, op, l, r)
}

/// `a && b` / `a || b`: the right operand runs only when it decides the result
fn lower_logical(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<ValueId, CodegenError> {
    // The result goes through a slot rather than a phi: the lhs value is
    // stored first and the rhs block overwrites it only when it runs.
    let bool_ty = gen.bool_type();
    let result = ctx.new_slot(gen, bool_ty)?;

    let l = lower_cond(gen, ctx, lhs)?;
    gen.module.build_store(ctx.block, l, result)?;

    let (rhs_name, end_name) = match op {
        BinaryOp::LogicalAnd => ("and.rhs", "and.end"),
        _ => ("or.rhs", "or.end"),
    };
    let rhs_block = ctx.new_block(gen, rhs_name)?;
    let end_block = ctx.new_block(gen, end_name)?;
    match op {
        BinaryOp::LogicalAnd => gen.module.build_br(ctx.block, l, rhs_block, end_block)?,
        _ => gen.module.build_br(ctx.block, l, end_block, rhs_block)?,
    };

    // The rhs may open blocks of its own, so the store lands in whichever
    // block lowering ends in.
    ctx.block = rhs_block;
    let r = lower_cond(gen, ctx, rhs)?;
    gen.module.build_store(ctx.block, r, result)?;
    ctx.switch_to(gen, end_block)?;

    trace!("short-circuit {op:?} through {result}");
    Ok(gen.module.build_load(ctx.block, result, bool_ty)?)
}

/// Apply a non-logical binary operator to two lowered operands
pub(crate) fn binary_values(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    op: BinaryOp,
    l: ValueId,
    r: ValueId,
) -> Result<ValueId, CodegenError> {
    let lt = gen.module.value_type(l);
    let rt = gen.module.value_type(r);

    if gen.is_string(lt) || gen.is_string(rt) {
        return string_op(gen, ctx, expr, op, l, r);
    }

    let (is_ptr_l, is_ptr_r) = (gen.module.types.is_ptr(lt), gen.module.types.is_ptr(rt));
    if is_ptr_l || is_ptr_r {
        return pointer_op(gen, ctx, expr, op, l, r);
    }

    let (l, r, ty) = unify_numeric(gen, ctx, l, r)?;
    let is_float = gen.module.types.is_float(ty);
    let opcode = match (op, is_float) {
        (BinaryOp::Add, false) => Opcode::Add,
        (BinaryOp::Sub, false) => Opcode::Sub,
        (BinaryOp::Mul, false) => Opcode::Mul,
        (BinaryOp::Div, false) => Opcode::Div,
        (BinaryOp::Rem, false) => Opcode::Rem,
        (BinaryOp::Add, true) => Opcode::FAdd,
        (BinaryOp::Sub, true) => Opcode::FSub,
        (BinaryOp::Mul, true) => Opcode::FMul,
        (BinaryOp::Div, true) => Opcode::FDiv,
        (BinaryOp::Rem, true) => Opcode::FRem,
        (BinaryOp::BitAnd, false) => Opcode::And,
        (BinaryOp::BitOr, false) => Opcode::Or,
        (BinaryOp::BitXor, false) => Opcode::Xor,
        (BinaryOp::Shl, false) => Opcode::Shl,
        (BinaryOp::Shr, false) => Opcode::Shr,
        (BinaryOp::Eq, false) => Opcode::Eq,
        (BinaryOp::Ne, false) => Opcode::Ne,
        (BinaryOp::Lt, false) => Opcode::Lt,
        (BinaryOp::Le, false) => Opcode::Le,
        (BinaryOp::Gt, false) => Opcode::Gt,
        (BinaryOp::Ge, false) => Opcode::Ge,
        (BinaryOp::Eq, true) => Opcode::FEq,
        (BinaryOp::Ne, true) => Opcode::FNe,
        (BinaryOp::Lt, true) => Opcode::FLt,
        (BinaryOp::Le, true) => Opcode::FLe,
        (BinaryOp::Gt, true) => Opcode::FGt,
        (BinaryOp::Ge, true) => Opcode::FGe,
        (BinaryOp::LogicalAnd, _) => Opcode::And,
        (BinaryOp::LogicalOr, _) => Opcode::Or,
        (_, true) => {
            return Ok(unresolved(
                gen,
                ctx,
                expr,
                format!("bitwise {op:?} on floating-point operands"),
            ))
        }
    };
    Ok(gen.module.build_binary(ctx.block, opcode, l, r)?)
}

/// Bring two numeric operands to a common type: integers promote to float,
/// narrower operands widen to the wider one
fn unify_numeric(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    l: ValueId,
    r: ValueId,
) -> Result<(ValueId, ValueId, TypeId), CodegenError> {
    let lt = gen.module.value_type(l);
    let rt = gen.module.value_type(r);
    if lt == rt {
        return Ok((l, r, lt));
    }
    let types = &gen.module.types;
    let (lf, rf) = (types.is_float(lt), types.is_float(rt));
    let target = match (lf, rf) {
        (true, false) => lt,
        (false, true) => rt,
        _ => {
            let lw = types.bit_width(lt).unwrap_or(0);
            let rw = types.bit_width(rt).unwrap_or(0);
            if lw >= rw {
                lt
            } else {
                rt
            }
        }
    };
    let l = convert(gen, ctx, l, target)?;
    let r = convert(gen, ctx, r, target)?;
    Ok((l, r, target))
}

/// String `+`, `==` and `!=` go through the runtime
fn string_op(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    op: BinaryOp,
    l: ValueId,
    r: ValueId,
) -> Result<ValueId, CodegenError> {
    let string = gen.runtime.string;
    if gen.module.value_type(l) != string || gen.module.value_type(r) != string {
        return Ok(unresolved(gen, ctx, expr, format!("{op:?} between a string and a non-string")));
    }
    match op {
        BinaryOp::Add => {
            let callee = gen.module.func_ref(gen.runtime.string_plus);
            Ok(gen.module.build_call(ctx.block, callee, &[l, r], string)?)
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            let bool_ty = gen.bool_type();
            let callee = gen.module.func_ref(gen.runtime.string_eq);
            let eq = gen.module.build_call(ctx.block, callee, &[l, r], bool_ty)?;
            if op == BinaryOp::Eq {
                Ok(eq)
            } else {
                Ok(gen.module.build_unary(ctx.block, Opcode::Not, eq)?)
            }
        }
        _ => Ok(unresolved(gen, ctx, expr, format!("unsupported string operator {op:?}"))),
    }
}

/// Pointer arithmetic and comparisons
fn pointer_op(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    op: BinaryOp,
    l: ValueId,
    r: ValueId,
) -> Result<ValueId, CodegenError> {
    let lt = gen.module.value_type(l);
    let rt = gen.module.value_type(r);
    let types = &gen.module.types;
    let (lp, rp) = (types.is_ptr(lt), types.is_ptr(rt));
    let (li, ri) = (types.is_int(lt), types.is_int(rt));

    match op {
        BinaryOp::Add if lp && ri => Ok(gen.module.build_gep(ctx.block, l, r)?),
        BinaryOp::Add if li && rp => Ok(gen.module.build_gep(ctx.block, r, l)?),
        BinaryOp::Sub if lp && ri => {
            let offset = gen.module.build_unary(ctx.block, Opcode::Neg, r)?;
            Ok(gen.module.build_gep(ctx.block, l, offset)?)
        }
        BinaryOp::Sub if lp && rp => {
            // Element distance between two pointers
            let i64_ty = gen.module.types.get_int(64);
            let size = gen.module.types.pointee(lt).map_or(1, |p| gen.module.types.size_of(p)).max(1);
            let a = gen.module.build_cast(ctx.block, Opcode::PtrToInt, l, i64_ty)?;
            let b = gen.module.build_cast(ctx.block, Opcode::PtrToInt, r, i64_ty)?;
            let bytes = gen.module.build_binary(ctx.block, Opcode::Sub, a, b)?;
            let size = gen.module.const_int(i64_ty, i64::try_from(size).unwrap_or(1));
            Ok(gen.module.build_binary(ctx.block, Opcode::Div, bytes, size)?)
        }
        _ if op.is_comparison() && lp && rp => {
            let opcode = comparison_opcode(op);
            let r = if lt == rt {
                r
            } else {
                gen.module.build_cast(ctx.block, Opcode::Bitcast, r, lt)?
            };
            Ok(gen.module.build_binary(ctx.block, opcode, l, r)?)
        }
        _ => Ok(unresolved(gen, ctx, expr, format!("unsupported pointer operator {op:?}"))),
    }
}

fn comparison_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Ne => Opcode::Ne,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Le => Opcode::Le,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Ge => Opcode::Ge,
        _ => Opcode::Eq,
    }
}

pub(super) fn lower_unary(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    op: UnaryOp,
    operand: &Expr,
) -> Result<ValueId, CodegenError> {
    let value = lower_expr(gen, ctx, operand)?;
    let ty = gen.module.value_type(value);
    let types = &gen.module.types;
    let (is_float, is_int, is_bool) = (types.is_float(ty), types.is_int(ty), types.is_bool(ty));
    match op {
        UnaryOp::Neg if is_float => Ok(gen.module.build_unary(ctx.block, Opcode::FNeg, value)?),
        UnaryOp::Neg if is_int => Ok(gen.module.build_unary(ctx.block, Opcode::Neg, value)?),
        UnaryOp::Not if is_bool => Ok(gen.module.build_unary(ctx.block, Opcode::Not, value)?),
        UnaryOp::Not => {
            let cond = lower_cond_value(gen, ctx, value)?;
            Ok(gen.module.build_unary(ctx.block, Opcode::Not, cond)?)
        }
        UnaryOp::BitNot if is_int => Ok(gen.module.build_unary(ctx.block, Opcode::Not, value)?),
        _ => Ok(unresolved(gen, ctx, expr, format!("{op:?} on a non-numeric operand"))),
    }
}

/// `value != 0` for integers and pointers
fn lower_cond_value(gen: &mut IrGenerator<'_>, ctx: &mut FnCtx, value: ValueId) -> Result<ValueId, CodegenError> {
    let ty = gen.module.value_type(value);
    let zero = if gen.module.types.is_ptr(ty) {
        gen.module.const_null(ty)
    } else if gen.module.types.is_float(ty) {
        let zero = gen.module.const_float(ty, 0.0);
        return Ok(gen.module.build_binary(ctx.block, Opcode::FNe, value, zero)?);
    } else {
        gen.module.const_int(ty, 0)
    };
    Ok(gen.module.build_binary(ctx.block, Opcode::Ne, value, zero)?)
}
