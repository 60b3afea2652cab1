//! Expression lowering
//!
//! Every function takes the generator and the per-function cursor and
//! returns the value holding the expression's result. Lvalue lowering
//! returns the address together with the type stored there.

mod access;
mod aggregates;
mod calls;
mod conversions;
mod identifiers;
mod operators;

pub(crate) use access::{address_of, index_address, load_field};
pub(crate) use conversions::convert;
pub(crate) use operators::binary_values;

use super::const_eval::ConstEval;
use super::context::FnCtx;
use super::errors::CodegenError;
use super::{IrGenerator, Symbol};
use crate::ast::{Expr, ExprKind};
use log::trace;
use strata_ir::{Opcode, TypeId, ValueId};

pub(crate) fn lower_expr(gen: &mut IrGenerator<'_>, ctx: &mut FnCtx, expr: &Expr) -> Result<ValueId, CodegenError> {
    match &expr.kind {
        ExprKind::IntLit(v) => Ok(lower_int_literal(gen, ctx, expr, *v)),
        ExprKind::FloatLit(v) => {
            let ty = match gen.oracle_type(ctx.file, expr.pos) {
                Some(ty) if gen.module.types.is_float(ty) => ty,
                _ => gen.module.types.get_float(64),
            };
            Ok(gen.module.const_float(ty, *v))
        }
        ExprKind::BoolLit(b) => {
            let ty = gen.bool_type();
            Ok(gen.module.const_int(ty, i64::from(*b)))
        }
        ExprKind::CharLit(c) => {
            let ty = match gen.oracle_type(ctx.file, expr.pos) {
                Some(ty) if gen.module.types.is_int(ty) => ty,
                _ => gen.module.types.get_int(32),
            };
            Ok(gen.module.const_int(ty, i64::from(u32::from(*c))))
        }
        ExprKind::StringLit(s) => {
            let ty = gen.runtime.string;
            Ok(gen.module.const_str(ty, s))
        }
        ExprKind::Nil => {
            let ty = match gen.oracle_type(ctx.file, expr.pos) {
                Some(ty) if gen.module.types.is_ptr(ty) => ty,
                _ => gen.byte_ptr_type(),
            };
            Ok(gen.module.const_null(ty))
        }
        ExprKind::Ident(name) => identifiers::lower_ident(gen, ctx, expr, name),
        ExprKind::Selector { base, field } => match identifiers::module_ref(gen, ctx, base) {
            Some(alias) => match gen.lookup_qualified(ctx.file, alias, field) {
                Some(symbol) => identifiers::symbol_value(gen, ctx, expr, field, symbol),
                None => Ok(identifiers::unresolved(
                    gen,
                    ctx,
                    expr,
                    format!("unresolved symbol `{alias}.{field}`"),
                )),
            },
            None => access::lower_field(gen, ctx, expr, base, field),
        },
        ExprKind::EnumVal { enum_name, member } => {
            let value = ConstEval::new(gen, ctx.file).try_eval_const_int(expr);
            let ty = enum_type(gen, ctx, expr, enum_name.as_deref());
            match value {
                Some(v) => Ok(gen.module.const_int(ty, v)),
                None => {
                    gen.fallback(ctx.file, expr.pos, format!("unknown enum value `.{member}`"));
                    Ok(gen.module.const_int(ty, 0))
                }
            }
        }
        ExprKind::Binary { op, lhs, rhs } => operators::lower_binary(gen, ctx, expr, *op, lhs, rhs),
        ExprKind::Unary { op, operand } => operators::lower_unary(gen, ctx, expr, *op, operand),
        ExprKind::Paren(inner) => lower_expr(gen, ctx, inner),
        ExprKind::Cast { ty, expr: inner } => conversions::lower_cast(gen, ctx, expr, ty, inner),
        ExprKind::Call { callee, args } => calls::lower_call(gen, ctx, expr, callee, args),
        ExprKind::Index { base, index } => {
            let (ptr, ty) = index_address(gen, ctx, expr, base, index)?;
            Ok(gen.module.build_load(ctx.block, ptr, ty)?)
        }
        ExprKind::AddrOf(inner) => Ok(address_of(gen, ctx, inner)?.0),
        ExprKind::Deref(inner) => {
            let (ptr, ty) = access::deref_address(gen, ctx, expr, inner)?;
            Ok(gen.module.build_load(ctx.block, ptr, ty)?)
        }
        ExprKind::StructLit { ty, fields } => aggregates::lower_struct_lit(gen, ctx, expr, ty, fields),
        ExprKind::ArrayLit { elems, fixed } => aggregates::lower_array_lit(gen, ctx, expr, elems, *fixed),
        ExprKind::SizeOf(ty) => {
            let ty = gen.resolve_type(ctx.file, expr.pos, ty);
            let size = gen.module.types.size_of(ty);
            let int = gen.int_type();
            Ok(gen.module.const_int(int, i64::try_from(size).unwrap_or(i64::MAX)))
        }
        ExprKind::AnonFn(decl) => {
            let func = super::functions::lower_anon_fn(gen, ctx.file, decl)?;
            Ok(gen.module.func_ref(func))
        }
    }
}

/// Lower `expr` and convert the result to `ty`
pub(crate) fn lower_expr_as(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    ty: TypeId,
) -> Result<ValueId, CodegenError> {
    let value = lower_expr(gen, ctx, expr)?;
    convert(gen, ctx, value, ty)
}

/// Lower `expr` as a branch condition
pub(crate) fn lower_cond(gen: &mut IrGenerator<'_>, ctx: &mut FnCtx, expr: &Expr) -> Result<ValueId, CodegenError> {
    let value = lower_expr(gen, ctx, expr)?;
    let ty = gen.module.value_type(value);
    if gen.module.types.is_bool(ty) {
        return Ok(value);
    }
    let zero = if gen.module.types.is_int(ty) {
        gen.module.const_int(ty, 0)
    } else if gen.module.types.is_float(ty) {
        gen.module.const_float(ty, 0.0)
    } else if gen.module.types.is_ptr(ty) {
        gen.module.const_null(ty)
    } else {
        gen.fallback(
            ctx.file,
            expr.pos,
            format!("`{}` value used as a condition", gen.module.types.display(ty)),
        );
        let bool_ty = gen.bool_type();
        return Ok(gen.module.const_int(bool_ty, 0));
    };
    let op = if gen.module.types.is_float(ty) {
        Opcode::FNe
    } else {
        Opcode::Ne
    };
    Ok(gen.module.build_binary(ctx.block, op, value, zero)?)
}

/// Address of an assignable expression and the type stored there
pub(crate) fn lower_lvalue(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
) -> Result<(ValueId, TypeId), CodegenError> {
    match &expr.kind {
        ExprKind::Ident(name) => identifiers::ident_address(gen, ctx, expr, name),
        ExprKind::Selector { base, field } => match identifiers::module_ref(gen, ctx, base) {
            Some(alias) => {
                let address = gen
                    .lookup_qualified(ctx.file, alias, field)
                    .and_then(|symbol| identifiers::symbol_address(gen, &symbol));
                address.ok_or_else(|| CodegenError::InvalidLvalue {
                    span: gen.span(ctx.file, expr.pos),
                })
            }
            None => access::field_address(gen, ctx, expr, base, field),
        },
        ExprKind::Index { base, index } => index_address(gen, ctx, expr, base, index),
        ExprKind::Deref(inner) => access::deref_address(gen, ctx, expr, inner),
        ExprKind::Paren(inner) => lower_lvalue(gen, ctx, inner),
        _ => Err(CodegenError::InvalidLvalue {
            span: gen.span(ctx.file, expr.pos),
        }),
    }
}

/// Whether `expr` has an address without materializing a temporary
pub(crate) fn is_addressable(gen: &IrGenerator<'_>, ctx: &FnCtx, expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Ident(name) => {
            if ctx.local(name).is_some() {
                return true;
            }
            let module = gen.module_name(ctx.file);
            match gen.lookup_symbol(module, name) {
                Some((symbol, _)) => identifiers::has_storage(gen, &symbol),
                None => false,
            }
        }
        ExprKind::Selector { base, field } => match identifiers::module_ref(gen, ctx, base) {
            Some(alias) => gen
                .lookup_qualified(ctx.file, alias, field)
                .is_some_and(|symbol| identifiers::has_storage(gen, &symbol)),
            None => true,
        },
        ExprKind::Index { .. } | ExprKind::Deref(_) => true,
        ExprKind::Paren(inner) => is_addressable(gen, ctx, inner),
        _ => false,
    }
}

/// Store `value` in a fresh slot and return the slot
pub(crate) fn spill(gen: &mut IrGenerator<'_>, ctx: &mut FnCtx, value: ValueId) -> Result<ValueId, CodegenError> {
    let ty = gen.module.value_type(value);
    let slot = ctx.new_slot(gen, ty)?;
    gen.module.build_store(ctx.block, value, slot)?;
    trace!("spilled {value} to {slot}");
    Ok(slot)
}

fn lower_int_literal(gen: &mut IrGenerator<'_>, ctx: &FnCtx, expr: &Expr, v: i64) -> ValueId {
    match gen.oracle_type(ctx.file, expr.pos) {
        Some(ty) if gen.module.types.is_float(ty) => gen.module.const_float(ty, v as f64),
        Some(ty) if gen.module.types.is_int(ty) => gen.module.const_int(ty, v),
        _ => {
            let ty = gen.int_type();
            gen.module.const_int(ty, v)
        }
    }
}

/// IR type of an enum value expression
fn enum_type(gen: &mut IrGenerator<'_>, ctx: &FnCtx, expr: &Expr, enum_name: Option<&str>) -> TypeId {
    if let Some(name) = enum_name {
        let module = gen.module_name(ctx.file);
        let symbol = match name.rsplit_once('.') {
            Some((alias, short)) => gen.lookup_qualified(ctx.file, alias, short),
            None => gen.lookup_symbol(module, name).map(|(s, _)| s),
        };
        if let Some(Symbol::Enum(key)) = symbol {
            if let Some(info) = gen.enums.get(&key) {
                return info.ty;
            }
        }
    }
    match gen.oracle_type(ctx.file, expr.pos) {
        Some(ty) if gen.module.types.is_int(ty) => ty,
        _ => gen.int_type(),
    }
}
