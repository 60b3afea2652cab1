//! Identifier and module-qualified reference lowering

use super::super::context::FnCtx;
use super::super::errors::CodegenError;
use super::super::{ConstValue, IrGenerator, Symbol};
use crate::ast::{Expr, ExprKind};
use strata_ir::{TypeId, ValueId};

pub(super) fn lower_ident(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    name: &str,
) -> Result<ValueId, CodegenError> {
    if let Some(local) = ctx.local(name) {
        return Ok(gen.module.build_load(ctx.block, local.slot, local.ty)?);
    }
    match gen.resolve_symbol(ctx.file, expr.pos, name) {
        Some(symbol) => symbol_value(gen, ctx, expr, name, symbol),
        None => Ok(unresolved(gen, ctx, expr, format!("unresolved identifier `{name}`"))),
    }
}

/// Value of a module-level symbol used as an expression
pub(super) fn symbol_value(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    name: &str,
    symbol: Symbol,
) -> Result<ValueId, CodegenError> {
    match symbol {
        Symbol::Const(key) => {
            let Some(entry) = gen.consts.get(&key).cloned() else {
                return Ok(unresolved(gen, ctx, expr, format!("constant `{name}` has no value")));
            };
            if let Some(global) = entry.global {
                let ptr = gen.module.global_ref(global);
                return Ok(gen.module.build_load(ctx.block, ptr, entry.ty)?);
            }
            Ok(match entry.value {
                ConstValue::Int(v) if gen.module.types.is_float(entry.ty) => gen.module.const_float(entry.ty, v as f64),
                ConstValue::Int(v) => gen.module.const_int(entry.ty, v),
                ConstValue::Float(v) => gen.module.const_float(entry.ty, v),
                ConstValue::Str(s) => gen.module.const_str(entry.ty, &s),
            })
        }
        Symbol::Global(global) => {
            let Some(ty) = gen.module.global(global).map(|g| g.ty) else {
                return Ok(unresolved(gen, ctx, expr, format!("global `{name}` is missing")));
            };
            let ptr = gen.module.global_ref(global);
            Ok(gen.module.build_load(ctx.block, ptr, ty)?)
        }
        Symbol::Fn(func) => Ok(gen.module.func_ref(func)),
        Symbol::Struct(_) | Symbol::SumType(_) | Symbol::Enum(_) => {
            Ok(unresolved(gen, ctx, expr, format!("type `{name}` used as a value")))
        }
    }
}

/// Address and stored type of an assignable identifier
pub(super) fn ident_address(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    name: &str,
) -> Result<(ValueId, TypeId), CodegenError> {
    if let Some(local) = ctx.local(name) {
        return Ok((local.slot, local.ty));
    }
    match gen.resolve_symbol(ctx.file, expr.pos, name) {
        Some(symbol) => symbol_address(gen, &symbol).ok_or_else(|| CodegenError::InvalidLvalue {
            span: gen.span(ctx.file, expr.pos),
        }),
        None => {
            gen.fallback(ctx.file, expr.pos, format!("assignment to unresolved identifier `{name}`"));
            let ty = gen.fallback_int_type();
            let slot = ctx.new_slot(gen, ty)?;
            Ok((slot, ty))
        }
    }
}

/// Storage behind a global or a runtime-initialized constant
pub(super) fn symbol_address(gen: &mut IrGenerator<'_>, symbol: &Symbol) -> Option<(ValueId, TypeId)> {
    match symbol {
        Symbol::Global(global) => {
            let ty = gen.module.global(*global)?.ty;
            Some((gen.module.global_ref(*global), ty))
        }
        Symbol::Const(key) => {
            let entry = gen.consts.get(key)?;
            let (global, ty) = (entry.global?, entry.ty);
            Some((gen.module.global_ref(global), ty))
        }
        _ => None,
    }
}

pub(super) fn has_storage(gen: &IrGenerator<'_>, symbol: &Symbol) -> bool {
    match symbol {
        Symbol::Global(_) => true,
        Symbol::Const(key) => gen.consts.get(key).is_some_and(|e| e.global.is_some()),
        _ => false,
    }
}

/// The alias when `base` names an imported module rather than a value
pub(super) fn module_ref<'e>(gen: &IrGenerator<'_>, ctx: &FnCtx, base: &'e Expr) -> Option<&'e str> {
    let ExprKind::Ident(alias) = &base.kind else {
        return None;
    };
    if ctx.local(alias).is_some() || !gen.is_module(ctx.file, alias) {
        return None;
    }
    Some(alias)
}

/// Fallback for anything that does not resolve: zero of the widest default integer
pub(super) fn unresolved(gen: &mut IrGenerator<'_>, ctx: &FnCtx, expr: &Expr, message: String) -> ValueId {
    gen.fallback(ctx.file, expr.pos, message);
    let ty = gen.fallback_int_type();
    gen.module.const_int(ty, 0)
}
