//! Function, method and indirect calls

use super::super::context::FnCtx;
use super::super::errors::CodegenError;
use super::super::{IrGenerator, Symbol};
use super::access::{deref_chain, element_type, pointee_struct, resolve_field};
use super::identifiers::{module_ref, symbol_value};
use super::{convert, is_addressable, lower_expr, lower_lvalue};
use crate::ast::{Expr, ExprKind};
use log::trace;
use strata_ir::{FuncId, TypeId, ValueId};

pub(super) fn lower_call(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    callee: &Expr,
    args: &[Expr],
) -> Result<ValueId, CodegenError> {
    match &callee.unparen().kind {
        ExprKind::Ident(name) if ctx.local(name).is_none() => match gen.resolve_symbol(ctx.file, callee.pos, name) {
            Some(Symbol::Fn(func)) => direct_call(gen, ctx, func, None, args),
            Some(symbol) => {
                let target = symbol_value(gen, ctx, callee, name, symbol)?;
                indirect_call(gen, ctx, expr, target, args)
            }
            None => unresolved_call(gen, ctx, expr, format!("unresolved function `{name}`"), args),
        },
        ExprKind::Selector { base, field } => {
            if let Some(alias) = module_ref(gen, ctx, base) {
                return match gen.lookup_qualified(ctx.file, alias, field) {
                    Some(Symbol::Fn(func)) => direct_call(gen, ctx, func, None, args),
                    Some(symbol) => {
                        let target = symbol_value(gen, ctx, callee, field, symbol)?;
                        indirect_call(gen, ctx, expr, target, args)
                    }
                    None => unresolved_call(gen, ctx, expr, format!("unresolved function `{alias}.{field}`"), args),
                };
            }
            method_call(gen, ctx, expr, base, field, args)
        }
        _ => {
            let target = lower_expr(gen, ctx, callee)?;
            indirect_call(gen, ctx, expr, target, args)
        }
    }
}

/// `base.field(args)`: a method of the receiver's type, or a field holding a
/// function
fn method_call(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    base: &Expr,
    field: &str,
    args: &[Expr],
) -> Result<ValueId, CodegenError> {
    let (ptr, st) = if is_addressable(gen, ctx, base) {
        let (ptr, ty) = lower_lvalue(gen, ctx, base)?;
        deref_chain(gen, ctx, ptr, ty)?
    } else {
        let value = lower_expr(gen, ctx, base)?;
        pointee_struct(gen, ctx, value)?
    };

    if let Some(func) = gen.methods.get(&(st, field.to_string())).copied() {
        let by_pointer = param_types(gen, func)
            .first()
            .is_some_and(|ty| gen.module.types.is_ptr(*ty));
        let receiver = if by_pointer {
            ptr
        } else {
            gen.module.build_load(ctx.block, ptr, st)?
        };
        trace!("method {}.{field} on {receiver}", gen.module.types.display(st));
        return direct_call(gen, ctx, func, Some(receiver), args);
    }

    match resolve_field(gen, base, st, field) {
        Some(index) => {
            let field_ptr = gen.module.build_field_ptr(ctx.block, ptr, index)?;
            let field_ty = element_type(gen, st, index);
            let target = gen.module.build_load(ctx.block, field_ptr, field_ty)?;
            indirect_call(gen, ctx, expr, target, args)
        }
        None => {
            let message = format!("`{}` has no method `{field}`", gen.module.types.display(st));
            unresolved_call(gen, ctx, expr, message, args)
        }
    }
}

fn param_types(gen: &IrGenerator<'_>, func: FuncId) -> Vec<TypeId> {
    gen.module.function(func).map_or_else(Vec::new, |f| {
        f.params.iter().map(|p| gen.module.value_type(*p)).collect()
    })
}

fn direct_call(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    func: FuncId,
    receiver: Option<ValueId>,
    args: &[Expr],
) -> Result<ValueId, CodegenError> {
    let params = param_types(gen, func);
    let ret = match gen.module.function(func) {
        Some(f) => f.ret,
        None => gen.module.types.get_void(),
    };
    let mut values: Vec<ValueId> = receiver.into_iter().collect();
    let offset = values.len();
    lower_args(gen, ctx, args, &params[offset.min(params.len())..], &mut values)?;
    let target = gen.module.func_ref(func);
    Ok(gen.module.build_call(ctx.block, target, &values, ret)?)
}

/// Call through a function value (or a pointer to one)
fn indirect_call(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    target: ValueId,
    args: &[Expr],
) -> Result<ValueId, CodegenError> {
    let ty = gen.module.value_type(target);
    let shape = {
        let types = &gen.module.types;
        types
            .func_type(ty)
            .or_else(|| types.pointee(ty).and_then(|p| types.func_type(p)))
            .cloned()
    };
    let Some(shape) = shape else {
        let message = format!("`{}` is not callable", gen.module.types.display(ty));
        return unresolved_call(gen, ctx, expr, message, args);
    };
    let mut values = Vec::with_capacity(args.len());
    lower_args(gen, ctx, args, &shape.params, &mut values)?;
    Ok(gen.module.build_call(ctx.block, target, &values, shape.ret)?)
}

/// Call of something that did not resolve: the arguments are still lowered
/// for their side effects and the callee is an undefined function value
fn unresolved_call(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    expr: &Expr,
    message: String,
    args: &[Expr],
) -> Result<ValueId, CodegenError> {
    gen.fallback(ctx.file, expr.pos, message);
    let mut values = Vec::with_capacity(args.len());
    lower_args(gen, ctx, args, &[], &mut values)?;
    let ret = gen.fallback_int_type();
    let arg_types = values.iter().map(|v| gen.module.value_type(*v)).collect();
    let shape = gen.module.types.get_func(arg_types, ret, false);
    let target = gen.module.undef(shape);
    Ok(gen.module.build_call(ctx.block, target, &values, ret)?)
}

/// Lower arguments in order, converting each to its parameter type; extra
/// variadic arguments pass through unchanged
fn lower_args(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    args: &[Expr],
    params: &[TypeId],
    out: &mut Vec<ValueId>,
) -> Result<(), CodegenError> {
    for (i, arg) in args.iter().enumerate() {
        let value = lower_expr(gen, ctx, arg)?;
        let value = match params.get(i) {
            Some(ty) => convert(gen, ctx, value, *ty)?,
            None => value,
        };
        out.push(value);
    }
    Ok(())
}
