//! Phase 6: runtime initializer
//!
//! Globals whose initial value is not a compile-time constant are assigned
//! by one generated function, called first thing from the program entry.

use super::context::FnCtx;
use super::errors::CodegenError;
use super::expressions::lower_expr_as;
use super::{IrGenerator, PendingInit, Symbol};
use crate::ast::{Expr, ExprKind};
use log::{debug, trace, warn};
use std::collections::HashMap;
use strata_ir::{GlobalId, Instr, Opcode};

pub(crate) fn build_runtime_initializer(gen: &mut IrGenerator<'_>) -> Result<(), CodegenError> {
    if gen.pending_inits.is_empty() {
        return Ok(());
    }
    let pending = std::mem::take(&mut gen.pending_inits);
    let pending = dependency_order(gen, pending);
    let name = gen.options.init_function.clone();
    if gen.module.find_function(&name).is_some() {
        warn!("`{name}` is already defined; the runtime initializer shadows it");
    }

    let void = gen.module.types.get_void();
    let func = gen.module.add_function(&name, &[], void, false);
    let entry = gen.module.add_block(func, "entry")?;

    let mut block = entry;
    for init in &pending {
        let Some(ty) = gen.module.global(init.global).map(|g| g.ty) else {
            continue;
        };
        // One cursor per initializer, each resolving names in its own file
        let mut ctx = FnCtx::new(func, init.file, entry, void);
        ctx.block = block;
        let value = lower_expr_as(gen, &mut ctx, init.expr, ty)?;
        let ptr = gen.module.global_ref(init.global);
        gen.module.build_store(ctx.block, value, ptr)?;
        block = ctx.block;
    }
    gen.module.build_ret(block, None)?;
    debug!("phase 6: {name} initializes {} globals", pending.len());

    call_from_entry(gen, &name);
    Ok(())
}

/// Order initializers so every global is stored before an initializer that
/// reads it. Independent initializers keep their source order.
fn dependency_order<'a>(gen: &mut IrGenerator<'a>, mut pending: Vec<PendingInit<'a>>) -> Vec<PendingInit<'a>> {
    pending.sort_by_key(|init| (init.file, init.expr.pos));
    let index: HashMap<GlobalId, usize> = pending.iter().enumerate().map(|(i, init)| (init.global, i)).collect();
    let deps: Vec<Vec<usize>> = pending
        .iter()
        .map(|init| {
            let mut globals = Vec::new();
            referenced_globals(gen, init.file, init.expr, &mut globals);
            globals.iter().filter_map(|g| index.get(g).copied()).collect()
        })
        .collect();

    let mut done = vec![false; pending.len()];
    let mut order = Vec::with_capacity(pending.len());
    while order.len() < pending.len() {
        let ready = (0..pending.len()).find(|&i| !done[i] && deps[i].iter().all(|&d| done[d]));
        match ready {
            Some(i) => {
                done[i] = true;
                order.push(i);
            }
            None => {
                // Whatever is left depends on itself; run it in source order
                let Some(first) = (0..pending.len()).find(|&i| !done[i]) else {
                    break;
                };
                let init = &pending[first];
                let name = gen.module.global(init.global).map_or_else(String::new, |g| g.name.clone());
                let message = format!("initializer of `{name}` depends on itself");
                let (file, pos) = (init.file, init.expr.pos);
                gen.fallback(file, pos, message);
                for (i, flag) in done.iter_mut().enumerate() {
                    if !*flag {
                        *flag = true;
                        order.push(i);
                    }
                }
            }
        }
    }
    trace!("runtime initializer order: {order:?}");

    let mut slots: Vec<Option<PendingInit<'a>>> = pending.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

/// Globals and runtime-initialized constants `expr` reads
fn referenced_globals(gen: &IrGenerator<'_>, file: usize, expr: &Expr, out: &mut Vec<GlobalId>) {
    match &expr.kind {
        ExprKind::Ident(name) => {
            let symbol = gen.lookup_symbol(gen.module_name(file), name).map(|(s, _)| s);
            push_storage(gen, symbol, out);
        }
        ExprKind::Selector { base, field } => match &base.kind {
            ExprKind::Ident(alias) if gen.is_module(file, alias) => {
                push_storage(gen, gen.lookup_qualified(file, alias, field), out);
            }
            _ => referenced_globals(gen, file, base, out),
        },
        ExprKind::Binary { lhs, rhs, .. } => {
            referenced_globals(gen, file, lhs, out);
            referenced_globals(gen, file, rhs, out);
        }
        ExprKind::Index { base, index } => {
            referenced_globals(gen, file, base, out);
            referenced_globals(gen, file, index, out);
        }
        ExprKind::Unary { operand: inner, .. }
        | ExprKind::Paren(inner)
        | ExprKind::Cast { expr: inner, .. }
        | ExprKind::AddrOf(inner)
        | ExprKind::Deref(inner) => referenced_globals(gen, file, inner, out),
        ExprKind::Call { callee, args } => {
            referenced_globals(gen, file, callee, out);
            for arg in args {
                referenced_globals(gen, file, arg, out);
            }
        }
        ExprKind::StructLit { fields, .. } => {
            for (_, value) in fields {
                referenced_globals(gen, file, value, out);
            }
        }
        ExprKind::ArrayLit { elems, .. } => {
            for elem in elems {
                referenced_globals(gen, file, elem, out);
            }
        }
        // Anonymous function bodies run later, not while initializing
        ExprKind::AnonFn(_)
        | ExprKind::IntLit(_)
        | ExprKind::FloatLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::CharLit(_)
        | ExprKind::StringLit(_)
        | ExprKind::Nil
        | ExprKind::EnumVal { .. }
        | ExprKind::SizeOf(_) => {}
    }
}

fn push_storage(gen: &IrGenerator<'_>, symbol: Option<Symbol>, out: &mut Vec<GlobalId>) {
    match symbol {
        Some(Symbol::Global(global)) => out.push(global),
        Some(Symbol::Const(key)) => out.extend(gen.consts.get(&key).and_then(|entry| entry.global)),
        _ => {}
    }
}

/// Insert a call to the initializer after the slots of the entry function
fn call_from_entry(gen: &mut IrGenerator<'_>, init_name: &str) {
    let (Some(init), Some(main)) = (
        gen.module.find_function(init_name),
        gen.module.find_function(&gen.options.entry_function),
    ) else {
        debug!("no `{}` to call {init_name} from", gen.options.entry_function);
        return;
    };
    let Some(entry) = gen.module.function(main).and_then(|f| f.entry()) else {
        debug!("`{}` has no body to call {init_name} from", gen.options.entry_function);
        return;
    };
    // After the slots and before any user code, so `main` sees initialized globals
    let position = gen.module.block(entry).map_or(0, |b| {
        b.instrs
            .iter()
            .take_while(|v| gen.module.instr_of(**v).is_some_and(|i| i.op == Opcode::Alloca))
            .count()
    });
    let callee = gen.module.func_ref(init);
    let void = gen.module.types.get_void();
    if let Err(err) = gen
        .module
        .insert_instr(entry, position, Instr::new(Opcode::Call, vec![callee], void))
    {
        warn!("could not call {init_name} from the entry function: {err}");
    }
}
