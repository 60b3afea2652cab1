//! Phase 3: constants and globals
//!
//! Constants fold in declaration order using only what is already folded.
//! A constant that refers to a later one gets a zero placeholder, and a sweep
//! re-folds placeholders until nothing changes. Whatever still does not fold
//! is turned into an immutable global computed by the runtime initializer.

use super::const_eval::ConstEval;
use super::{ConstEntry, ConstValue, IrGenerator, PendingInit, Symbol, SymbolKey};
use crate::ast::{ConstDecl, Expr, ExprKind, Item};
use log::{debug, trace};
use strata_ir::{GlobalVar, Module, Type, TypeId};

pub(crate) fn register_consts_and_globals(gen: &mut IrGenerator<'_>) {
    let order = gen.const_order.clone();
    for &(ref key, file, decl) in &order {
        register_const(gen, key, file, decl);
    }
    resolve_placeholders(gen, &order);
    register_globals(gen);
}

fn register_const<'a>(gen: &mut IrGenerator<'a>, key: &SymbolKey, file: usize, decl: &'a ConstDecl) {
    if let ExprKind::ArrayLit { elems, fixed } = &decl.value.unparen().kind {
        register_const_array(gen, key, file, decl, elems, *fixed);
        return;
    }

    let folded = ConstEval::new(gen, file).const_value(&decl.value);
    let entry = match folded {
        Some(value) => {
            let ty = const_type(gen, file, &decl.value, &value);
            trace!("const {}.{} = {value:?}", key.0, key.1);
            ConstEntry {
                value,
                ty,
                placeholder: false,
                global: None,
            }
        }
        None => {
            let ty = match gen.oracle_type(file, decl.value.pos) {
                Some(ty) => ty,
                None => gen.int_type(),
            };
            trace!("const {}.{} deferred", key.0, key.1);
            ConstEntry {
                value: ConstValue::Int(0),
                ty,
                placeholder: true,
                global: None,
            }
        }
    };
    gen.consts.insert(key.clone(), entry);
}

/// Fixed arrays whose elements all fold become a byte payload; anything else
/// is filled in at run time
fn register_const_array<'a>(
    gen: &mut IrGenerator<'a>,
    key: &SymbolKey,
    file: usize,
    decl: &'a ConstDecl,
    elems: &[Expr],
    fixed: bool,
) {
    let folded: Option<Vec<ConstValue>> = {
        let eval = ConstEval::new(gen, file);
        elems
            .iter()
            .map(|e| match eval.const_value(e)? {
                ConstValue::Str(_) => None,
                scalar => Some(scalar),
            })
            .collect()
    };

    let elem_ty = array_elem_type(gen, file, &decl.value, elems);
    let ty = if fixed {
        gen.module.types.get_array(elem_ty, elems.len() as u64)
    } else {
        gen.runtime.array
    };

    let payload = match folded {
        Some(values) if fixed => {
            let mut bytes = Vec::new();
            for value in &values {
                match scalar_bytes(&gen.module, elem_ty, value) {
                    Some(b) => bytes.extend(b),
                    None => {
                        bytes.clear();
                        break;
                    }
                }
            }
            (bytes.len() as u64 == gen.module.types.size_of(ty)).then_some(bytes)
        }
        _ => None,
    };

    let is_runtime = payload.is_none();
    let global = gen.module.add_global(GlobalVar {
        name: IrGenerator::mangle(&key.0, &key.1),
        ty,
        is_mutable: false,
        init: payload,
    });
    if is_runtime {
        gen.pending_inits.push(PendingInit {
            global,
            file,
            expr: &decl.value,
        });
    }
    debug!(
        "const array {}.{}: {} elements, {}",
        key.0,
        key.1,
        elems.len(),
        if is_runtime { "runtime initialized" } else { "folded" }
    );
    gen.consts.insert(
        key.clone(),
        ConstEntry {
            value: ConstValue::Int(0),
            ty,
            placeholder: false,
            global: Some(global),
        },
    );
}

fn array_elem_type(gen: &mut IrGenerator<'_>, file: usize, array: &Expr, elems: &[Expr]) -> TypeId {
    if let Some(ty) = gen.oracle_type(file, array.pos) {
        if let Some(Type::Array { elem, .. }) = gen.module.types.get(ty) {
            return *elem;
        }
    }
    match elems.first() {
        Some(first) => {
            if let Some(ty) = gen.oracle_type(file, first.pos) {
                return ty;
            }
            let value = ConstEval::new(gen, file).const_value(first);
            match value {
                Some(ConstValue::Float(_)) => gen.module.types.get_float(64),
                Some(ConstValue::Str(_)) => gen.runtime.string,
                _ => gen.int_type(),
            }
        }
        None => gen.int_type(),
    }
}

/// Type of a folded constant: the checker's if known, otherwise by value kind
fn const_type(gen: &mut IrGenerator<'_>, file: usize, expr: &Expr, value: &ConstValue) -> TypeId {
    let oracle = gen.oracle_type(file, expr.pos);
    match value {
        ConstValue::Str(_) => gen.runtime.string,
        ConstValue::Float(_) => match oracle {
            Some(ty) if gen.module.types.is_float(ty) => ty,
            _ => gen.module.types.get_float(64),
        },
        ConstValue::Int(_) => match oracle {
            Some(ty) if gen.module.types.is_int(ty) || gen.module.types.is_float(ty) => ty,
            _ => gen.int_type(),
        },
    }
}

/// Re-fold placeholders until a pass makes no progress
fn resolve_placeholders<'a>(gen: &mut IrGenerator<'a>, order: &[(SymbolKey, usize, &'a ConstDecl)]) {
    // A constant can name one declared later in source, so one pass is not
    // enough. Each sweep resolves at least one more or ends the loop.
    let mut sweeps = 0;
    loop {
        let mut changed = false;
        for &(ref key, file, decl) in order {
            if !gen.consts.get(key).is_some_and(|e| e.placeholder) {
                continue;
            }
            let Some(value) = ConstEval::new(gen, file).const_value(&decl.value) else {
                continue;
            };
            let ty = const_type(gen, file, &decl.value, &value);
            trace!("const {}.{} resolved to {value:?}", key.0, key.1);
            gen.consts.insert(
                key.clone(),
                ConstEntry {
                    value,
                    ty,
                    placeholder: false,
                    global: None,
                },
            );
            changed = true;
        }
        sweeps += 1;
        if !changed {
            break;
        }
    }
    debug!("constant re-resolution settled after {sweeps} sweep(s)");

    // Whatever is still a placeholder needs code to compute, so it becomes a
    // global filled in by the initializer.
    for &(ref key, file, decl) in order {
        let Some(entry) = gen.consts.get(key) else {
            continue;
        };
        if !entry.placeholder {
            continue;
        }
        let ty = entry.ty;
        let global = gen.module.add_global(GlobalVar {
            name: IrGenerator::mangle(&key.0, &key.1),
            ty,
            is_mutable: false,
            init: None,
        });
        gen.pending_inits.push(PendingInit {
            global,
            file,
            expr: &decl.value,
        });
        if let Some(entry) = gen.consts.get_mut(key) {
            entry.placeholder = false;
            entry.global = Some(global);
        }
        debug!("const {}.{} is not constant, initialized at run time", key.0, key.1);
    }
}

fn register_globals(gen: &mut IrGenerator<'_>) {
    let files = gen.files;
    for (file, source) in files.iter().enumerate() {
        for item in &source.items {
            let Item::Global(decl) = item else {
                continue;
            };
            let folded = decl
                .init
                .as_ref()
                .and_then(|init| ConstEval::new(gen, file).const_value(init));

            let ty = match (&decl.ty, &decl.init) {
                (Some(ty), _) => gen.resolve_type(file, decl.pos, ty),
                (None, Some(init)) => match gen.oracle_type(file, init.pos) {
                    Some(ty) => ty,
                    None => match &folded {
                        Some(value) => const_type(gen, file, init, value),
                        None => {
                            gen.fallback(file, decl.pos, format!("type of global `{}` is unknown", decl.name));
                            gen.fallback_int_type()
                        }
                    },
                },
                (None, None) => {
                    gen.fallback(file, decl.pos, format!("global `{}` has neither type nor value", decl.name));
                    gen.fallback_int_type()
                }
            };

            let payload = folded.as_ref().and_then(|v| scalar_bytes(&gen.module, ty, v));
            let needs_init = decl.init.is_some() && payload.is_none();
            let global = gen.module.add_global(GlobalVar {
                name: IrGenerator::mangle(&source.module, &decl.name),
                ty,
                is_mutable: true,
                init: payload,
            });
            if let (true, Some(init)) = (needs_init, &decl.init) {
                gen.pending_inits.push(PendingInit {
                    global,
                    file,
                    expr: init,
                });
            }
            gen.symbols
                .insert((source.module.clone(), decl.name.clone()), Symbol::Global(global));
            trace!("global {}.{}: {}", source.module, decl.name, gen.module.types.display(ty));
        }
    }
}

/// Little-endian encoding of a folded scalar as a value of type `ty`
pub(crate) fn scalar_bytes(module: &Module, ty: TypeId, value: &ConstValue) -> Option<Vec<u8>> {
    let types = &module.types;
    let size = usize::try_from(types.size_of(ty)).ok()?;
    match (types.get(ty)?, value) {
        (Type::Int { .. }, ConstValue::Int(v)) => Some(v.to_le_bytes()[..size.min(8)].to_vec()),
        (Type::Float { width: 32 }, ConstValue::Int(v)) => Some((*v as f32).to_le_bytes().to_vec()),
        (Type::Float { width: 32 }, ConstValue::Float(v)) => Some((*v as f32).to_le_bytes().to_vec()),
        (Type::Float { .. }, ConstValue::Int(v)) => Some((*v as f64).to_le_bytes().to_vec()),
        (Type::Float { .. }, ConstValue::Float(v)) => Some(v.to_le_bytes().to_vec()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_bytes() {
        let mut module = Module::new("main".to_string(), 8);
        let i32_ty = module.types.get_int(32);
        let u8_ty = module.types.get_uint(8);
        let f32_ty = module.types.get_float(32);
        let ptr = module.types.get_ptr(u8_ty);

        assert_eq!(scalar_bytes(&module, i32_ty, &ConstValue::Int(258)), Some(vec![2, 1, 0, 0]));
        assert_eq!(scalar_bytes(&module, u8_ty, &ConstValue::Int(-1)), Some(vec![0xff]));
        assert_eq!(
            scalar_bytes(&module, f32_ty, &ConstValue::Float(1.0)),
            Some(1.0f32.to_le_bytes().to_vec())
        );
        assert_eq!(scalar_bytes(&module, ptr, &ConstValue::Int(0)), None);
        assert_eq!(scalar_bytes(&module, i32_ty, &ConstValue::Str("x".into())), None);
    }
}
