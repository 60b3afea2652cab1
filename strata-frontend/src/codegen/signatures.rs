//! Phase 4: function signatures
//!
//! Every function gets its mangled symbol name and parameter/return types
//! before any body is lowered, so calls can refer to functions declared later.

use super::{IrGenerator, Symbol};
use crate::ast::{FnDecl, Item};
use log::trace;
use strata_ir::{FuncId, TypeId};

pub(crate) fn register_signatures(gen: &mut IrGenerator<'_>) {
    let files = gen.files;
    for (file, source) in files.iter().enumerate() {
        for (index, item) in source.items.iter().enumerate() {
            let Item::Fn(decl) = item else {
                continue;
            };
            let func = register_signature(gen, file, decl);
            gen.fn_ids.insert((file, index), func);
        }
    }
}

fn register_signature(gen: &mut IrGenerator<'_>, file: usize, decl: &FnDecl) -> FuncId {
    let module = gen.module_name(file);

    let mut params = Vec::with_capacity(decl.params.len() + 1);
    let mut receiver_struct = None;
    if let Some(receiver) = &decl.receiver {
        let ty = gen.resolve_type(file, receiver.pos, &receiver.ty);
        receiver_struct = Some(strip_pointers(gen, ty));
        params.push(ty);
    }
    for param in &decl.params {
        params.push(gen.resolve_type(file, param.pos, &param.ty));
    }
    let ret = match &decl.ret {
        Some(ty) => gen.resolve_type(file, decl.pos, ty),
        None => gen.module.types.get_void(),
    };

    let name = match receiver_struct {
        _ if decl.is_extern => decl.name.clone(),
        Some(st) => format!("{}__{}", gen.module.types.display(st), decl.name),
        None if module == gen.options.entry_module && decl.name == gen.options.entry_function => {
            decl.name.clone()
        }
        None => IrGenerator::mangle(module, &decl.name),
    };

    let func = match gen.module.find_function(&name) {
        Some(existing) => {
            trace!("signature {name} already registered as {existing}");
            existing
        }
        None => {
            let func = gen.module.add_function(&name, &params, ret, decl.is_variadic);
            if let Some(f) = gen.module.function_mut(func) {
                f.is_extern = decl.is_extern;
            }
            trace!("signature {name}: {}", describe(gen, &params, ret));
            func
        }
    };

    match receiver_struct {
        Some(st) => {
            gen.methods.insert((st, decl.name.clone()), func);
        }
        None => {
            gen.symbols
                .insert((module.to_string(), decl.name.clone()), Symbol::Fn(func));
        }
    }
    func
}

fn strip_pointers(gen: &IrGenerator<'_>, mut ty: TypeId) -> TypeId {
    while let Some(base) = gen.module.types.pointee(ty) {
        ty = base;
    }
    ty
}

fn describe(gen: &IrGenerator<'_>, params: &[TypeId], ret: TypeId) -> String {
    let types = &gen.module.types;
    let params: Vec<String> = params.iter().map(|p| types.display(*p)).collect();
    format!("({}) {}", params.join(", "), types.display(ret))
}
