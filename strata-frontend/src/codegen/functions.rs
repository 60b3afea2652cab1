//! Phase 5: function bodies
//!
//! Each body gets its own [`FnCtx`]; parameters are copied into slots so the
//! body can assign to them like any other local.

use super::context::{FnCtx, Local};
use super::errors::CodegenError;
use super::statements::lower_stmt;
use super::IrGenerator;
use crate::ast::{FnDecl, Item, Stmt};
use log::{debug, trace};
use strata_ir::FuncId;

pub(crate) fn lower_bodies(gen: &mut IrGenerator<'_>) -> Result<(), CodegenError> {
    let files = gen.files;
    for (file, source) in files.iter().enumerate() {
        for (index, item) in source.items.iter().enumerate() {
            let Item::Fn(decl) = item else {
                continue;
            };
            let Some(body) = decl.body.as_deref().filter(|_| !decl.is_extern) else {
                continue;
            };
            let Some(func) = gen.fn_ids.get(&(file, index)).copied() else {
                continue;
            };
            if gen.module.function(func).is_some_and(|f| !f.blocks.is_empty()) {
                let message = format!("function `{}` has more than one body", decl.name);
                gen.fallback(file, decl.pos, message);
                continue;
            }
            lower_function(gen, file, func, decl, body)?;
        }
    }
    Ok(())
}

/// Lower an anonymous function into a new module-level function
pub(crate) fn lower_anon_fn(gen: &mut IrGenerator<'_>, file: usize, decl: &FnDecl) -> Result<FuncId, CodegenError> {
    gen.anon_count += 1;
    let module = gen.module_name(file);
    let name = IrGenerator::mangle(module, &format!("anon_fn_{}", gen.anon_count));

    let mut params = Vec::with_capacity(decl.params.len());
    for param in &decl.params {
        params.push(gen.resolve_type(file, param.pos, &param.ty));
    }
    let ret = match &decl.ret {
        Some(ty) => gen.resolve_type(file, decl.pos, ty),
        None => gen.module.types.get_void(),
    };
    let func = gen.module.add_function(&name, &params, ret, decl.is_variadic);
    trace!("anonymous function {name}");

    if let Some(body) = &decl.body {
        lower_function(gen, file, func, decl, body)?;
    }
    Ok(func)
}

fn lower_function(
    gen: &mut IrGenerator<'_>,
    file: usize,
    func: FuncId,
    decl: &FnDecl,
    body: &[Stmt],
) -> Result<(), CodegenError> {
    let Some(function) = gen.module.function(func) else {
        return Err(CodegenError::InternalError {
            span: gen.span(file, decl.pos),
            message: format!("no signature for `{}`", decl.name),
        });
    };
    let (params, ret, name) = (function.params.clone(), function.ret, function.name.clone());
    debug!("lowering {name}");

    let entry = gen.module.add_block(func, "entry")?;
    let mut ctx = FnCtx::new(func, file, entry, ret);

    let names = decl.receiver.iter().chain(&decl.params).map(|p| p.name.as_str());
    for (name, param) in names.zip(params) {
        let ty = gen.module.value_type(param);
        let slot = ctx.new_slot(gen, ty)?;
        gen.module.build_store(ctx.block, param, slot)?;
        ctx.bind(name, Local { slot, ty });
    }

    for stmt in body {
        lower_stmt(gen, &mut ctx, stmt)?;
    }
    // The empty target block of such a goto returns like any other open block
    for (label, pos) in ctx.undefined_labels() {
        gen.fallback(file, pos, format!("label `{label}` is never defined"));
    }

    // Whatever still falls off the end returns
    let blocks = gen.module.function(func).map(|f| f.blocks.clone()).unwrap_or_default();
    for block in blocks {
        if gen.module.is_terminated(block) {
            continue;
        }
        let value = if gen.module.types.is_void(ret) {
            None
        } else {
            Some(gen.zero_value(ret))
        };
        gen.module.build_ret(block, value)?;
    }
    trace!("{name}: {} slots", ctx.alloca_count());
    Ok(())
}
