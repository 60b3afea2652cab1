//! `if`, loops and `match`

use super::super::const_eval::ConstEval;
use super::super::context::{FnCtx, Local, LoopTarget};
use super::super::errors::CodegenError;
use super::super::expressions::{address_of, binary_values, convert, load_field, lower_cond, lower_expr};
use super::super::runtime::{ARRAY_DATA_FIELD, ARRAY_LEN_FIELD, STRING_DATA_FIELD, STRING_LEN_FIELD};
use super::super::IrGenerator;
use super::{lower_body, lower_stmt};
use crate::ast::{BinaryOp, Expr, ForIter, MatchArm, Stmt};
use crate::env::CheckedType;
use log::trace;
use std::collections::HashSet;
use strata_ir::{BlockId, Opcode, Type, TypeId, ValueId};

pub(super) fn lower_if(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    cond: &Expr,
    then_body: &[Stmt],
    else_body: Option<&[Stmt]>,
) -> Result<(), CodegenError> {
    let value = lower_cond(gen, ctx, cond)?;
    let then_block = ctx.new_block(gen, "if.then")?;
    let else_block = match else_body {
        Some(_) => Some(ctx.new_block(gen, "if.else")?),
        None => None,
    };
    let end = ctx.new_block(gen, "if.end")?;
    gen.module
        .build_br(ctx.block, value, then_block, else_block.unwrap_or(end))?;

    ctx.block = then_block;
    lower_body(gen, ctx, then_body)?;
    ctx.switch_to(gen, end)?;

    if let (Some(block), Some(body)) = (else_block, else_body) {
        ctx.block = block;
        lower_body(gen, ctx, body)?;
        ctx.switch_to(gen, end)?;
    }
    ctx.block = end;
    Ok(())
}

/// C-style `for init; cond; post { body }`; a missing condition loops forever
pub(super) fn lower_for(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    label: Option<&str>,
    init: Option<&Stmt>,
    cond: Option<&Expr>,
    post: Option<&Stmt>,
    body: &[Stmt],
) -> Result<(), CodegenError> {
    ctx.push_scope();
    if let Some(init) = init {
        lower_stmt(gen, ctx, init)?;
    }

    let cond_block = ctx.new_block(gen, "for.cond")?;
    let body_block = ctx.new_block(gen, "for.body")?;
    let post_block = ctx.new_block(gen, "for.post")?;
    let exit = ctx.new_block(gen, "for.end")?;

    ctx.switch_to(gen, cond_block)?;
    match cond {
        Some(cond) => {
            let value = lower_cond(gen, ctx, cond)?;
            gen.module.build_br(ctx.block, value, body_block, exit)?;
        }
        None => {
            gen.module.build_jmp(ctx.block, body_block)?;
        }
    }

    ctx.block = body_block;
    loop_body(gen, ctx, label, body, exit, post_block)?;

    ctx.switch_to(gen, post_block)?;
    if let Some(post) = post {
        lower_stmt(gen, ctx, post)?;
    }
    if !gen.module.is_terminated(ctx.block) {
        gen.module.build_jmp(ctx.block, cond_block)?;
    }

    ctx.block = exit;
    ctx.pop_scope();
    Ok(())
}

/// Lower a loop body with `break`/`continue` bound to the given blocks
fn loop_body(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    label: Option<&str>,
    body: &[Stmt],
    break_block: BlockId,
    continue_block: BlockId,
) -> Result<(), CodegenError> {
    ctx.push_loop(LoopTarget {
        label: label.map(str::to_string),
        break_block,
        continue_block,
    });
    let result = lower_body(gen, ctx, body);
    ctx.pop_loop();
    result
}

/// Elements of a collection being iterated
struct Elements {
    /// Pointer to the first element
    data: ValueId,
    elem: TypeId,
    len: ValueId,
}

/// `for key, value in lo..hi` or `for key, value in collection`
#[allow(clippy::too_many_arguments)]
pub(super) fn lower_for_in(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    stmt: &Stmt,
    label: Option<&str>,
    key: Option<&str>,
    value: Option<&str>,
    iter: &ForIter,
    body: &[Stmt],
) -> Result<(), CodegenError> {
    ctx.push_scope();

    let (counter, bound, elements) = match iter {
        ForIter::Range(lo, hi) => {
            let lo = lower_expr(gen, ctx, lo)?;
            let ty = gen.module.value_type(lo);
            let hi = lower_expr(gen, ctx, hi)?;
            let hi = convert(gen, ctx, hi, ty)?;
            let counter = ctx.new_slot(gen, ty)?;
            gen.module.build_store(ctx.block, lo, counter)?;
            // The range variable is the counter itself
            if let Some(name) = value.or(key).filter(|n| *n != "_") {
                ctx.bind(name, Local { slot: counter, ty });
            }
            (counter, hi, None)
        }
        ForIter::Collection(collection) => {
            let Some(elements) = collection_elements(gen, ctx, stmt, collection)? else {
                ctx.pop_scope();
                return Ok(());
            };
            let ty = gen.module.value_type(elements.len);
            let counter = ctx.new_slot(gen, ty)?;
            let zero = gen.module.const_int(ty, 0);
            gen.module.build_store(ctx.block, zero, counter)?;
            if let Some(name) = key.filter(|n| *n != "_") {
                ctx.bind(name, Local { slot: counter, ty });
            }
            let len = elements.len;
            (counter, len, Some(elements))
        }
    };
    let ty = gen.module.value_type(bound);

    let cond_block = ctx.new_block(gen, "for.cond")?;
    let body_block = ctx.new_block(gen, "for.body")?;
    let post_block = ctx.new_block(gen, "for.post")?;
    let exit = ctx.new_block(gen, "for.end")?;

    ctx.switch_to(gen, cond_block)?;
    let current = gen.module.build_load(ctx.block, counter, ty)?;
    let more = gen.module.build_binary(ctx.block, Opcode::Lt, current, bound)?;
    gen.module.build_br(ctx.block, more, body_block, exit)?;

    ctx.block = body_block;
    if let (Some(elements), Some(name)) = (&elements, value.filter(|n| *n != "_")) {
        let index = gen.module.build_load(ctx.block, counter, ty)?;
        let ptr = gen.module.build_gep(ctx.block, elements.data, index)?;
        let element = gen.module.build_load(ctx.block, ptr, elements.elem)?;
        let slot = ctx.new_slot(gen, elements.elem)?;
        gen.module.build_store(ctx.block, element, slot)?;
        ctx.bind(name, Local { slot, ty: elements.elem });
    }
    loop_body(gen, ctx, label, body, exit, post_block)?;

    ctx.switch_to(gen, post_block)?;
    let current = gen.module.build_load(ctx.block, counter, ty)?;
    let one = gen.module.const_int(ty, 1);
    let next = gen.module.build_binary(ctx.block, Opcode::Add, current, one)?;
    gen.module.build_store(ctx.block, next, counter)?;
    gen.module.build_jmp(ctx.block, cond_block)?;

    ctx.block = exit;
    ctx.pop_scope();
    Ok(())
}

/// Data pointer, element type and length of a fixed array, dynamic array or string
fn collection_elements(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    stmt: &Stmt,
    collection: &Expr,
) -> Result<Option<Elements>, CodegenError> {
    let (ptr, ty) = address_of(gen, ctx, collection)?;
    let i32_ty = gen.module.types.get_int(32);

    if let Some(Type::Array { elem, len }) = gen.module.types.get(ty).cloned() {
        let elem_ptr = gen.module.types.get_ptr(elem);
        let data = gen.module.build_cast(ctx.block, Opcode::Bitcast, ptr, elem_ptr)?;
        let len = gen.module.const_int(i32_ty, i64::try_from(len).unwrap_or(i64::MAX));
        return Ok(Some(Elements { data, elem, len }));
    }
    if gen.is_dyn_array(ty) {
        let env = gen.env;
        let elem = match env.type_of(collection.pos) {
            Some(CheckedType::DynArray(elem)) => gen.checked_to_ir(ctx.file, collection.pos, elem),
            _ => {
                gen.fallback(ctx.file, collection.pos, "element type of array is unknown".to_string());
                gen.fallback_int_type()
            }
        };
        let raw = load_field(gen, ctx, ptr, ARRAY_DATA_FIELD)?;
        let elem_ptr = gen.module.types.get_ptr(elem);
        let data = gen.module.build_cast(ctx.block, Opcode::Bitcast, raw, elem_ptr)?;
        let len = load_field(gen, ctx, ptr, ARRAY_LEN_FIELD)?;
        return Ok(Some(Elements { data, elem, len }));
    }
    if gen.is_string(ty) {
        let data = load_field(gen, ctx, ptr, STRING_DATA_FIELD)?;
        let elem = gen.module.types.get_uint(8);
        let len = load_field(gen, ctx, ptr, STRING_LEN_FIELD)?;
        return Ok(Some(Elements { data, elem, len }));
    }

    let message = format!("cannot iterate over `{}`", gen.module.types.display(ty));
    gen.fallback(ctx.file, stmt.pos, message);
    Ok(None)
}

/// `match subject { labels => body ... else => body }`. Integer subjects
/// whose labels all fold become a single `switch`; anything else is a chain
/// of equality tests.
pub(super) fn lower_match(
    gen: &mut IrGenerator<'_>,
    ctx: &mut FnCtx,
    subject: &Expr,
    arms: &[MatchArm],
    else_body: Option<&[Stmt]>,
) -> Result<(), CodegenError> {
    let value = lower_expr(gen, ctx, subject)?;
    let ty = gen.module.value_type(value);

    let mut arm_blocks = Vec::with_capacity(arms.len());
    for _ in arms {
        arm_blocks.push(ctx.new_block(gen, "match.arm")?);
    }
    let else_block = match else_body {
        Some(_) => Some(ctx.new_block(gen, "match.else")?),
        None => None,
    };
    let end = ctx.new_block(gen, "match.end")?;
    let default = else_block.unwrap_or(end);

    let folded = if gen.module.types.is_int(ty) {
        fold_labels(gen, ctx, subject, arms)
    } else {
        None
    };
    match folded {
        Some(labels) => {
            let mut seen = HashSet::new();
            let mut cases = Vec::new();
            for (block, values) in arm_blocks.iter().zip(labels) {
                for v in values {
                    if !seen.insert(v) {
                        trace!("duplicate match label {v} ignored");
                        continue;
                    }
                    cases.push((gen.module.const_int(ty, v), *block));
                }
            }
            trace!("match lowered to a switch with {} cases", cases.len());
            gen.module.build_switch(ctx.block, value, default, &cases)?;
        }
        None => {
            for (block, arm) in arm_blocks.iter().zip(arms) {
                for label in &arm.labels {
                    let candidate = lower_expr(gen, ctx, label)?;
                    let equal = binary_values(gen, ctx, label, BinaryOp::Eq, value, candidate)?;
                    let next = ctx.new_block(gen, "match.next")?;
                    gen.module.build_br(ctx.block, equal, *block, next)?;
                    ctx.block = next;
                }
            }
            gen.module.build_jmp(ctx.block, default)?;
        }
    }

    for (block, arm) in arm_blocks.into_iter().zip(arms) {
        ctx.block = block;
        lower_body(gen, ctx, &arm.body)?;
        ctx.switch_to(gen, end)?;
    }
    if let (Some(block), Some(body)) = (else_block, else_body) {
        ctx.block = block;
        lower_body(gen, ctx, body)?;
        ctx.switch_to(gen, end)?;
    }
    ctx.block = end;
    Ok(())
}

/// Constant value of every label, or `None` if any does not fold
fn fold_labels(gen: &IrGenerator<'_>, ctx: &FnCtx, subject: &Expr, arms: &[MatchArm]) -> Option<Vec<Vec<i64>>> {
    let hint = match gen.env.type_of(subject.pos) {
        Some(CheckedType::Enum { module, name }) => Some((module.clone(), name.clone())),
        _ => None,
    };
    arms.iter()
        .map(|arm| {
            arm.labels
                .iter()
                .map(|label| {
                    ConstEval::new(gen, ctx.file)
                        .with_enum_hint(hint.clone())
                        .try_eval_const_int(label)
                })
                .collect::<Option<Vec<i64>>>()
        })
        .collect()
}
