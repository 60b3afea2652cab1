//! Unit tests for the IR arena and builder helpers

use super::*;
use pretty_assertions::assert_eq;

fn module_with_function() -> (Module, FuncId, BlockId, TypeId) {
    let mut module = Module::new("test".to_string(), 8);
    let i32_ty = module.types.get_int(32);
    let f = module.add_function("test__f", &[i32_ty], i32_ty, false);
    let entry = module.add_block(f, "entry").unwrap();
    (module, f, entry, i32_ty)
}

#[test]
fn test_append_after_terminator_fails() {
    let (mut module, _, entry, i32_ty) = module_with_function();
    let zero = module.const_int(i32_ty, 0);
    module.build_ret(entry, Some(zero)).unwrap();
    assert!(module.is_terminated(entry));

    let one = module.const_int(i32_ty, 1);
    assert_eq!(
        module.build_ret(entry, Some(one)),
        Err(IrError::BlockTerminated(entry))
    );
    assert_eq!(module.block(entry).unwrap().instrs.len(), 1);
}

#[test]
fn test_unknown_block_and_value() {
    let (mut module, _, entry, _) = module_with_function();
    assert_eq!(
        module.build_unreachable(BlockId(42)),
        Err(IrError::InvalidBlock(BlockId(42)))
    );
    assert_eq!(
        module.build_ret(entry, Some(ValueId(9999))),
        Err(IrError::InvalidValue(ValueId(9999)))
    );
}

#[test]
fn test_slot_load_store() {
    let (mut module, f, entry, i32_ty) = module_with_function();
    let slot = module.build_alloca(entry, i32_ty).unwrap();
    let param = module.function(f).unwrap().params[0];
    module.build_store(entry, param, slot).unwrap();
    let loaded = module.build_load(entry, slot, i32_ty).unwrap();

    assert_eq!(module.types.pointee(module.value_type(slot)), Some(i32_ty));
    assert_eq!(module.value_type(loaded), i32_ty);
    let store = module.instr_of(module.block(entry).unwrap().instrs[1]).unwrap();
    assert_eq!(store.op, Opcode::Store);
    assert_eq!(store.operands, vec![param, slot]);
}

#[test]
fn test_insert_alloca_at_front() {
    let (mut module, _, entry, i32_ty) = module_with_function();
    let a = module.build_alloca(entry, i32_ty).unwrap();
    let b = module.insert_alloca(entry, 0, i32_ty).unwrap();
    let zero = module.const_int(i32_ty, 0);
    module.build_ret(entry, Some(zero)).unwrap();
    // Inserting before the terminator is allowed
    let c = module.insert_alloca(entry, 2, i32_ty).unwrap();

    let instrs = &module.block(entry).unwrap().instrs;
    assert_eq!(instrs[..3].to_vec(), vec![b, a, c]);
    assert!(module.is_terminated(entry));
}

#[test]
fn test_comparison_yields_bool() {
    let (mut module, f, entry, i32_ty) = module_with_function();
    let param = module.function(f).unwrap().params[0];
    let ten = module.const_int(i32_ty, 10);
    let lt = module.build_binary(entry, Opcode::Lt, param, ten).unwrap();
    let add = module.build_binary(entry, Opcode::Add, param, ten).unwrap();

    assert!(module.types.is_bool(module.value_type(lt)));
    assert_eq!(module.value_type(add), i32_ty);
}

#[test]
fn test_field_ptr_and_extract() {
    let (mut module, _, entry, i32_ty) = module_with_function();
    let f64_ty = module.types.get_float(64);
    let point = module.types.declare_struct("test__Point", false);
    module
        .types
        .fill_struct(point, vec![i32_ty, f64_ty], vec!["x".into(), "y".into()])
        .unwrap();

    let slot = module.build_alloca(entry, point).unwrap();
    let y = module.build_field_ptr(entry, slot, 1).unwrap();
    assert_eq!(module.types.pointee(module.value_type(y)), Some(f64_ty));
    assert!(module.build_field_ptr(entry, slot, 5).is_err());

    let pair = module.types.get_tuple(vec![i32_ty, f64_ty]);
    let call_target = module.const_null(i32_ty);
    let agg = module.build_call(entry, call_target, &[], pair).unwrap();
    let second = module.build_extract(entry, agg, 1).unwrap();
    assert_eq!(module.value_type(second), f64_ty);
}

#[test]
fn test_switch_operands() {
    let (mut module, f, entry, i32_ty) = module_with_function();
    let a = module.add_block(f, "case.a").unwrap();
    let b = module.add_block(f, "case.b").unwrap();
    let d = module.add_block(f, "default").unwrap();
    let param = module.function(f).unwrap().params[0];
    let one = module.const_int(i32_ty, 1);
    let two = module.const_int(i32_ty, 2);
    module.build_switch(entry, param, d, &[(one, a), (two, b)]).unwrap();

    let term = module.terminator(entry).unwrap();
    let targets: Vec<BlockId> = term
        .switch_targets()
        .iter()
        .filter_map(|v| module.value(*v).and_then(|v| v.as_block()))
        .collect();
    assert_eq!(targets, vec![d, a, b]);
}

#[test]
fn test_func_ref_type() {
    let (mut module, f, _, i32_ty) = module_with_function();
    let r = module.func_ref(f);
    let ft = module.types.func_type(module.value_type(r)).unwrap();
    assert_eq!(ft.params, vec![i32_ty]);
    assert_eq!(ft.ret, i32_ty);
}
