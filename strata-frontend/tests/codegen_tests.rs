//! IR builder scenarios, checked by executing the generated IR

mod common;

use common::{build, build_with, callees, count_ops, run, Val};
use pretty_assertions::assert_eq;
use strata_frontend::ast::build as b;
use strata_frontend::ast::{AssignOp, BinaryOp, Item};
use strata_frontend::env::{CheckedType, MemoryEnv};
use strata_frontend::{BuildOptions, Frontend};
use strata_ir::{Opcode, Type};

fn main_fn(ret: Option<&str>, body: Vec<strata_frontend::ast::Stmt>) -> Item {
    Item::Fn(b::function("main", vec![], ret.map(b::ty), body))
}

#[test]
fn test_forward_constant_reference() {
    let files = vec![b::file(
        "main",
        vec![
            b::const_decl("A", b::binary(BinaryOp::Add, b::ident("B"), b::int(1))),
            b::const_decl("B", b::int(10)),
            main_fn(Some("int"), vec![b::ret(vec![b::ident("A")])]),
        ],
    )];
    let out = build(files);
    assert!(out.diagnostics.is_empty());
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(11));
}

#[test]
fn test_reassignment_reuses_slot() {
    let files = vec![b::file(
        "main",
        vec![main_fn(
            Some("int"),
            vec![
                b::decl("x", b::int(1)),
                b::assign(b::ident("x"), b::binary(BinaryOp::Add, b::ident("x"), b::int(1))),
                b::ret(vec![b::ident("x")]),
            ],
        )],
    )];
    let out = build(files);
    assert_eq!(count_ops(&out.module, "main", Opcode::Alloca), 1);
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(2));
}

#[test]
fn test_short_circuit_skips_rhs() {
    // The right operand would divide by zero
    let cond = b::binary(
        BinaryOp::LogicalAnd,
        b::binary(BinaryOp::Ne, b::ident("a"), b::int(0)),
        b::binary(
            BinaryOp::Gt,
            b::binary(BinaryOp::Div, b::int(10), b::ident("a")),
            b::int(1),
        ),
    );
    let files = vec![b::file(
        "main",
        vec![main_fn(
            Some("int"),
            vec![
                b::decl("a", b::int(0)),
                b::if_else(cond, vec![b::ret(vec![b::int(1)])], None),
                b::ret(vec![b::int(2)]),
            ],
        )],
    )];
    let out = build(files);
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(2));
    assert_eq!(count_ops(&out.module, "main", Opcode::Br), 2);
}

#[test]
fn test_if_else_and_dominators() {
    let files = vec![b::file(
        "main",
        vec![main_fn(
            Some("int"),
            vec![
                b::decl("x", b::int(1)),
                b::if_else(
                    b::binary(BinaryOp::Gt, b::ident("x"), b::int(0)),
                    vec![b::assign(b::ident("x"), b::int(5))],
                    Some(vec![b::assign(b::ident("x"), b::int(6))]),
                ),
                b::ret(vec![b::ident("x")]),
            ],
        )],
    )];
    let out = build(files);
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(5));

    let module = &out.module;
    let main = module.function(module.find_function("main").unwrap()).unwrap();
    let entry = main.entry().unwrap();
    assert_eq!(module.block(entry).unwrap().idom, Some(entry));
    for block in &main.blocks {
        assert!(strata_ir::dominates(module, entry, *block));
    }
    assert!(out.dominator_stats.functions_analyzed >= 1);
}

#[test]
fn test_struct_fields() {
    let files = vec![b::file(
        "main",
        vec![
            b::struct_decl(
                "Point",
                vec![b::field("x", b::ty("int")), b::field("y", b::ty("int"))],
            ),
            main_fn(
                Some("int"),
                vec![
                    b::decl("p", b::struct_lit("Point", vec![("x", b::int(3)), ("y", b::int(4))])),
                    b::assign(
                        b::selector(b::ident("p"), "y"),
                        b::binary(
                            BinaryOp::Add,
                            b::selector(b::ident("p"), "y"),
                            b::selector(b::ident("p"), "x"),
                        ),
                    ),
                    b::ret(vec![b::selector(b::ident("p"), "y")]),
                ],
            ),
        ],
    )];
    let out = build(files);
    assert!(out.diagnostics.is_empty());
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(7));
}

#[test]
fn test_missing_struct_fields_are_zero() {
    let files = vec![b::file(
        "main",
        vec![
            b::struct_decl(
                "Pair",
                vec![b::field("a", b::ty("int")), b::field("b", b::ty("int"))],
            ),
            main_fn(
                Some("int"),
                vec![
                    b::decl("p", b::struct_lit("Pair", vec![("a", b::int(9))])),
                    b::ret(vec![b::selector(b::ident("p"), "b")]),
                ],
            ),
        ],
    )];
    let out = build(files);
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(0));
}

#[test]
fn test_mixed_arithmetic_promotes_to_float() {
    let files = vec![b::file(
        "main",
        vec![main_fn(
            Some("f64"),
            vec![
                b::decl("a", b::int(2)),
                b::decl("b", b::float(1.5)),
                b::ret(vec![b::binary(BinaryOp::Mul, b::ident("a"), b::ident("b"))]),
            ],
        )],
    )];
    let out = build(files);
    assert_eq!(count_ops(&out.module, "main", Opcode::SiToFp), 1);
    assert_eq!(count_ops(&out.module, "main", Opcode::FMul), 1);
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Float(3.0));
}

#[test]
fn test_cast_to_bool_compares_with_zero() {
    let as_int = |name: &str| b::cast(b::ty("int"), b::ident(name));
    let files = vec![b::file(
        "main",
        vec![main_fn(
            Some("int"),
            vec![
                b::decl("x", b::int(2)),
                b::decl("y", b::float(0.25)),
                b::decl("t", b::cast(b::ty("bool"), b::ident("x"))),
                b::decl("u", b::cast(b::ty("bool"), b::ident("y"))),
                b::decl("k", b::cast(b::ty("bool"), b::int(4))),
                b::ret(vec![b::binary(
                    BinaryOp::Add,
                    b::binary(
                        BinaryOp::Add,
                        b::binary(BinaryOp::Mul, as_int("t"), b::int(100)),
                        b::binary(BinaryOp::Mul, as_int("u"), b::int(10)),
                    ),
                    as_int("k"),
                )]),
            ],
        )],
    )];
    let out = build(files);
    let module = &out.module;
    assert_eq!(count_ops(module, "main", Opcode::Trunc), 0);
    assert_eq!(count_ops(module, "main", Opcode::FpToUi), 0);
    assert_eq!(count_ops(module, "main", Opcode::Ne), 1);
    assert_eq!(count_ops(module, "main", Opcode::FNe), 1);
    assert_eq!(run(module, "main", vec![]).unwrap(), Val::Int(111));
}

#[test]
fn test_pointer_arithmetic() {
    let files = vec![b::file(
        "main",
        vec![main_fn(
            Some("int"),
            vec![
                b::decl("arr", b::array(vec![b::int(10), b::int(20), b::int(30)], true)),
                b::decl("p", b::addr_of(b::index(b::ident("arr"), b::int(0)))),
                b::decl("q", b::binary(BinaryOp::Add, b::ident("p"), b::int(2))),
                b::ret(vec![b::deref(b::ident("q"))]),
            ],
        )],
    )];
    let out = build(files);
    assert!(count_ops(&out.module, "main", Opcode::Gep) >= 1);
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(30));
}

#[test]
fn test_multi_value_call() {
    let pair = b::function(
        "pair",
        vec![],
        Some(b::ty_tuple(vec![b::ty("int"), b::ty("int")])),
        vec![b::ret(vec![b::int(1), b::int(2)])],
    );
    let files = vec![b::file(
        "main",
        vec![
            Item::Fn(pair),
            main_fn(
                Some("int"),
                vec![
                    b::decl_multi(&["a", "b"], vec![b::call_fn("pair", vec![])]),
                    b::ret(vec![b::binary(
                        BinaryOp::Add,
                        b::binary(BinaryOp::Mul, b::ident("a"), b::int(10)),
                        b::ident("b"),
                    )]),
                ],
            ),
        ],
    )];
    let out = build(files);
    assert_eq!(count_ops(&out.module, "main", Opcode::ExtractValue), 2);
    assert_eq!(count_ops(&out.module, "main", Opcode::Call), 1);
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(12));
}

#[test]
fn test_swap_reads_before_writing() {
    let files = vec![b::file(
        "main",
        vec![main_fn(
            Some("int"),
            vec![
                b::decl("a", b::int(1)),
                b::decl("b", b::int(2)),
                b::assign_multi(vec![b::ident("a"), b::ident("b")], vec![b::ident("b"), b::ident("a")]),
                b::ret(vec![b::binary(
                    BinaryOp::Add,
                    b::binary(BinaryOp::Mul, b::ident("a"), b::int(10)),
                    b::ident("b"),
                )]),
            ],
        )],
    )];
    let out = build(files);
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(21));
}

#[test]
fn test_unresolved_identifier_falls_back() {
    let files = vec![b::file(
        "main",
        vec![main_fn(Some("int"), vec![b::ret(vec![b::ident("undefined_thing")])])],
    )];
    let out = build(files.clone());
    assert_eq!(out.diagnostics.len(), 1);
    assert!(out.diagnostics[0].message.contains("undefined_thing"));
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(0));

    let strict = BuildOptions {
        strict: true,
        ..BuildOptions::default()
    };
    let result = Frontend::new(strict).build(&files, &MemoryEnv::new());
    assert!(result.is_err());
}

#[test]
fn test_unresolved_call_still_lowers_arguments() {
    let files = vec![b::file(
        "main",
        vec![
            Item::Fn(b::function("seven", vec![], Some(b::ty("int")), vec![b::ret(vec![b::int(7)])])),
            main_fn(
                None,
                vec![b::expr_stmt(b::call_fn("missing", vec![b::call_fn("seven", vec![])]))],
            ),
        ],
    )];
    let out = build(files);
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(count_ops(&out.module, "main", Opcode::Call), 2);
    assert_eq!(callees(&out.module, "main"), vec!["main__seven".to_string()]);
}

#[test]
fn test_constant_array_is_serialized() {
    let files = vec![b::file(
        "main",
        vec![
            b::const_decl("TABLE", b::array(vec![b::int(1), b::int(2), b::int(3)], true)),
            main_fn(Some("int"), vec![b::ret(vec![b::index(b::ident("TABLE"), b::int(1))])]),
        ],
    )];
    let out = build(files);
    let module = &out.module;
    let global = module.global(module.find_global("main__TABLE").unwrap()).unwrap();
    assert_eq!(global.init.as_ref().map(Vec::len), Some(12));
    assert!(!global.is_mutable);
    assert!(module.find_function("_init_globals").is_none());
    assert_eq!(run(module, "main", vec![]).unwrap(), Val::Int(2));
}

#[test]
fn test_runtime_initialized_globals() {
    let seven = b::function("seven", vec![], Some(b::ty("int")), vec![b::ret(vec![b::int(7)])]);
    let files = vec![b::file(
        "main",
        vec![
            b::global_decl("g", Some(b::ty("int")), Some(b::call_fn("seven", vec![]))),
            b::const_decl("LIMIT", b::binary(BinaryOp::Add, b::call_fn("seven", vec![]), b::int(1))),
            Item::Fn(seven),
            main_fn(
                Some("int"),
                vec![
                    b::decl("x", b::ident("g")),
                    b::ret(vec![b::binary(BinaryOp::Add, b::ident("x"), b::ident("LIMIT"))]),
                ],
            ),
        ],
    )];
    let out = build(files);
    let module = &out.module;
    assert!(module.find_function("_init_globals").is_some());
    assert_eq!(callees(module, "main")[0], "_init_globals");
    assert_eq!(callees(module, "_init_globals"), vec!["main__seven", "main__seven"]);

    // The call sits right after the entry block's slots
    let main = module.function(module.find_function("main").unwrap()).unwrap();
    let entry = module.block(main.entry().unwrap()).unwrap();
    assert_eq!(module.instr_of(entry.instrs[0]).unwrap().op, Opcode::Alloca);
    assert_eq!(module.instr_of(entry.instrs[1]).unwrap().op, Opcode::Call);

    assert_eq!(run(module, "main", vec![]).unwrap(), Val::Int(15));
}

fn seven_fn() -> Item {
    Item::Fn(b::function("seven", vec![], Some(b::ty("int")), vec![b::ret(vec![b::int(7)])]))
}

#[test]
fn test_runtime_constants_initialize_in_dependency_order() {
    let files = vec![b::file(
        "main",
        vec![
            b::const_decl("B", b::binary(BinaryOp::Add, b::ident("A"), b::int(1))),
            b::const_decl("A", b::call_fn("seven", vec![])),
            b::const_decl("T", b::array(vec![b::ident("A"), b::int(1)], true)),
            seven_fn(),
            main_fn(
                Some("int"),
                vec![b::ret(vec![b::binary(
                    BinaryOp::Add,
                    b::binary(BinaryOp::Mul, b::ident("B"), b::int(10)),
                    b::index(b::ident("T"), b::int(0)),
                )])],
            ),
        ],
    )];
    let out = build(files);
    assert!(out.diagnostics.is_empty());
    assert_eq!(callees(&out.module, "_init_globals"), vec!["main__seven".to_string()]);
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(87));
}

#[test]
fn test_cyclic_runtime_constants_are_reported() {
    let files = vec![b::file(
        "main",
        vec![
            b::const_decl(
                "X",
                b::binary(BinaryOp::Add, b::ident("Y"), b::call_fn("seven", vec![])),
            ),
            b::const_decl("Y", b::binary(BinaryOp::Add, b::ident("X"), b::int(1))),
            seven_fn(),
            main_fn(Some("int"), vec![b::ret(vec![b::ident("Y")])]),
        ],
    )];
    let out = build(files.clone());
    assert_eq!(out.diagnostics.len(), 1);
    assert!(out.diagnostics[0].message.contains("depends on itself"));
    assert!(out.module.find_function("_init_globals").is_some());

    let strict = BuildOptions {
        strict: true,
        ..BuildOptions::default()
    };
    assert!(Frontend::new(strict).build(&files, &MemoryEnv::new()).is_err());
}

#[test]
fn test_enum_values() {
    let files = vec![b::file(
        "main",
        vec![
            b::enum_decl("Color", false, vec![("red", None), ("green", None), ("blue", None)]),
            b::enum_decl("Perm", true, vec![("read", None), ("write", None), ("exec", None)]),
            b::enum_decl("Level", false, vec![("low", Some(b::int(10))), ("high", None)]),
            main_fn(Some("int"), vec![b::ret(vec![b::enum_val(Some("Color"), "blue")])]),
            Item::Fn(b::function(
                "perms",
                vec![],
                Some(b::ty("u64")),
                vec![b::ret(vec![b::binary(
                    BinaryOp::BitOr,
                    b::enum_val(Some("Perm"), "write"),
                    b::enum_val(Some("Perm"), "exec"),
                )])],
            )),
            Item::Fn(b::function(
                "level",
                vec![],
                Some(b::ty("int")),
                vec![b::ret(vec![b::enum_val(Some("Level"), "high")])],
            )),
        ],
    )];
    let out = build(files);
    assert!(out.diagnostics.is_empty());
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(2));
    assert_eq!(run(&out.module, "main__perms", vec![]).unwrap(), Val::Int(6));
    assert_eq!(run(&out.module, "main__level", vec![]).unwrap(), Val::Int(11));
}

#[test]
fn test_embedded_struct_fields_come_first() {
    let files = vec![b::file(
        "main",
        vec![
            b::struct_decl("Base", vec![b::field("id", b::ty("int"))]),
            b::struct_with_embeds("Derived", vec![b::ty("Base")], vec![b::field("name", b::ty("int"))]),
            main_fn(
                Some("int"),
                vec![
                    b::decl("d", b::struct_lit("Derived", vec![("id", b::int(5)), ("name", b::int(1))])),
                    b::ret(vec![b::selector(b::ident("d"), "id")]),
                ],
            ),
        ],
    )];
    let out = build(files);
    let derived = out
        .module
        .types
        .iter()
        .find_map(|(_, ty)| match ty {
            Type::Struct(st) if st.name == "main__Derived" => Some(st.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(derived.field_names, vec!["id".to_string(), "name".to_string()]);
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(5));
}

#[test]
fn test_name_mangling() {
    let mut env = MemoryEnv::new();
    env.add_module("main", None);
    env.add_module("util", None);
    let files = vec![
        b::file(
            "util",
            vec![Item::Fn(b::function("helper", vec![], Some(b::ty("int")), vec![b::ret(vec![b::int(5)])]))],
        ),
        b::file(
            "main",
            vec![
                Item::Fn(b::extern_fn("puts", vec![b::param("s", b::ty("string"))], None, false)),
                b::struct_decl("Point", vec![b::field("x", b::ty("int"))]),
                Item::Fn(b::method(
                    b::param("p", b::ty("Point")),
                    "norm",
                    vec![],
                    Some(b::ty("int")),
                    vec![b::ret(vec![b::selector(b::ident("p"), "x")])],
                )),
                main_fn(Some("int"), vec![b::ret(vec![b::method_call(b::ident("util"), "helper", vec![])])]),
            ],
        ),
    ];
    let out = build_with(files, &env, BuildOptions::default());
    let module = &out.module;
    for name in ["util__helper", "puts", "main__Point__norm", "main"] {
        assert!(module.find_function(name).is_some(), "missing {name}");
    }
    assert!(module.function(module.find_function("puts").unwrap()).unwrap().is_extern);
    assert_eq!(run(module, "main", vec![]).unwrap(), Val::Int(5));
}

#[test]
fn test_method_receivers() {
    let n = |recv: &str| b::selector(b::ident(recv), "n");
    let files = vec![b::file(
        "main",
        vec![
            b::struct_decl("Counter", vec![b::field("n", b::ty("int"))]),
            Item::Fn(b::method(
                b::param("c", b::ty_ptr(b::ty("Counter"))),
                "inc",
                vec![],
                None,
                vec![b::assign(n("c"), b::binary(BinaryOp::Add, n("c"), b::int(1)))],
            )),
            Item::Fn(b::method(
                b::param("c", b::ty("Counter")),
                "get",
                vec![],
                Some(b::ty("int")),
                vec![b::ret(vec![n("c")])],
            )),
            main_fn(
                Some("int"),
                vec![
                    b::decl("c", b::struct_lit("Counter", vec![("n", b::int(1))])),
                    b::expr_stmt(b::method_call(b::ident("c"), "inc", vec![])),
                    b::expr_stmt(b::method_call(b::ident("c"), "inc", vec![])),
                    b::ret(vec![b::method_call(b::ident("c"), "get", vec![])]),
                ],
            ),
        ],
    )];
    let out = build(files);
    assert!(out.diagnostics.is_empty());
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(3));
}

#[test]
fn test_loops() {
    let add_to_s = |e| b::assign_op(AssignOp::Add, b::ident("s"), e);
    let files = vec![b::file(
        "main",
        vec![
            Item::Fn(b::function(
                "c_style",
                vec![],
                Some(b::ty("int")),
                vec![
                    b::decl("s", b::int(0)),
                    b::for_c(
                        Some(b::decl("i", b::int(0))),
                        Some(b::binary(BinaryOp::Lt, b::ident("i"), b::int(5))),
                        Some(b::assign_op(AssignOp::Add, b::ident("i"), b::int(1))),
                        vec![add_to_s(b::ident("i"))],
                    ),
                    b::ret(vec![b::ident("s")]),
                ],
            )),
            Item::Fn(b::function(
                "forever",
                vec![],
                Some(b::ty("int")),
                vec![
                    b::decl("s", b::int(0)),
                    b::for_c(
                        None,
                        None,
                        None,
                        vec![
                            add_to_s(b::int(2)),
                            b::if_else(
                                b::binary(BinaryOp::Gt, b::ident("s"), b::int(7)),
                                vec![b::break_(None)],
                                None,
                            ),
                        ],
                    ),
                    b::ret(vec![b::ident("s")]),
                ],
            )),
            Item::Fn(b::function(
                "labelled",
                vec![],
                Some(b::ty("int")),
                vec![
                    b::decl("s", b::int(0)),
                    b::labelled(
                        "outer",
                        b::for_range(
                            "i",
                            b::int(0),
                            b::int(3),
                            vec![b::for_range(
                                "j",
                                b::int(0),
                                b::int(3),
                                vec![
                                    b::if_else(
                                        b::binary(BinaryOp::Eq, b::ident("j"), b::int(1)),
                                        vec![b::continue_(Some("outer"))],
                                        None,
                                    ),
                                    add_to_s(b::int(1)),
                                ],
                            )],
                        ),
                    ),
                    b::ret(vec![b::ident("s")]),
                ],
            )),
            Item::Fn(b::function(
                "over_array",
                vec![],
                Some(b::ty("int")),
                vec![
                    b::decl("s", b::int(0)),
                    b::decl("arr", b::array(vec![b::int(1), b::int(2), b::int(3), b::int(4)], true)),
                    b::for_in(
                        Some("i"),
                        Some("v"),
                        b::ident("arr"),
                        vec![add_to_s(b::binary(BinaryOp::Mul, b::ident("i"), b::ident("v")))],
                    ),
                    b::ret(vec![b::ident("s")]),
                ],
            )),
        ],
    )];
    let out = build(files);
    assert!(out.diagnostics.is_empty());
    let module = &out.module;
    assert_eq!(run(module, "main__c_style", vec![]).unwrap(), Val::Int(10));
    assert_eq!(run(module, "main__forever", vec![]).unwrap(), Val::Int(8));
    assert_eq!(run(module, "main__labelled", vec![]).unwrap(), Val::Int(3));
    assert_eq!(run(module, "main__over_array", vec![]).unwrap(), Val::Int(20));
}

#[test]
fn test_match_with_constant_labels_is_a_switch() {
    let classify = b::function(
        "classify",
        vec![b::param("x", b::ty("int"))],
        Some(b::ty("int")),
        vec![b::match_(
            b::ident("x"),
            vec![
                (vec![b::int(1), b::int(2)], vec![b::ret(vec![b::int(10)])]),
                (vec![b::int(3), b::int(2)], vec![b::ret(vec![b::int(20)])]),
            ],
            Some(vec![b::ret(vec![b::int(30)])]),
        )],
    );
    let files = vec![b::file("main", vec![Item::Fn(classify)])];
    let out = build(files);
    let module = &out.module;
    assert_eq!(count_ops(module, "main__classify", Opcode::Switch), 1);

    let f = module.function(module.find_function("main__classify").unwrap()).unwrap();
    let switch = f
        .blocks
        .iter()
        .flat_map(|blk| module.block(*blk).unwrap().instrs.iter())
        .filter_map(|v| module.instr_of(*v))
        .find(|i| i.op == Opcode::Switch)
        .unwrap();
    // value, default, then three distinct cases
    assert_eq!(switch.operands.len(), 8);

    for (arg, expected) in [(1, 10), (2, 10), (3, 20), (9, 30)] {
        assert_eq!(run(module, "main__classify", vec![Val::Int(arg)]).unwrap(), Val::Int(expected));
    }
}

#[test]
fn test_match_with_runtime_labels_compares() {
    let pick = b::function(
        "pick",
        vec![b::param("x", b::ty("int")), b::param("y", b::ty("int"))],
        Some(b::ty("int")),
        vec![b::match_(
            b::ident("x"),
            vec![(vec![b::ident("y")], vec![b::ret(vec![b::int(1)])])],
            Some(vec![b::ret(vec![b::int(2)])]),
        )],
    );
    let out = build(vec![b::file("main", vec![Item::Fn(pick)])]);
    let module = &out.module;
    assert_eq!(count_ops(module, "main__pick", Opcode::Switch), 0);
    assert_eq!(run(module, "main__pick", vec![Val::Int(3), Val::Int(3)]).unwrap(), Val::Int(1));
    assert_eq!(run(module, "main__pick", vec![Val::Int(3), Val::Int(4)]).unwrap(), Val::Int(2));
}

#[test]
fn test_goto_loop() {
    let files = vec![b::file(
        "main",
        vec![main_fn(
            Some("int"),
            vec![
                b::decl("i", b::int(0)),
                b::label("top"),
                b::assign_op(AssignOp::Add, b::ident("i"), b::int(1)),
                b::if_else(
                    b::binary(BinaryOp::Lt, b::ident("i"), b::int(5)),
                    vec![b::goto("top")],
                    None,
                ),
                b::ret(vec![b::ident("i")]),
            ],
        )],
    )];
    let out = build(files);
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(5));
}

#[test]
fn test_goto_undefined_label_is_reported() {
    let files = vec![b::file(
        "main",
        vec![main_fn(Some("int"), vec![b::goto("nowhere"), b::goto("nowhere")])],
    )];
    let out = build(files.clone());
    assert_eq!(out.diagnostics.len(), 1);
    assert!(out.diagnostics[0].message.contains("`nowhere` is never defined"));
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(0));

    let strict = BuildOptions {
        strict: true,
        ..BuildOptions::default()
    };
    assert!(Frontend::new(strict).build(&files, &MemoryEnv::new()).is_err());
}

#[test]
fn test_duplicate_label_is_reported() {
    let files = vec![b::file(
        "main",
        vec![main_fn(
            Some("int"),
            vec![
                b::decl("i", b::int(0)),
                b::label("top"),
                b::assign_op(AssignOp::Add, b::ident("i"), b::int(1)),
                b::label("top"),
                b::assign_op(AssignOp::Add, b::ident("i"), b::int(10)),
                b::if_else(
                    b::binary(BinaryOp::Lt, b::ident("i"), b::int(5)),
                    vec![b::goto("top")],
                    None,
                ),
                b::ret(vec![b::ident("i")]),
            ],
        )],
    )];
    let out = build(files.clone());
    assert_eq!(out.diagnostics.len(), 1);
    assert!(out.diagnostics[0].message.contains("defined more than once"));
    assert_eq!(run(&out.module, "main", vec![]).unwrap(), Val::Int(11));

    let strict = BuildOptions {
        strict: true,
        ..BuildOptions::default()
    };
    assert!(Frontend::new(strict).build(&files, &MemoryEnv::new()).is_err());
}

#[test]
fn test_assert_calls_panic() {
    let files = vec![b::file(
        "main",
        vec![main_fn(None, vec![b::assert_(b::binary(BinaryOp::Eq, b::int(1), b::int(2)))])],
    )];
    let out = build(files);
    assert_eq!(count_ops(&out.module, "main", Opcode::Unreachable), 1);
    assert_eq!(callees(&out.module, "main"), vec!["panic".to_string()]);
    assert_eq!(run(&out.module, "main", vec![]), Err("panic".to_string()));
}

#[test]
fn test_anonymous_function_has_its_own_cursor() {
    let anon = b::function(
        "",
        vec![b::param("a", b::ty("int"))],
        Some(b::ty("int")),
        vec![
            b::decl("y", b::binary(BinaryOp::Add, b::ident("a"), b::int(2))),
            b::ret(vec![b::ident("y")]),
        ],
    );
    let files = vec![b::file(
        "main",
        vec![main_fn(
            Some("int"),
            vec![
                b::decl("x", b::int(40)),
                b::decl("f", b::anon_fn(anon)),
                b::ret(vec![b::call(b::ident("f"), vec![b::ident("x")])]),
            ],
        )],
    )];
    let out = build(files);
    let module = &out.module;
    assert_eq!(count_ops(module, "main", Opcode::Alloca), 2);
    assert_eq!(count_ops(module, "main__anon_fn_1", Opcode::Alloca), 2);
    assert_eq!(run(module, "main", vec![]).unwrap(), Val::Int(42));
}

#[test]
fn test_string_operators_use_runtime() {
    let files = vec![b::file(
        "main",
        vec![main_fn(
            Some("bool"),
            vec![
                b::decl("s", b::binary(BinaryOp::Add, b::string("a"), b::string("b"))),
                b::ret(vec![b::binary(BinaryOp::Eq, b::ident("s"), b::string("ab"))]),
            ],
        )],
    )];
    let out = build(files);
    assert_eq!(
        callees(&out.module, "main"),
        vec!["string__plus".to_string(), "string__eq".to_string()]
    );
}

#[test]
fn test_sum_type_boxing() {
    let files = vec![b::file(
        "main",
        vec![
            b::struct_decl("Circle", vec![b::field("r", b::ty("int"))]),
            b::struct_decl("Square", vec![b::field("s", b::ty("int"))]),
            b::sum_type("Shape", vec![b::ty("Circle"), b::ty("Square")]),
            Item::Fn(b::function(
                "wrap",
                vec![],
                Some(b::ty("Shape")),
                vec![b::ret(vec![b::struct_lit("Square", vec![("s", b::int(2))])])],
            )),
        ],
    )];
    let out = build(files);
    assert_eq!(callees(&out.module, "main__wrap"), vec!["memdup".to_string()]);
    assert_eq!(
        run(&out.module, "main__wrap", vec![]).unwrap(),
        Val::Agg(vec![Val::Int(2), Val::Null])
    );
}

#[test]
fn test_oracle_types_literals() {
    let literal = b::int(7);
    let mut env = MemoryEnv::new();
    env.set_type(literal.pos, CheckedType::Int { width: 8, signed: false });
    let files = vec![b::file(
        "main",
        vec![main_fn(None, vec![b::decl("x", literal)])],
    )];
    let out = build_with(files, &env, BuildOptions::default());
    let module = &out.module;
    let main = module.function(module.find_function("main").unwrap()).unwrap();
    let slot = module.block(main.entry().unwrap()).unwrap().instrs[0];
    assert_eq!(module.types.display(module.value_type(slot)), "*u8");
}
