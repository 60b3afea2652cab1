//! Lengauer–Tarjan over hand-built and generated CFGs

mod common;

use common::{brute_dominates, graph, Lcg};
use pretty_assertions::assert_eq;
use strata_ir::{build_cfg, compute_dominators, dominates, Block, BlockId, DominatorStats, Module};

fn idoms(module: &Module, blocks: &[BlockId]) -> Vec<Option<BlockId>> {
    blocks.iter().map(|b| module.block(*b).unwrap().idom).collect()
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_diamond() {
    let mut module = Module::new("dom".to_string(), 8);
    let (_, b) = graph(&mut module, "diamond", 4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
    compute_dominators(&mut module);

    assert_eq!(idoms(&module, &b), vec![Some(b[0]); 4]);
    assert_eq!(module.block(b[0]).unwrap().dom_children, vec![b[1], b[3], b[2]]);
}

#[test]
fn test_loop() {
    let mut module = Module::new("dom".to_string(), 8);
    // entry -> cond, cond -> body, body -> cond, cond -> exit
    let (_, b) = graph(&mut module, "loop", 4, &[(0, 1), (1, 2), (2, 1), (1, 3)]);
    compute_dominators(&mut module);

    assert_eq!(module.block(b[1]).unwrap().idom, Some(b[0]));
    assert_eq!(module.block(b[2]).unwrap().idom, Some(b[1]));
    assert_eq!(module.block(b[3]).unwrap().idom, Some(b[1]));
}

#[test]
fn test_entry_dominates_itself() {
    let mut module = Module::new("dom".to_string(), 8);
    let (_, b) = graph(&mut module, "single", 1, &[]);
    let stats = compute_dominators(&mut module);

    assert_eq!(module.block(b[0]).unwrap().idom, Some(b[0]));
    assert!(module.block(b[0]).unwrap().dom_children.is_empty());
    assert!(dominates(&module, b[0], b[0]));
    assert_eq!(stats.functions_analyzed, 1);
}

#[test]
fn test_unreachable_blocks() {
    let mut module = Module::new("dom".to_string(), 8);
    // 2 and 3 are only reachable from each other
    let (_, b) = graph(&mut module, "dead", 4, &[(0, 1), (2, 3), (3, 2), (3, 1)]);
    let stats = compute_dominators(&mut module);

    assert_eq!(idoms(&module, &b), vec![Some(b[0]), Some(b[0]), None, None]);
    assert_eq!(module.block(b[0]).unwrap().dom_children, vec![b[1]]);
    assert!(!dominates(&module, b[2], b[3]));
    assert!(!dominates(&module, b[0], b[2]));
    assert_eq!(stats.unreachable_blocks, 2);
}

#[test]
fn test_self_loop() {
    let mut module = Module::new("dom".to_string(), 8);
    let (_, b) = graph(&mut module, "spin", 3, &[(0, 1), (1, 1), (1, 2)]);
    compute_dominators(&mut module);

    assert_eq!(idoms(&module, &b), vec![Some(b[0]), Some(b[0]), Some(b[1])]);
}

#[test]
fn test_entry_with_back_edge() {
    let mut module = Module::new("dom".to_string(), 8);
    let (_, b) = graph(&mut module, "back", 3, &[(0, 1), (1, 0), (1, 2)]);
    compute_dominators(&mut module);

    assert_eq!(idoms(&module, &b), vec![Some(b[0]), Some(b[0]), Some(b[1])]);
}

#[test]
fn test_irreducible() {
    let mut module = Module::new("dom".to_string(), 8);
    // Two entries into the 1 <-> 2 cycle
    let (_, b) = graph(&mut module, "irreducible", 4, &[(0, 1), (0, 2), (1, 2), (2, 1), (2, 3)]);
    compute_dominators(&mut module);

    assert_eq!(idoms(&module, &b), vec![Some(b[0]), Some(b[0]), Some(b[0]), Some(b[2])]);
}

#[test]
fn test_classic_example() {
    let mut module = Module::new("dom".to_string(), 8);
    // R=0 A=1 B=2 C=3 D=4 E=5 F=6 G=7 H=8 I=9 J=10 K=11 L=12
    let edges = [
        (0, 1), (0, 2), (0, 3),
        (1, 4),
        (2, 1), (2, 4), (2, 5),
        (3, 6), (3, 7),
        (4, 12),
        (5, 8),
        (6, 9),
        (7, 9), (7, 10),
        (8, 5), (8, 11),
        (9, 11),
        (10, 9),
        (11, 9), (11, 0),
        (12, 8),
    ];
    let (_, b) = graph(&mut module, "classic", 13, &edges);
    compute_dominators(&mut module);

    let expected = [0, 0, 0, 0, 0, 0, 3, 3, 0, 0, 7, 0, 4];
    let expected: Vec<Option<BlockId>> = expected.iter().map(|i| Some(b[*i])).collect();
    assert_eq!(idoms(&module, &b), expected);
}

#[test]
fn test_malformed_function_is_skipped_alone() {
    init_logging();
    let mut module = Module::new("dom".to_string(), 8);
    let (_, f_blocks) = graph(&mut module, "f", 3, &[(0, 1), (1, 2)]);
    let (_, g_blocks) = graph(&mut module, "g", 4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);

    // Corrupt F after the CFG was built
    module.block_mut(f_blocks[1]).unwrap().succs.push(BlockId(999));
    let stats = compute_dominators(&mut module);

    assert_eq!(
        stats,
        DominatorStats {
            functions_analyzed: 1,
            functions_skipped: 1,
            unreachable_blocks: 0,
        }
    );
    assert_eq!(idoms(&module, &f_blocks), vec![None; 3]);
    assert_eq!(idoms(&module, &g_blocks), vec![Some(g_blocks[0]); 4]);
}

#[test]
fn test_cross_function_edge_is_rejected() {
    init_logging();
    let mut module = Module::new("dom".to_string(), 8);
    let (_, f_blocks) = graph(&mut module, "f", 2, &[(0, 1)]);
    let (_, g_blocks) = graph(&mut module, "g", 2, &[(0, 1)]);

    module.block_mut(g_blocks[1]).unwrap().succs.push(f_blocks[0]);
    let stats = compute_dominators(&mut module);

    assert_eq!(stats.functions_skipped, 1);
    assert_eq!(idoms(&module, &f_blocks), vec![Some(f_blocks[0]); 2]);
    assert_eq!(idoms(&module, &g_blocks), vec![None; 2]);
}

#[test]
fn test_edge_to_unlisted_block_is_rejected() {
    init_logging();
    let mut module = Module::new("dom".to_string(), 8);
    let (f, f_blocks) = graph(&mut module, "f", 2, &[(0, 1)]);
    let (_, g_blocks) = graph(&mut module, "g", 2, &[(0, 1)]);

    // Tagged with F but missing from F's block list
    let stray = BlockId::new(module.blocks.len());
    module.blocks.push(Block::new("stray".to_string(), f));
    module.block_mut(f_blocks[0]).unwrap().instrs.clear();
    let i1 = module.types.get_bool();
    let cond = module.const_int(i1, 1);
    module.build_br(f_blocks[0], cond, f_blocks[1], stray).unwrap();
    build_cfg(&mut module);
    let stats = compute_dominators(&mut module);

    assert_eq!(
        stats,
        DominatorStats {
            functions_analyzed: 1,
            functions_skipped: 1,
            unreachable_blocks: 0,
        }
    );
    assert_eq!(idoms(&module, &f_blocks), vec![None; 2]);
    assert_eq!(module.block(stray).unwrap().idom, None);
    assert_eq!(idoms(&module, &g_blocks), vec![Some(g_blocks[0]); 2]);
}

#[test]
fn test_rerun_after_edit() {
    let mut module = Module::new("dom".to_string(), 8);
    let (_, b) = graph(&mut module, "edit", 3, &[(0, 1), (1, 2)]);
    compute_dominators(&mut module);
    assert_eq!(module.block(b[2]).unwrap().idom, Some(b[1]));

    // Add a shortcut 0 -> 2
    module.block_mut(b[0]).unwrap().instrs.clear();
    let i1 = module.types.get_bool();
    let cond = module.const_int(i1, 1);
    module.build_br(b[0], cond, b[1], b[2]).unwrap();
    build_cfg(&mut module);
    compute_dominators(&mut module);

    assert_eq!(module.block(b[2]).unwrap().idom, Some(b[0]));
    assert_eq!(module.block(b[1]).unwrap().dom_children, Vec::<BlockId>::new());
}

#[test]
fn test_declarations_are_ignored() {
    let mut module = Module::new("dom".to_string(), 8);
    let void = module.types.get_void();
    module.add_function("puts", &[], void, false);
    let stats = compute_dominators(&mut module);
    assert_eq!(stats, DominatorStats::default());
}

#[test]
fn test_matches_definition_on_random_graphs() {
    let mut rng = Lcg(0x5eed);
    for round in 0..40 {
        let n = 2 + rng.next(12);
        let edge_count = rng.next(n * 2) + 1;
        let edges: Vec<(usize, usize)> = (0..edge_count).map(|_| (rng.next(n), rng.next(n))).collect();

        let mut module = Module::new("random".to_string(), 8);
        let (_, b) = graph(&mut module, &format!("r{round}"), n, &edges);
        compute_dominators(&mut module);

        for x in &b {
            for y in &b {
                assert_eq!(
                    dominates(&module, *x, *y),
                    brute_dominates(&module, b[0], *x, *y),
                    "round {round}: {x} dom {y} with edges {edges:?}"
                );
            }
            // idom is the closest strict dominator
            if let Some(idom) = module.block(*x).unwrap().idom {
                if *x != b[0] {
                    assert!(brute_dominates(&module, b[0], idom, *x));
                    assert_ne!(idom, *x);
                    for d in &b {
                        if *d != *x && brute_dominates(&module, b[0], *d, *x) {
                            assert!(brute_dominates(&module, b[0], *d, idom));
                        }
                    }
                }
            }
        }
    }
}
