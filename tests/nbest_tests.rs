//! Arc bookkeeping and n-best extraction across a multi-layer decode.

use beamstack::prelude::*;

const SENTENCE_LEN: usize = 3;

fn arc_stack() -> HypothesisStack {
    StackBuilder::new()
        .max_stack_size(20)
        .beam_threshold(0.0)
        .keep_arcs(true)
        .build()
        .unwrap()
}

fn extend(
    arena: &mut HypothesisArena,
    predecessor: HypothesisHandle,
    word: WordId,
    position: usize,
    score_delta: f32,
) -> HypothesisHandle {
    let (score, context, mut coverage) = {
        let hypothesis = arena.get(predecessor).unwrap();
        (
            hypothesis.score,
            hypothesis.lm_context.clone(),
            hypothesis.coverage.clone(),
        )
    };
    coverage.set(position);
    arena.alloc(Hypothesis::extend(
        predecessor,
        score + score_delta,
        context.extend(&[word], 2),
        coverage,
    ))
}

#[test]
fn test_losers_reachable_through_winner_arcs() {
    let mut arena = HypothesisArena::new();
    let mut stack = arc_stack();
    stack.initialize_arcs(&mut arena);

    let root = arena.alloc(Hypothesis::root(SENTENCE_LEN));
    // Three ways to translate word 0 into the same target word: same key,
    // three different scores
    let a = extend(&mut arena, root, 7, 0, -1.0);
    let b = extend(&mut arena, root, 7, 0, -2.0);
    let c = extend(&mut arena, root, 7, 0, -0.5);
    stack.add_prune(&mut arena, a);
    stack.add_prune(&mut arena, b);
    stack.add_prune(&mut arena, c);

    assert_eq!(stack.len(), 1);
    assert_eq!(stack.recombinations(), 2);

    let winner = stack.best_hypothesis().unwrap();
    assert_eq!(winner, c);
    let arcs = &arena.get(winner).unwrap().arcs;
    assert!(arcs.contains(&a));
    assert!(arcs.contains(&b));
    assert!(arcs.contains(&c), "self-entry kept");
    assert_eq!(arcs.len(), 3);

    // Losers stay allocated as arcs
    assert!(arena.is_live(a));
    assert!(arena.is_live(b));
}

#[test]
fn test_sorted_list_returns_representatives_only() {
    let mut arena = HypothesisArena::new();
    let mut stack = arc_stack();
    stack.initialize_arcs(&mut arena);

    let root = arena.alloc(Hypothesis::root(SENTENCE_LEN));
    let a = extend(&mut arena, root, 7, 0, -1.0);
    let b = extend(&mut arena, root, 7, 0, -2.0);
    let other = extend(&mut arena, root, 8, 0, -1.5);
    stack.add_prune(&mut arena, a);
    stack.add_prune(&mut arena, b);
    stack.add_prune(&mut arena, other);

    let listed = stack.sorted_list();
    assert_eq!(listed, vec![a, other]);
    assert!(!listed.contains(&b), "arcs never appear in the sorted list");
}

#[test]
fn test_nbest_enumerates_arc_combinations() {
    let mut arena = HypothesisArena::new();

    let root = arena.alloc(Hypothesis::root(SENTENCE_LEN));

    // Layer 1: two alternatives for word 0, recombining into one class
    let mut layer1 = arc_stack();
    layer1.initialize_arcs(&mut arena);
    let l1_best = extend(&mut arena, root, 7, 0, -1.0);
    let l1_alt = extend(&mut arena, root, 7, 0, -1.8);
    layer1.add_prune(&mut arena, l1_best);
    layer1.add_prune(&mut arena, l1_alt);
    let survivor1 = layer1.best_hypothesis().unwrap();

    // Layer 2: two alternatives for word 1 on top of the survivor
    let mut layer2 = arc_stack();
    layer2.initialize_arcs(&mut arena);
    let l2_best = extend(&mut arena, survivor1, 9, 1, -0.5);
    let l2_alt = extend(&mut arena, survivor1, 9, 1, -0.9);
    layer2.add_prune(&mut arena, l2_best);
    layer2.add_prune(&mut arena, l2_alt);
    let survivor2 = layer2.best_hypothesis().unwrap();

    // Final layer: single completion
    let mut last = arc_stack();
    last.initialize_arcs(&mut arena);
    let finished = extend(&mut arena, survivor2, 4, 2, -0.3);
    last.add_prune(&mut arena, finished);

    let derivations = extract_nbest(&last, &arena, 10);

    // 2 × 2 arc choices along the path, one completion: 4 derivations
    assert_eq!(derivations.len(), 4);
    let scores: Vec<f32> = derivations.iter().map(|d| d.score).collect();
    let expected = [
        -1.0 - 0.5 - 0.3,
        -1.0 - 0.9 - 0.3,
        -1.8 - 0.5 - 0.3,
        -1.8 - 0.9 - 0.3,
    ];
    for (score, want) in scores.iter().zip(expected.iter()) {
        assert!((score - want).abs() < 1e-6, "got {score}, want {want}");
    }

    // Each derivation runs root to leaf
    for derivation in &derivations {
        assert_eq!(derivation.nodes.len(), 4);
        assert_eq!(derivation.nodes[0], root);
        assert_eq!(derivation.nodes[3], finished);
    }
}

#[test]
fn test_teardown_with_arcs_balances_allocator() {
    let mut arena = HypothesisArena::new();
    let mut stack = arc_stack();
    stack.initialize_arcs(&mut arena);

    let root = arena.alloc(Hypothesis::root(SENTENCE_LEN));
    let mut handles = vec![root];
    for i in 0..12u32 {
        // Cycle over three keys so recombination happens repeatedly
        let word = 7 + (i % 3);
        let h = extend(&mut arena, root, word, 0, -(i as f32) * 0.25 - 0.1);
        handles.push(h);
    }
    let root_handle = handles[0];
    for &handle in &handles[1..] {
        stack.add_prune(&mut arena, handle);
    }
    assert_eq!(stack.len(), 3);
    assert_eq!(stack.recombinations(), 9);

    stack.remove_all(&mut arena);
    arena.free(root_handle);

    assert_eq!(arena.live_count(), 0);
    assert_eq!(arena.total_allocations(), arena.total_frees());
}

#[test]
fn test_capacity_eviction_frees_attached_arcs() {
    let mut arena = HypothesisArena::new();
    let mut stack = StackBuilder::new()
        .max_stack_size(1)
        .beam_threshold(0.0)
        .keep_arcs(true)
        .build()
        .unwrap();
    stack.initialize_arcs(&mut arena);

    let root = arena.alloc(Hypothesis::root(SENTENCE_LEN));
    // Class one recombines, then a better class evicts it entirely
    let a = extend(&mut arena, root, 7, 0, -2.0);
    let b = extend(&mut arena, root, 7, 0, -3.0);
    stack.add_prune(&mut arena, a);
    stack.add_prune(&mut arena, b);
    assert!(arena.is_live(b), "loser held as arc");

    let better = extend(&mut arena, root, 8, 0, -1.0);
    stack.add_prune(&mut arena, better);

    assert_eq!(stack.len(), 1);
    assert_eq!(stack.best_hypothesis(), Some(better));
    // The evicted representative and its arc were both released
    assert!(!arena.is_live(a));
    assert!(!arena.is_live(b));
}
