//! N-best derivation extraction.
//!
//! After search finishes, the terminal stack holds one representative per
//! equivalence class, and, when arcs were kept, each representative carries
//! the recombined-away alternatives that would otherwise be lost. Because an
//! arc shares its representative's key, it also shares every continuation:
//! substituting an arc for its representative anywhere along a backtrace
//! yields another complete derivation whose score differs by exactly the
//! score gap at the substitution point.
//!
//! Extraction is best-first: a max-heap of candidate paths, each popped path
//! emitted and expanded into single-substitution children. Children may only
//! deviate strictly before their parent's deviation point, so every
//! combination of substitutions is generated exactly once.

use super::arena::{HypothesisArena, HypothesisHandle};
use super::stack::HypothesisStack;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// One complete derivation: the hypothesis chain from root to leaf and its
/// total score.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    /// Total log-domain score of this derivation.
    pub score: f32,
    /// Hypothesis chain, root first.
    pub nodes: Vec<HypothesisHandle>,
}

/// Candidate path in the best-first frontier.
#[derive(Debug, Clone)]
struct PendingPath {
    score: f32,
    /// Chosen hypothesis chain, root first.
    nodes: Vec<HypothesisHandle>,
    /// Children may substitute arcs only at indices strictly below this.
    deviation_limit: usize,
}

impl PartialEq for PendingPath {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingPath {}

impl PartialOrd for PendingPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingPath {
    fn cmp(&self, other: &Self) -> Ordering {
        // Score first; the node chain keeps equal-scored paths in a
        // reproducible pop order.
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.nodes.cmp(&other.nodes))
    }
}

/// Follow predecessor handles from `leaf` back to the root.
fn backtrace(arena: &HypothesisArena, leaf: HypothesisHandle) -> Vec<HypothesisHandle> {
    let mut chain = vec![leaf];
    let mut current = leaf;
    while let Some(hypothesis) = arena.get(current) {
        match hypothesis.predecessor {
            Some(predecessor) => {
                debug_assert!(
                    arena.is_live(predecessor),
                    "predecessor freed while still reachable"
                );
                chain.push(predecessor);
                current = predecessor;
            }
            None => break,
        }
    }
    chain.reverse();
    chain
}

/// Extract up to `k` distinct derivations from a finished stack, best first.
///
/// With arcs kept (and seeded via
/// [`initialize_arcs`](HypothesisStack::initialize_arcs)), alternatives
/// branch through every recombination recorded along every backtrace. With
/// arcs off this degenerates to the plain backtraces of the stack's
/// representatives, best first.
///
/// The stack and all reachable predecessors must still be live in `arena`;
/// drivers wanting n-best output keep earlier layers allocated until
/// extraction is done.
pub fn extract_nbest(
    stack: &HypothesisStack,
    arena: &HypothesisArena,
    k: usize,
) -> Vec<Derivation> {
    let mut results = Vec::with_capacity(k.min(stack.len()));
    if k == 0 {
        return results;
    }

    let mut frontier: BinaryHeap<PendingPath> = BinaryHeap::new();
    for leaf in stack.sorted_list() {
        let Some(hypothesis) = arena.get(leaf) else {
            continue;
        };
        let nodes = backtrace(arena, leaf);
        let deviation_limit = nodes.len();
        frontier.push(PendingPath {
            score: hypothesis.score,
            nodes,
            deviation_limit,
        });
    }

    while let Some(path) = frontier.pop() {
        // Expand before emitting so the popped path's children compete with
        // the remaining frontier.
        for i in 0..path.deviation_limit {
            let node = path.nodes[i];
            let Some(hypothesis) = arena.get(node) else {
                continue;
            };
            let node_score = hypothesis.score;
            for &arc in hypothesis.arcs.iter().filter(|&&arc| arc != node) {
                let Some(alternative) = arena.get(arc) else {
                    continue;
                };
                let mut nodes = backtrace(arena, arc);
                let deviation_limit = nodes.len().saturating_sub(1);
                nodes.extend_from_slice(&path.nodes[i + 1..]);
                frontier.push(PendingPath {
                    score: path.score + (alternative.score - node_score),
                    nodes,
                    deviation_limit,
                });
            }
        }

        results.push(Derivation {
            score: path.score,
            nodes: path.nodes,
        });
        if results.len() == k {
            break;
        }
    }

    results
}
