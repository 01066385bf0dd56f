//! The hypothesis stack: equivalence-indexed admission, score-bound
//! maintenance, and pruning.
//!
//! One stack holds the live partial translations of one search layer. The
//! search driver offers every candidate it constructs to [`add_prune`]; the
//! stack decides admit, recombine, or reject, and keeps itself within the
//! configured beam and capacity at every return.
//!
//! # Structure
//!
//! Equivalence detection and worst-member selection are separate concerns
//! backed by separate structures:
//!
//! - `index`: recombination key → live representative handle, one entry per
//!   equivalence class;
//! - `by_score`: all live members ordered by (score, key), so the worst and
//!   best members (and the exact score bounds) fall out of the ends of the
//!   set.
//!
//! Both structures hold one entry per live member at all times.
//!
//! # Determinism
//!
//! Wherever equal scores must be split (capacity eviction, `prune_to_size`,
//! `best_hypothesis`), ties resolve by recombination-key order, never by
//! admission order. The final live set is a function of the set of offered
//! candidates, not of the order they were offered in.
//!
//! # Ownership
//!
//! Admitted hypotheses are owned by the stack until demoted, pruned, or
//! removed; on every such path the hypothesis is released to the arena
//! exactly once. The stack cannot free on `Drop` (it does not hold the
//! arena), so a decode ends with an explicit [`remove_all`]; slots of a
//! stack dropped without it are reclaimed when the arena itself drops.
//!
//! [`add_prune`]: HypothesisStack::add_prune
//! [`remove_all`]: HypothesisStack::remove_all
//!
//! # Thread Safety
//!
//! Not thread-safe: one stack (and its arena) per decoding thread, or an
//! external lock around every call.

use super::arena::{HypothesisArena, HypothesisHandle};
use super::recombination::{RecombinationKey, ScoreKey};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Beam-search hypothesis stack with recombination and pruning.
///
/// Construct through [`StackBuilder`](super::builder::StackBuilder), which
/// validates the configuration.
///
/// # Example
///
/// ```
/// use beamstack::prelude::*;
///
/// let mut arena = HypothesisArena::new();
/// let mut stack = StackBuilder::new().max_stack_size(10).build().unwrap();
///
/// let root = arena.alloc(Hypothesis::root(4));
/// stack.add_prune(&mut arena, root);
///
/// assert_eq!(stack.len(), 1);
/// assert_eq!(stack.best_score(), Some(0.0));
/// stack.remove_all(&mut arena);
/// ```
#[derive(Debug)]
pub struct HypothesisStack {
    max_stack_size: usize,
    beam_threshold: f32,
    keep_arcs: bool,
    /// One live representative per equivalence class.
    index: FxHashMap<RecombinationKey, HypothesisHandle>,
    /// All live members, ascending (score, key).
    by_score: BTreeSet<ScoreKey>,
    /// Whether arc lists have been seeded with self-entries.
    arcs_initialized: bool,
    recombinations: usize,
    beam_rejections: usize,
    evictions: usize,
}

impl HypothesisStack {
    /// Internal constructor; validation happens in the builder.
    pub(crate) fn with_config(max_stack_size: usize, beam_threshold: f32, keep_arcs: bool) -> Self {
        debug_assert!(max_stack_size > 0);
        Self {
            max_stack_size,
            beam_threshold,
            keep_arcs,
            index: FxHashMap::default(),
            by_score: BTreeSet::new(),
            arcs_initialized: false,
            recombinations: 0,
            beam_rejections: 0,
            evictions: 0,
        }
    }

    /// Number of live members.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no member is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The configured capacity cap.
    #[inline]
    pub fn max_stack_size(&self) -> usize {
        self.max_stack_size
    }

    /// The configured beam factor (0 disables the beam).
    #[inline]
    pub fn beam_threshold(&self) -> f32 {
        self.beam_threshold
    }

    /// Whether recombined-away hypotheses are retained as arcs.
    #[inline]
    pub fn keeps_arcs(&self) -> bool {
        self.keep_arcs
    }

    /// Score of the best live member, `None` on an empty stack.
    #[inline]
    pub fn best_score(&self) -> Option<f32> {
        self.by_score.last().map(|entry| entry.score)
    }

    /// Score of the worst live member, `None` on an empty stack.
    #[inline]
    pub fn worst_score(&self) -> Option<f32> {
        self.by_score.first().map(|entry| entry.score)
    }

    /// The best live member; equal scores resolve by key order.
    pub fn best_hypothesis(&self) -> Option<HypothesisHandle> {
        self.by_score
            .last()
            .and_then(|entry| self.index.get(&entry.key))
            .copied()
    }

    /// Live members in descending score order (ties by key order).
    pub fn iter(&self) -> impl Iterator<Item = HypothesisHandle> + '_ {
        self.by_score
            .iter()
            .rev()
            .filter_map(|entry| self.index.get(&entry.key))
            .copied()
    }

    /// Materialized list of all live members, best first.
    ///
    /// Arcs are not listed; only representatives appear. Used for final
    /// output at the terminal search layer.
    pub fn sorted_list(&self) -> Vec<HypothesisHandle> {
        self.iter().collect()
    }

    /// Times a candidate merged into an existing equivalence class.
    pub fn recombinations(&self) -> usize {
        self.recombinations
    }

    /// Candidates rejected at the beam gate.
    pub fn beam_rejections(&self) -> usize {
        self.beam_rejections
    }

    /// Members removed by capacity or threshold enforcement.
    pub fn evictions(&self) -> usize {
        self.evictions
    }

    /// The score below which a new equivalence class is rejected.
    ///
    /// Scores are log-domain and the threshold is a multiplicative factor on
    /// probability magnitude: a candidate survives when its score is within
    /// the factor of the best. For the usual negative log-probabilities the
    /// cutoff is `best / threshold`; for non-negative objectives it is
    /// `best * threshold`. Admission is `score >= cutoff`, inclusive at the
    /// boundary.
    fn beam_cutoff(&self, best: f32) -> f32 {
        if best < 0.0 {
            best / self.beam_threshold
        } else {
            best * self.beam_threshold
        }
    }

    /// Offer a candidate to the stack.
    ///
    /// The candidate must be a live arena allocation not owned by any stack.
    /// After the call it is either owned by this stack or released back to
    /// the arena (or attached as an arc when arcs are kept); the caller must
    /// not touch the handle again except through the stack's queries.
    ///
    /// Admission follows four steps:
    ///
    /// 1. look the candidate's recombination key up in the index;
    /// 2. an equivalent representative exists: keep whichever scores
    ///    higher, silently demote the other (freed, or attached as an arc of
    ///    the survivor when arcs are kept);
    /// 3. new equivalence class: reject if the score fails the beam cutoff
    ///    against the current best, otherwise insert;
    /// 4. enforce the capacity cap by evicting the globally worst members,
    ///    and the beam bound on existing members when the best score rose.
    ///
    /// The very first insertion into an empty stack always succeeds.
    pub fn add_prune(&mut self, arena: &mut HypothesisArena, candidate: HypothesisHandle) {
        let Some(cand) = arena.get(candidate) else {
            debug_assert!(false, "add_prune offered a stale handle");
            return;
        };
        let cand_score = cand.score;
        let key = RecombinationKey::of(cand);

        if let Some(&representative) = self.index.get(&key) {
            self.recombine(arena, key, representative, candidate, cand_score);
            return;
        }

        // New equivalence class: beam gate against the current best. An
        // empty stack has no bound and accepts unconditionally.
        if let Some(best) = self.best_score() {
            if self.beam_threshold > 0.0 && cand_score < self.beam_cutoff(best) {
                self.beam_rejections += 1;
                arena.free(candidate);
                return;
            }
        }

        let raised_best = self
            .best_score()
            .map(|best| cand_score > best)
            .unwrap_or(true);

        if self.keep_arcs && self.arcs_initialized {
            if let Some(hypothesis) = arena.get_mut(candidate) {
                if hypothesis.arcs.is_empty() {
                    hypothesis.arcs.push(candidate);
                }
            }
        }
        self.by_score.insert(ScoreKey::new(cand_score, key.clone()));
        self.index.insert(key, candidate);

        if raised_best && self.beam_threshold > 0.0 {
            self.enforce_beam(arena, cand_score);
        }
        self.enforce_capacity(arena);
    }

    /// Resolve a recombination between `candidate` and the live
    /// `representative` of the same equivalence class.
    ///
    /// The merge is silent: no record is kept beyond the optional arc.
    fn recombine(
        &mut self,
        arena: &mut HypothesisArena,
        key: RecombinationKey,
        representative: HypothesisHandle,
        candidate: HypothesisHandle,
        cand_score: f32,
    ) {
        self.recombinations += 1;
        let Some(rep_score) = arena.get(representative).map(|h| h.score) else {
            debug_assert!(false, "index holds a stale representative");
            return;
        };

        if cand_score > rep_score {
            // Candidate takes over as the live representative.
            let raised_best = self
                .best_score()
                .map(|best| cand_score > best)
                .unwrap_or(true);
            self.by_score
                .remove(&ScoreKey::new(rep_score, key.clone()));
            self.by_score.insert(ScoreKey::new(cand_score, key.clone()));
            self.index.insert(key, candidate);
            self.demote(arena, candidate, representative);

            if raised_best && self.beam_threshold > 0.0 {
                // The winner moved the beam bound; re-check everyone else.
                self.enforce_beam(arena, cand_score);
            }
        } else {
            // Existing representative stays; the candidate is demoted.
            self.demote(arena, representative, candidate);
        }
    }

    /// Demote `loser` under `winner`: attach as an arc when arcs are kept,
    /// otherwise release it to the arena.
    fn demote(
        &mut self,
        arena: &mut HypothesisArena,
        winner: HypothesisHandle,
        loser: HypothesisHandle,
    ) {
        if !self.keep_arcs {
            arena.free(loser);
            return;
        }
        // The loser's accumulated alternatives transfer to the winner, then
        // the loser itself joins them. A loser whose arc list was never
        // seeded contributes just itself.
        let mut absorbed = arena
            .get_mut(loser)
            .map(|h| std::mem::take(&mut h.arcs))
            .unwrap_or_default();
        if absorbed.is_empty() {
            absorbed.push(loser);
        }
        if let Some(winner_hypothesis) = arena.get_mut(winner) {
            if self.arcs_initialized && winner_hypothesis.arcs.is_empty() {
                winner_hypothesis.arcs.push(winner);
            }
            winner_hypothesis.arcs.extend(absorbed);
        }
    }

    /// Remove live members whose score fell below the beam bound implied by
    /// `best`.
    fn enforce_beam(&mut self, arena: &mut HypothesisArena, best: f32) {
        let cutoff = self.beam_cutoff(best);
        loop {
            match self.by_score.first() {
                Some(worst) if worst.score < cutoff => {}
                _ => break,
            }
            if let Some(entry) = self.by_score.pop_first() {
                if let Some(handle) = self.index.remove(&entry.key) {
                    self.release_member(arena, handle);
                }
                self.evictions += 1;
            }
        }
    }

    /// Evict the globally worst members until the capacity cap holds.
    fn enforce_capacity(&mut self, arena: &mut HypothesisArena) {
        while self.index.len() > self.max_stack_size {
            let Some(entry) = self.by_score.pop_first() else {
                break;
            };
            if let Some(handle) = self.index.remove(&entry.key) {
                self.release_member(arena, handle);
            }
            self.evictions += 1;
        }
    }

    /// Retain only the `min(k, len())` best members.
    ///
    /// Ties at the boundary resolve by key order, the same rule capacity
    /// eviction uses. Idempotent: a second call with the same `k` removes
    /// nothing.
    pub fn prune_to_size(&mut self, arena: &mut HypothesisArena, k: usize) {
        while self.index.len() > k {
            let Some(entry) = self.by_score.pop_first() else {
                break;
            };
            if let Some(handle) = self.index.remove(&entry.key) {
                self.release_member(arena, handle);
            }
            self.evictions += 1;
        }
    }

    /// Seed every live member's arc list with its own handle.
    ///
    /// Establishes the base case for n-best extraction, so that "no
    /// recombination occurred" and "recombination occurred" read uniformly
    /// from the arc lists. Members admitted after this call are seeded on
    /// insertion. No-op unless arcs are kept.
    pub fn initialize_arcs(&mut self, arena: &mut HypothesisArena) {
        if !self.keep_arcs {
            return;
        }
        self.arcs_initialized = true;
        for &handle in self.index.values() {
            if let Some(hypothesis) = arena.get_mut(handle) {
                if hypothesis.arcs.is_empty() {
                    hypothesis.arcs.push(handle);
                }
            }
        }
    }

    /// Release every live member and every retained arc back to the arena.
    ///
    /// Each hypothesis is freed exactly once; a member's self-entry in its
    /// own arc list is skipped, and the generation check in the arena makes
    /// any further free attempts inert.
    pub fn remove_all(&mut self, arena: &mut HypothesisArena) {
        let members: Vec<HypothesisHandle> = self.index.values().copied().collect();
        for handle in members {
            self.release_member(arena, handle);
        }
        self.index.clear();
        self.by_score.clear();
    }

    /// Free `handle` and the arcs it owns.
    fn release_member(&mut self, arena: &mut HypothesisArena, handle: HypothesisHandle) {
        let arcs = arena
            .get_mut(handle)
            .map(|h| std::mem::take(&mut h.arcs))
            .unwrap_or_default();
        for arc in arcs {
            if arc != handle {
                arena.free(arc);
            }
        }
        arena.free(handle);
    }
}
