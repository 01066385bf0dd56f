//! Recombination keys and the deterministic orders built on them.
//!
//! Two hypotheses are interchangeable for all future search purposes when
//! they agree on the last *n−1* target words and on which source words are
//! covered: every continuation scores identically from that point on. The
//! [`RecombinationKey`] captures exactly that pair, and its total order makes
//! equivalence classes indexable.
//!
//! The language-model context is compared first because it is the dominant
//! discriminator (it governs future scoring); the coverage bitmap breaks
//! ties. The direction of either comparison is arbitrary and callers must
//! not rely on it, only on its determinism.

use super::hypothesis::{Hypothesis, LmContext};
use crate::coverage::CoverageBitmap;
use std::cmp::Ordering;

/// Equivalence-class key: (language-model context, source coverage).
///
/// Derived from a hypothesis on demand, never stored inside one. Keys order
/// equal if and only if the hypotheses are recombinable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecombinationKey {
    context: LmContext,
    coverage: CoverageBitmap,
}

impl RecombinationKey {
    /// Compute the key of `hypothesis`.
    pub fn of(hypothesis: &Hypothesis) -> Self {
        Self {
            context: hypothesis.lm_context.clone(),
            coverage: hypothesis.coverage.clone(),
        }
    }

    /// The context component.
    #[inline]
    pub fn context(&self) -> &LmContext {
        &self.context
    }

    /// The coverage component.
    #[inline]
    pub fn coverage(&self) -> &CoverageBitmap {
        &self.coverage
    }
}

impl PartialOrd for RecombinationKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecombinationKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Context word-by-word first, coverage pattern second.
        self.context
            .cmp(&other.context)
            .then_with(|| self.coverage.compare(&other.coverage))
    }
}

/// Score-major order used wherever the stack needs "the worst live member"
/// or "the best live member" deterministically.
///
/// Orders ascending by score, then by recombination key. Equal scores are
/// therefore resolved by key order, never by insertion order, which keeps
/// eviction and pruning reproducible across runs regardless of the order
/// candidates were offered in.
#[derive(Debug, Clone)]
pub struct ScoreKey {
    /// The member's cumulative score.
    pub score: f32,
    /// The member's recombination key, as tie-breaker.
    pub key: RecombinationKey,
}

impl ScoreKey {
    /// Build the ordering entry for a live member.
    pub fn new(score: f32, key: RecombinationKey) -> Self {
        Self { score, key }
    }
}

// Equality must agree with the total_cmp-based order, so it cannot be
// derived (bitwise f32 comparison, not the IEEE partial one).
impl PartialEq for ScoreKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoreKey {}

impl PartialOrd for ScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoreKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // total_cmp keeps the order total even for scores that should never
        // occur (NaN from a misbehaving scorer sorts consistently instead of
        // corrupting the set).
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.key.cmp(&other.key))
    }
}
