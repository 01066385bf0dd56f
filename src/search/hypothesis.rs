//! Partial-translation hypotheses and their language-model context.

use super::arena::HypothesisHandle;
use crate::coverage::CoverageBitmap;
use smallvec::SmallVec;
use std::fmt;

/// Vocabulary index of a target-language word.
pub type WordId = u32;

/// The trailing target words a hypothesis must remember for future n-gram
/// scoring.
///
/// Only the last *n−1* words matter for a language model of order *n*, so the
/// context is truncated at construction and stays order-bounded for the whole
/// decode. Inline storage covers models up to 5-grams without allocating.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LmContext {
    words: SmallVec<[WordId; 4]>,
}

impl LmContext {
    /// The empty (sentence-initial) context.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a context from the last `order - 1` words of `words`.
    pub fn from_tail(words: &[WordId], order: usize) -> Self {
        let keep = order.saturating_sub(1);
        let start = words.len().saturating_sub(keep);
        Self {
            words: SmallVec::from_slice(&words[start..]),
        }
    }

    /// Successor context after emitting `emitted`, truncated to `order - 1`
    /// trailing words.
    pub fn extend(&self, emitted: &[WordId], order: usize) -> Self {
        let keep = order.saturating_sub(1);
        let mut words: SmallVec<[WordId; 4]> = SmallVec::with_capacity(keep);
        words.extend_from_slice(&self.words);
        words.extend_from_slice(emitted);
        if words.len() > keep {
            let drop = words.len() - keep;
            words.drain(..drop);
        }
        Self { words }
    }

    /// The retained words, oldest first.
    #[inline]
    pub fn words(&self) -> &[WordId] {
        &self.words
    }

    /// Number of retained words.
    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True at sentence start.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl fmt::Debug for LmContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LmContext{:?}", self.words.as_slice())
    }
}

/// A partial-translation node in the derivation forest.
///
/// Immutable after construction except for the arc list, which the stack
/// appends to during recombination when n-best bookkeeping is enabled. The
/// predecessor link is a non-owning handle: the predecessor may live in an
/// earlier, already-finalized stack layer, and many hypotheses share
/// ancestors.
#[derive(Clone, Debug)]
pub struct Hypothesis {
    /// Cumulative log-domain objective; higher is better.
    pub score: f32,
    /// Trailing target words for future n-gram scoring.
    pub lm_context: LmContext,
    /// Source words translated so far.
    pub coverage: CoverageBitmap,
    /// Handle of the hypothesis this one extends; `None` for the root.
    pub predecessor: Option<HypothesisHandle>,
    /// Recombined-away alternatives attached to this representative.
    ///
    /// Empty unless the owning stack keeps arcs. After
    /// [`initialize_arcs`](super::stack::HypothesisStack::initialize_arcs)
    /// the first entry is the hypothesis' own handle.
    pub arcs: Vec<HypothesisHandle>,
}

impl Hypothesis {
    /// The initial hypothesis: nothing translated, empty context, score 0.
    pub fn root(sentence_len: usize) -> Self {
        Self {
            score: 0.0,
            lm_context: LmContext::empty(),
            coverage: CoverageBitmap::new(sentence_len),
            predecessor: None,
            arcs: Vec::new(),
        }
    }

    /// Extend a predecessor with a scored phrase translation.
    ///
    /// `coverage` must already include the newly translated span;
    /// `lm_context` must already be truncated to the model order. The
    /// constructor takes them ready-made because the search driver computes
    /// both while applying the translation option.
    pub fn extend(
        predecessor: HypothesisHandle,
        score: f32,
        lm_context: LmContext,
        coverage: CoverageBitmap,
    ) -> Self {
        Self {
            score,
            lm_context,
            coverage,
            predecessor: Some(predecessor),
            arcs: Vec::new(),
        }
    }

    /// Number of source words this hypothesis has translated.
    #[inline]
    pub fn coverage_count(&self) -> usize {
        self.coverage.count_set()
    }

    /// True once the whole source sentence is covered.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.coverage.is_complete()
    }
}
