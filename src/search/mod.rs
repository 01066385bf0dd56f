//! Beam-search core: hypotheses, pooled allocation, recombination, and the
//! pruning stack.
//!
//! The search driver sits outside this module. It constructs candidate
//! hypotheses (extending a predecessor with a scored phrase translation,
//! consulting an [`LmScorer`]), allocates them in a [`HypothesisArena`], and
//! offers each one to a [`HypothesisStack`] via
//! [`add_prune`](HypothesisStack::add_prune). At the end of a layer it reads
//! the survivors back for expansion, and at the final layer queries the best
//! hypothesis or extracts an n-best list.

pub mod arena;
pub mod builder;
pub mod hypothesis;
pub mod nbest;
pub mod recombination;
pub mod scorer;
pub mod stack;

pub use arena::{ArenaError, HypothesisArena, HypothesisHandle};
pub use builder::{BuilderError, StackBuilder};
pub use hypothesis::{Hypothesis, LmContext, WordId};
pub use nbest::{extract_nbest, Derivation};
pub use recombination::{RecombinationKey, ScoreKey};
pub use scorer::{LmScore, LmScorer, UniformScorer};
pub use stack::HypothesisStack;
