//! # beamstack
//!
//! Beam-search hypothesis stacks for phrase-based statistical machine
//! translation.
//!
//! This library implements the data structure at the heart of a left-to-right
//! phrase-based decoder: the stack that holds partial translations during
//! search, merges hypotheses that are equivalent for all future purposes
//! (recombination), and discards uncompetitive ones (beam and capacity
//! pruning), in the style described in:
//!
//! > Koehn, Philipp, Franz Josef Och, and Daniel Marcu. "Statistical
//! > phrase-based translation." Proceedings of HLT-NAACL (2003): 48-54.
//!
//! ## Example
//!
//! ```rust
//! use beamstack::prelude::*;
//!
//! let mut arena = HypothesisArena::new();
//! let mut stack = StackBuilder::new()
//!     .max_stack_size(100)
//!     .beam_threshold(0.03)
//!     .build()
//!     .unwrap();
//!
//! let root = arena.alloc(Hypothesis::root(5));
//! stack.add_prune(&mut arena, root);
//!
//! assert_eq!(stack.best_hypothesis(), Some(root));
//! stack.remove_all(&mut arena);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coverage;
pub mod search;

/// Common imports for convenient usage
pub mod prelude {
    pub use crate::coverage::CoverageBitmap;
    pub use crate::search::arena::{ArenaError, HypothesisArena, HypothesisHandle};
    pub use crate::search::builder::{BuilderError, StackBuilder};
    pub use crate::search::hypothesis::{Hypothesis, LmContext, WordId};
    pub use crate::search::nbest::{extract_nbest, Derivation};
    pub use crate::search::recombination::RecombinationKey;
    pub use crate::search::scorer::{LmScore, LmScorer, UniformScorer};
    pub use crate::search::stack::HypothesisStack;
}
