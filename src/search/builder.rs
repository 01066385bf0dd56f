//! Builder for configuring hypothesis stacks.
//!
//! Configuration errors are reported here, at construction, and are fatal to
//! the stack instance: a zero-capacity stack or a nonsensical beam factor
//! must never survive to insertion time.

use super::stack::HypothesisStack;
use thiserror::Error;

/// Error type for stack configuration failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuilderError {
    /// A stack that can hold no hypotheses cannot participate in search.
    #[error("max_stack_size must be positive. Use .max_stack_size() to set it.")]
    ZeroStackSize,
    /// The beam factor must be 0 (beam disabled) or within (0, 1].
    #[error("beam_threshold {0} is outside [0, 1]")]
    InvalidBeamThreshold(f32),
}

/// Fluent builder for [`HypothesisStack`].
///
/// Defaults match the typical decoder configuration: stack size 100, beam
/// threshold 0.03, arcs off.
///
/// # Example
///
/// ```
/// use beamstack::prelude::*;
///
/// let stack = StackBuilder::new()
///     .max_stack_size(200)
///     .beam_threshold(0.03)
///     .keep_arcs(true)
///     .build()
///     .unwrap();
/// assert!(stack.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct StackBuilder {
    max_stack_size: usize,
    beam_threshold: f32,
    keep_arcs: bool,
}

impl StackBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            max_stack_size: 100,
            beam_threshold: 0.03,
            keep_arcs: false,
        }
    }

    /// Set the hard cap on live members (typical: 100).
    pub fn max_stack_size(mut self, max_stack_size: usize) -> Self {
        self.max_stack_size = max_stack_size;
        self
    }

    /// Set the relative pruning factor (typical: 0.03).
    ///
    /// Live members must score within this factor of the best score; 0
    /// disables beam pruning entirely, leaving size-only pruning.
    pub fn beam_threshold(mut self, beam_threshold: f32) -> Self {
        self.beam_threshold = beam_threshold;
        self
    }

    /// Keep recombined-away hypotheses as arcs for n-best extraction.
    pub fn keep_arcs(mut self, keep_arcs: bool) -> Self {
        self.keep_arcs = keep_arcs;
        self
    }

    /// Build the stack.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_stack_size` is zero
    /// - `beam_threshold` is negative, above 1, or NaN
    pub fn build(self) -> Result<HypothesisStack, BuilderError> {
        if self.max_stack_size == 0 {
            return Err(BuilderError::ZeroStackSize);
        }
        if !(0.0..=1.0).contains(&self.beam_threshold) {
            return Err(BuilderError::InvalidBeamThreshold(self.beam_threshold));
        }
        Ok(HypothesisStack::with_config(
            self.max_stack_size,
            self.beam_threshold,
            self.keep_arcs,
        ))
    }
}

impl Default for StackBuilder {
    fn default() -> Self {
        Self::new()
    }
}
