//! Pooled hypothesis allocation.
//!
//! Decoding churns through hypotheses: most candidates are rejected or
//! recombined away within a single `add_prune` call. The arena keeps that
//! churn off the general-purpose allocator by recycling slots through a LIFO
//! free list, and replaces raw pointers with generation-checked handles so a
//! stale predecessor reference resolves to `None` instead of dangling.
//!
//! The arena is an explicit dependency of every stack operation that frees
//! hypotheses, rather than an ambient singleton; parallel sentence decoding
//! uses one private arena per thread.
//!
//! # Thread Safety
//!
//! `HypothesisArena` is NOT thread-safe. One arena per decoding thread.

use super::hypothesis::Hypothesis;
use thiserror::Error;

/// Error type for arena allocation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// The configured slot limit is exhausted.
    ///
    /// The caller cannot recover mid-decode; abort the sentence and release
    /// the arena.
    #[error("hypothesis arena exhausted ({limit} slots in use)")]
    Exhausted {
        /// The configured capacity limit that was hit.
        limit: usize,
    },
}

/// Stable identifier of an arena slot.
///
/// A handle is a slot index plus the generation the slot had when the
/// hypothesis was allocated. Freeing a slot bumps its generation, so handles
/// into freed (or since-reused) slots fail the generation check and resolve
/// to `None` instead of aliasing an unrelated hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HypothesisHandle {
    index: u32,
    generation: u32,
}

impl HypothesisHandle {
    /// Raw slot index; stable for the lifetime of the allocation.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// One arena slot: payload plus generation counter.
#[derive(Debug)]
struct Slot {
    hypothesis: Option<Hypothesis>,
    generation: u32,
}

/// Pool of hypothesis slots with O(1) amortized alloc and free.
///
/// Freed slots are reused in LIFO order for cache locality, mirroring the
/// admit/reject rhythm of the search loop: the hypothesis freed a moment ago
/// is the warmest slot for the next candidate.
///
/// The arena counts every allocation and release. The counters are the
/// ground truth for the resource-discipline tests: after a full decode and
/// teardown, `total_frees` must equal `total_allocations` and `live_count`
/// must be zero.
#[derive(Debug)]
pub struct HypothesisArena {
    slots: Vec<Slot>,
    /// Indices of free slots, most recently freed last.
    free_list: Vec<u32>,
    /// Optional hard cap on live hypotheses; `None` grows unbounded.
    capacity_limit: Option<usize>,
    live: usize,
    allocations: usize,
    frees: usize,
    reuses: usize,
}

impl HypothesisArena {
    /// Create an unbounded arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            capacity_limit: None,
            live: 0,
            allocations: 0,
            frees: 0,
            reuses: 0,
        }
    }

    /// Create an arena that refuses to hold more than `limit` live
    /// hypotheses at once.
    pub fn with_capacity_limit(limit: usize) -> Self {
        Self {
            capacity_limit: Some(limit),
            ..Self::new()
        }
    }

    /// Allocate a slot for `hypothesis`.
    ///
    /// Returns [`ArenaError::Exhausted`] when a capacity limit is configured
    /// and reached. The error propagates to the search driver; there is no
    /// safe partial state to fall back to.
    pub fn try_alloc(&mut self, hypothesis: Hypothesis) -> Result<HypothesisHandle, ArenaError> {
        if let Some(limit) = self.capacity_limit {
            if self.live >= limit {
                return Err(ArenaError::Exhausted { limit });
            }
        }
        self.allocations += 1;
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            self.reuses += 1;
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.hypothesis.is_none(), "free-listed slot holds data");
            slot.hypothesis = Some(hypothesis);
            Ok(HypothesisHandle {
                index,
                generation: slot.generation,
            })
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                hypothesis: Some(hypothesis),
                generation: 0,
            });
            Ok(HypothesisHandle {
                index,
                generation: 0,
            })
        }
    }

    /// Allocate, panicking on exhaustion.
    ///
    /// Convenience for unbounded arenas, where `try_alloc` cannot fail.
    pub fn alloc(&mut self, hypothesis: Hypothesis) -> HypothesisHandle {
        self.try_alloc(hypothesis)
            .expect("unbounded arena cannot be exhausted")
    }

    /// Release the hypothesis behind `handle` back to the pool.
    ///
    /// Returns `true` if the handle was live. A stale handle (already freed,
    /// or its slot since reused) is rejected and counted nowhere; freeing is
    /// idempotent per allocation, never a double free.
    pub fn free(&mut self, handle: HypothesisHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation || slot.hypothesis.is_none() {
            return false;
        }
        slot.hypothesis = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        self.live -= 1;
        self.frees += 1;
        true
    }

    /// The hypothesis behind `handle`, or `None` if stale.
    #[inline]
    pub fn get(&self, handle: HypothesisHandle) -> Option<&Hypothesis> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.hypothesis.as_ref())
    }

    /// Mutable access to the hypothesis behind `handle`, or `None` if stale.
    #[inline]
    pub fn get_mut(&mut self, handle: HypothesisHandle) -> Option<&mut Hypothesis> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.hypothesis.as_mut())
    }

    /// True if `handle` still refers to a live hypothesis.
    #[inline]
    pub fn is_live(&self, handle: HypothesisHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live hypotheses.
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Total allocations over the arena's lifetime.
    pub fn total_allocations(&self) -> usize {
        self.allocations
    }

    /// Total releases over the arena's lifetime.
    pub fn total_frees(&self) -> usize {
        self.frees
    }

    /// Fraction of allocations served from the free list.
    pub fn reuse_rate(&self) -> f64 {
        if self.allocations == 0 {
            0.0
        } else {
            self.reuses as f64 / self.allocations as f64
        }
    }
}

impl Default for HypothesisArena {
    fn default() -> Self {
        Self::new()
    }
}
