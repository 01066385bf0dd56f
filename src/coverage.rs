//! Source-coverage bitmaps.
//!
//! A [`CoverageBitmap`] records which source-sentence words a partial
//! translation has already consumed. It is a fixed-capacity value type: the
//! capacity is the sentence length, set once at construction, and every
//! hypothesis derived during the decode of that sentence carries a bitmap of
//! the same capacity.
//!
//! Bitmaps are totally ordered (lexicographic on the bit pattern). The order
//! carries no linguistic meaning; it exists so recombination keys can use the
//! bitmap as a tie-breaker after the language-model context.

use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;

/// Number of positions per storage block.
const BLOCK_BITS: usize = 64;

/// Bitset over source-sentence word positions.
///
/// Backed by `u64` blocks in a `SmallVec`; sentences up to 128 words fit
/// inline without a heap allocation, which covers essentially all real input.
///
/// # Example
///
/// ```
/// use beamstack::coverage::CoverageBitmap;
///
/// let mut coverage = CoverageBitmap::new(6);
/// coverage.set(0);
/// coverage.set(1);
/// assert_eq!(coverage.count_set(), 2);
/// assert_eq!(coverage.first_gap(), Some(2));
/// assert!(!coverage.is_complete());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CoverageBitmap {
    /// Bit blocks, least-significant bit of block 0 is source position 0.
    blocks: SmallVec<[u64; 2]>,
    /// Sentence length in words; bits at or beyond this index stay zero.
    len: usize,
}

impl CoverageBitmap {
    /// Create an all-clear bitmap for a sentence of `len` words.
    pub fn new(len: usize) -> Self {
        let block_count = len.div_ceil(BLOCK_BITS);
        let mut blocks = SmallVec::with_capacity(block_count);
        blocks.resize(block_count, 0u64);
        Self { blocks, len }
    }

    /// Sentence length in words (bitmap capacity).
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length sentence.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mark `position` as translated.
    ///
    /// Out-of-range positions are a caller bug; they are debug-asserted and
    /// ignored in release builds.
    #[inline]
    pub fn set(&mut self, position: usize) {
        debug_assert!(position < self.len, "coverage position out of range");
        if position < self.len {
            self.blocks[position / BLOCK_BITS] |= 1u64 << (position % BLOCK_BITS);
        }
    }

    /// True if `position` has been translated.
    #[inline]
    pub fn contains(&self, position: usize) -> bool {
        if position >= self.len {
            return false;
        }
        self.blocks[position / BLOCK_BITS] & (1u64 << (position % BLOCK_BITS)) != 0
    }

    /// Number of translated positions.
    #[inline]
    pub fn count_set(&self) -> usize {
        self.blocks.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// True once every source word is covered.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.count_set() == self.len
    }

    /// Lowest untranslated position, or `None` when complete.
    pub fn first_gap(&self) -> Option<usize> {
        for (block_index, &block) in self.blocks.iter().enumerate() {
            if block != u64::MAX {
                let gap = block_index * BLOCK_BITS + (!block).trailing_zeros() as usize;
                if gap < self.len {
                    return Some(gap);
                }
            }
        }
        None
    }

    /// Three-way comparison on the bit pattern.
    ///
    /// Exposed by name because callers of the recombination order read better
    /// with `a.compare(&b)` than with `Ord::cmp`; the two agree.
    #[inline]
    pub fn compare(&self, other: &CoverageBitmap) -> Ordering {
        self.blocks
            .cmp(&other.blocks)
            .then(self.len.cmp(&other.len))
    }
}

impl PartialOrd for CoverageBitmap {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CoverageBitmap {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Debug for CoverageBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoverageBitmap(")?;
        for position in 0..self.len {
            write!(f, "{}", if self.contains(position) { '1' } else { '0' })?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for CoverageBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for position in 0..self.len {
            write!(f, "{}", if self.contains(position) { '1' } else { '0' })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bitmap_is_clear() {
        let coverage = CoverageBitmap::new(10);
        assert_eq!(coverage.len(), 10);
        assert_eq!(coverage.count_set(), 0);
        assert_eq!(coverage.first_gap(), Some(0));
        assert!(!coverage.is_complete());
    }

    #[test]
    fn test_set_and_contains() {
        let mut coverage = CoverageBitmap::new(8);
        coverage.set(3);
        coverage.set(7);
        assert!(coverage.contains(3));
        assert!(coverage.contains(7));
        assert!(!coverage.contains(0));
        assert_eq!(coverage.count_set(), 2);
    }

    #[test]
    fn test_first_gap_skips_covered_prefix() {
        let mut coverage = CoverageBitmap::new(5);
        coverage.set(0);
        coverage.set(1);
        coverage.set(3);
        assert_eq!(coverage.first_gap(), Some(2));
    }

    #[test]
    fn test_complete_bitmap_has_no_gap() {
        let mut coverage = CoverageBitmap::new(4);
        for position in 0..4 {
            coverage.set(position);
        }
        assert!(coverage.is_complete());
        assert_eq!(coverage.first_gap(), None);
    }

    #[test]
    fn test_multi_block_sentence() {
        // Crosses the 64-bit block boundary
        let mut coverage = CoverageBitmap::new(130);
        coverage.set(63);
        coverage.set(64);
        coverage.set(129);
        assert!(coverage.contains(63));
        assert!(coverage.contains(64));
        assert!(coverage.contains(129));
        assert_eq!(coverage.count_set(), 3);
        assert_eq!(coverage.first_gap(), Some(0));
    }

    #[test]
    fn test_ordering_is_total_and_consistent_with_eq() {
        let mut a = CoverageBitmap::new(6);
        let mut b = CoverageBitmap::new(6);
        a.set(0);
        b.set(1);
        assert_ne!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);

        let mut b2 = CoverageBitmap::new(6);
        b2.set(1);
        assert_eq!(b.cmp(&b2), Ordering::Equal);
        assert_eq!(b, b2);
    }

    #[test]
    fn test_out_of_range_contains_is_false() {
        let coverage = CoverageBitmap::new(3);
        assert!(!coverage.contains(3));
        assert!(!coverage.contains(1000));
    }

    #[test]
    fn test_display_renders_bit_pattern() {
        let mut coverage = CoverageBitmap::new(5);
        coverage.set(0);
        coverage.set(2);
        assert_eq!(coverage.to_string(), "10100");
    }
}
