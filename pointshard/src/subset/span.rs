//! Contiguous ranges of linear node addresses.

use super::SubsetError;

/// A half-open range `[begin, end)` of linear node addresses at one depth of
/// the index hierarchy.
///
/// Addresses are base-4 per depth level: moving one level deeper multiplies
/// the address space by 4, so a node's children occupy `[4a, 4a + 4)` one
/// level down from address `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Span {
    begin: u64,
    end: u64,
}

impl Span {
    /// Create a span covering `[begin, end)`.
    pub fn new(begin: u64, end: u64) -> Self {
        debug_assert!(begin <= end, "span begin must not exceed end");
        Self { begin, end }
    }

    /// First address in the range.
    pub fn begin(&self) -> u64 {
        self.begin
    }

    /// One past the last address in the range.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of addresses covered.
    pub fn count(&self) -> u64 {
        self.end - self.begin
    }

    /// Whether the range covers no addresses.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Extend this span over an immediately adjacent one.
    ///
    /// The spans must abut exactly (`self.end == other.begin`); anything else
    /// is a caller contract violation and fails rather than silently dropping
    /// addresses.
    pub fn merge(&mut self, other: &Span) -> Result<(), SubsetError> {
        if self.end != other.begin {
            return Err(SubsetError::UnmergeableSpans {
                a_begin: self.begin,
                a_end: self.end,
                b_begin: other.begin,
                b_end: other.end,
            });
        }
        self.end = other.end;
        Ok(())
    }

    /// Map this span one depth coarser.
    ///
    /// Both endpoints divide by 4 (arithmetic shift right by 2 bits). A span
    /// that is not a complete base-4 block collapses toward empty, which is
    /// how shard-specific spans vanish above the first split depth.
    pub fn contract(self) -> Span {
        Span {
            begin: self.begin >> 2,
            end: self.end >> 2,
        }
    }
}
