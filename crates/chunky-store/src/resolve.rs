//! Offset resolution.
//!
//! Maps a byte range of the logical buffer to the chunks that cover it and
//! classifies how each chunk overlaps the range.

use std::ops::Range;

/// Padding used by reads: one entry past the range end.
pub const READ_PAD: usize = 1;

/// Padding used by mutations.
pub const MUTATION_PAD: usize = 0;

/// Returns the positions of the chunks covering `[start, end)`.
///
/// The range runs from the rightmost offset `<= start` through the entries
/// whose offset is `< end`, extended by `pad` trailing entries and clamped to
/// `offsets.len()`. `offsets` must be sorted ascending.
pub fn relevant_chunks(offsets: &[u32], start: u32, end: u32, pad: usize) -> Range<usize> {
    covering_range(
        offsets.partition_point(|&o| o <= start),
        offsets.partition_point(|&o| o < end),
        offsets.len(),
        pad,
    )
}

/// Builds the covering range from two partition points.
///
/// `at_or_before_start` counts offsets `<= start`, `before_end` counts
/// offsets `< end`.
pub(crate) fn covering_range(
    at_or_before_start: usize,
    before_end: usize,
    len: usize,
    pad: usize,
) -> Range<usize> {
    let lo = at_or_before_start.saturating_sub(1);
    let hi = before_end.saturating_add(pad).min(len).max(lo);
    lo..hi
}

/// How a chunk overlaps a target range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRole {
    /// The chunk contains the whole target range
    Single,
    /// The target range starts inside the chunk and extends past it
    First,
    /// The chunk lies strictly inside the target range
    Middle,
    /// The target range ends inside the chunk
    Last,
}

/// The overlap of one chunk with a target range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    /// Role of the chunk relative to the target
    pub role: ChunkRole,
    /// Overlapping bytes, relative to the chunk start
    pub chunk: Range<usize>,
    /// Overlapping bytes, relative to the target start
    pub target: Range<usize>,
}

impl ChunkRole {
    /// Classifies chunk span `span` against the target `[start, end)`.
    ///
    /// Returns `None` when they do not overlap or the target is empty.
    pub fn classify(span: Range<u32>, start: u32, end: u32) -> Option<Overlap> {
        if start >= end || span.start >= end || start >= span.end {
            return None;
        }

        let starts_inside = span.start <= start;
        let ends_inside = end <= span.end;
        let role = match (starts_inside, ends_inside) {
            (true, true) => ChunkRole::Single,
            (true, false) => ChunkRole::First,
            (false, true) => ChunkRole::Last,
            (false, false) => ChunkRole::Middle,
        };

        let lo = span.start.max(start);
        let hi = span.end.min(end);
        Some(Overlap {
            role,
            chunk: (lo - span.start) as usize..(hi - span.start) as usize,
            target: (lo - start) as usize..(hi - start) as usize,
        })
    }
}
