//! Incremental mutation engine.
//!
//! Append, update and remove re-chunk only the region a change touches:
//!
//! 1. Resolve the affected chunks
//! 2. Materialize their bytes merged with the change
//! 3. Extend the target rightward with up to `max_right_padding` chunks
//! 4. Run the chunker over the target alone
//! 5. Splice the new chunks between the untouched prefix and suffix
//! 6. Verify the offset checksum and serialize the new index
//!
//! Padding gives the chunker room to fall back onto the old boundaries, so
//! the suffix chunks after the region are reused as they are.

mod append;
mod bulk;
mod remove;
mod update;

pub(crate) use append::append;
pub(crate) use bulk::bulk;
pub(crate) use remove::remove;
pub(crate) use update::update;

use std::ops::Range;

use bytes::Bytes;
use chunky_cdc::Chunker;
use tracing::warn;

use crate::block::BlockGet;
use crate::codec::Codec;
use crate::index::{ChunkIndex, IndexEntry};
use crate::read::fetch_chunk;
use crate::resolve::{ChunkRole, MUTATION_PAD};
use crate::StoreError;

/// Default number of chunks appended to a re-chunked region.
pub const DEFAULT_MAX_RIGHT_PADDING: usize = 3;

/// One overwrite in a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Absolute offset of the first overwritten byte
    pub offset: u32,
    /// Replacement bytes
    pub buf: Bytes,
}

impl Update {
    /// Creates an update writing `buf` at `offset`.
    pub fn new(offset: u32, buf: impl Into<Bytes>) -> Self {
        Self {
            offset,
            buf: buf.into(),
        }
    }
}

/// Collaborators for one mutation.
#[derive(Clone, Copy)]
pub(crate) struct Engine<'a> {
    pub chunker: &'a dyn Chunker,
    pub codec: &'a dyn Codec,
    pub blocks: &'a dyn BlockGet,
    pub max_right_padding: usize,
}

impl<'a> Engine<'a> {
    /// Returns the same engine reading through `blocks`.
    pub fn with_blocks(self, blocks: &'a dyn BlockGet) -> Self {
        Self { blocks, ..self }
    }

    /// Chunk positions to re-chunk for a change of `[start, end)`.
    ///
    /// Covers the chunks overlapping the change plus the right padding.
    /// `end > start` and `end <= byte_array_size`.
    fn region(&self, index: &ChunkIndex, start: u32, end: u32) -> Range<usize> {
        let affected = index.relevant_chunks(start, end, MUTATION_PAD);
        let last = affected.end - 1;
        let padding = right_padding(index.index_size(), last, self.max_right_padding);
        affected.start..last + 1 + padding
    }
}

/// Number of whole chunks to add after chunk `last` of `index_size`.
pub(crate) fn right_padding(index_size: usize, last: usize, max_right_padding: usize) -> usize {
    (index_size - 1 - last).min(max_right_padding)
}

/// How a region's bytes are merged with a change.
#[derive(Debug, Clone, Copy)]
enum Edit<'b> {
    /// Overwrite the change range with these bytes
    Patch(&'b [u8]),
    /// Drop the change range
    Cut,
}

/// Byte span of the chunks at `region`.
fn region_span(index: &ChunkIndex, region: &Range<usize>) -> Range<u32> {
    index.span(region.start).start..index.span(region.end - 1).end
}

/// Fetches the chunks at `region` and applies `edit` to `[start, end)`.
async fn materialize(
    index: &ChunkIndex,
    region: Range<usize>,
    start: u32,
    end: u32,
    edit: Edit<'_>,
    blocks: &dyn BlockGet,
) -> Result<Vec<u8>, StoreError> {
    let span = region_span(index, &region);
    let mut target = Vec::with_capacity((span.end - span.start) as usize);

    for i in region {
        let chunk = fetch_chunk(index, i, blocks).await?;
        match (ChunkRole::classify(index.span(i), start, end), edit) {
            (None, _) => target.extend_from_slice(&chunk),
            (Some(overlap), Edit::Patch(buf)) => {
                let at = target.len();
                target.extend_from_slice(&chunk);
                target[at + overlap.chunk.start..at + overlap.chunk.end]
                    .copy_from_slice(&buf[overlap.target]);
            }
            (Some(overlap), Edit::Cut) => {
                target.extend_from_slice(&chunk[..overlap.chunk.start]);
                target.extend_from_slice(&chunk[overlap.chunk.end..]);
            }
        }
    }

    Ok(target)
}

/// Replaces the entries at `region` with `new_entries`.
///
/// Entries after the region move down by `shift`.
fn splice(
    index: &ChunkIndex,
    region: Range<usize>,
    new_entries: Vec<IndexEntry>,
    shift: u32,
) -> Vec<IndexEntry> {
    let entries = index.entries();
    let mut spliced = Vec::with_capacity(entries.len() - region.len() + new_entries.len());
    spliced.extend_from_slice(&entries[..region.start]);
    spliced.extend(new_entries);
    spliced.extend(
        entries[region.end..]
            .iter()
            .map(|e| IndexEntry::new(e.offset - shift, e.cid.clone())),
    );
    spliced
}

/// Verifies the offset arithmetic of a spliced index.
///
/// Relative deltas plus the tail span must add up to `byte_array_size` with
/// every delta positive, and reused plus newly chunked bytes must match it.
fn verify_checksum(
    entries: &[IndexEntry],
    byte_array_size: u32,
    reused: u64,
    rechunked: u64,
) -> Result<(), StoreError> {
    let expected = byte_array_size as u64;
    let fail = |checksum: u64| {
        warn!(checksum, expected, "Index checksum mismatch");
        Err(StoreError::Checksum { checksum, expected })
    };

    let mut checksum = 0u64;
    let mut prev = 0u64;
    for (i, entry) in entries.iter().enumerate() {
        let offset = entry.offset as u64;
        let valid = if i == 0 { offset == 0 } else { offset > prev };
        if !valid {
            return fail(checksum + offset.saturating_sub(prev));
        }
        checksum += offset - prev;
        prev = offset;
    }
    if !entries.is_empty() {
        if prev >= expected {
            return fail(prev);
        }
        checksum += expected - prev;
    }

    if checksum != expected {
        return fail(checksum);
    }
    if reused + rechunked != expected {
        return fail(reused + rechunked);
    }
    Ok(())
}
