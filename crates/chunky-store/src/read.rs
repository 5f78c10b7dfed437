//! Read engine.
//!
//! Copies an arbitrary byte range out of the chunks that cover it. Only chunks
//! overlapping the range are fetched; fetches run concurrently and are
//! assembled in offset order.

use bytes::{Bytes, BytesMut};
use chunky_core::Cid;
use futures::future::try_join_all;
use tracing::{debug, trace, warn};

use crate::block::BlockGet;
use crate::index::ChunkIndex;
use crate::resolve::{ChunkRole, Overlap, READ_PAD};
use crate::StoreError;

/// Checks that `[start, start + length)` lies inside a buffer of `size` bytes.
pub(crate) fn check_range(start: u32, length: u64, size: u32) -> Result<u32, StoreError> {
    let end = start as u64 + length;
    if start > size || end > size as u64 {
        return Err(StoreError::Range { start: start as u64, end, size });
    }
    Ok(end as u32)
}

/// Fetches chunk `i` and checks its length against the indexed span.
pub(crate) async fn fetch_chunk(
    index: &ChunkIndex,
    i: usize,
    blocks: &dyn BlockGet,
) -> Result<Bytes, StoreError> {
    let cid: &Cid = &index.entries()[i].cid;
    let bytes = blocks.get(cid).await?;
    let expected = index.chunk_len(i);
    if bytes.len() != expected {
        warn!(cid = %cid, expected, actual = bytes.len(), "Chunk length differs from index span");
        return Err(StoreError::CorruptChunk {
            cid: cid.clone(),
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Reads `length` bytes starting at `start`.
pub async fn read(
    index: &ChunkIndex,
    blocks: &dyn BlockGet,
    start: u32,
    length: u32,
) -> Result<Bytes, StoreError> {
    let end = check_range(start, length as u64, index.byte_array_size())?;
    if length == 0 {
        return Ok(Bytes::new());
    }

    let overlaps: Vec<(usize, Overlap)> = index
        .relevant_chunks(start, end, READ_PAD)
        .filter_map(|i| ChunkRole::classify(index.span(i), start, end).map(|o| (i, o)))
        .collect();

    let chunks = try_join_all(overlaps.iter().map(|(i, _)| fetch_chunk(index, *i, blocks))).await?;

    if let [(i, overlap)] = overlaps.as_slice() {
        if overlap.role == ChunkRole::Single {
            trace!(chunk = i, window = ?overlap.chunk, "Single-chunk read");
            return Ok(chunks[0].slice(overlap.chunk.clone()));
        }
    }

    let mut out = BytesMut::zeroed(length as usize);
    let mut cursor = 0usize;
    for ((i, overlap), chunk) in overlaps.iter().zip(&chunks) {
        out[overlap.target.clone()].copy_from_slice(&chunk[overlap.chunk.clone()]);
        cursor += overlap.target.len();
        trace!(chunk = i, role = ?overlap.role, copied = overlap.target.len(), "Copied chunk window");
    }

    if cursor != length as usize {
        warn!(copied = cursor, expected = length, "Read checksum mismatch");
        return Err(StoreError::Checksum {
            checksum: cursor as u64,
            expected: length as u64,
        });
    }

    debug!(
        root = %index.root(),
        start,
        length,
        chunks = overlaps.len(),
        "Read range"
    );

    Ok(out.freeze())
}

/// Reads the whole logical buffer.
pub async fn read_all(index: &ChunkIndex, blocks: &dyn BlockGet) -> Result<Bytes, StoreError> {
    read(index, blocks, 0, index.byte_array_size()).await
}
