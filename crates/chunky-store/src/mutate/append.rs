use chunky_core::to_wire_u32;
use tracing::debug;

use super::{splice, verify_checksum, Engine};
use crate::create::{chunk_checked, create, encode_chunks, finalize};
use crate::index::{ChunkIndex, Snapshot};
use crate::read::fetch_chunk;
use crate::StoreError;

/// Appends `buf` to the end of the logical buffer.
///
/// Only the last chunk is re-chunked, together with the new bytes; every
/// earlier chunk is reused.
pub(crate) async fn append(
    engine: &Engine<'_>,
    index: &ChunkIndex,
    buf: &[u8],
) -> Result<Snapshot, StoreError> {
    if buf.is_empty() {
        return Ok(Snapshot::unchanged(index));
    }
    if index.is_empty() {
        return create(buf, engine.chunker, engine.codec).await;
    }

    let size = index.byte_array_size();
    let new_size = to_wire_u32(size as u64 + buf.len() as u64)?;

    let last = index.index_size() - 1;
    let last_start = index.span(last).start;
    let last_chunk = fetch_chunk(index, last, engine.blocks).await?;

    let mut overlap = Vec::with_capacity(last_chunk.len() + buf.len());
    overlap.extend_from_slice(&last_chunk);
    overlap.extend_from_slice(buf);

    let cuts = chunk_checked(engine.chunker, &overlap)?;
    let (new_entries, blocks) = encode_chunks(&overlap, &cuts, last_start, engine.codec).await?;
    let entries = splice(index, last..last + 1, new_entries, 0);
    verify_checksum(&entries, new_size, last_start as u64, overlap.len() as u64)?;

    let snapshot = finalize(entries, new_size, blocks, engine.codec).await?;

    debug!(
        root = %snapshot.root,
        appended = buf.len(),
        reused = last,
        index_size = snapshot.index.index_size(),
        byte_array_size = new_size,
        "Appended"
    );

    Ok(snapshot)
}
