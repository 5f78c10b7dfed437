use tracing::debug;

use super::{materialize, region_span, splice, verify_checksum, Edit, Engine};
use crate::create::{chunk_checked, encode_chunks, finalize};
use crate::index::{ChunkIndex, Snapshot};
use crate::read::check_range;
use crate::StoreError;

/// Deletes `length` bytes starting at `start`.
///
/// Chunks after the re-chunked region are reused with their offsets shifted
/// down by `length`.
pub(crate) async fn remove(
    engine: &Engine<'_>,
    index: &ChunkIndex,
    start: u32,
    length: u32,
) -> Result<Snapshot, StoreError> {
    if length == 0 {
        return Ok(Snapshot::unchanged(index));
    }
    let size = index.byte_array_size();
    let end = check_range(start, length as u64, size)?;
    let new_size = size - length;

    let region = engine.region(index, start, end);
    let span = region_span(index, &region);
    let target = materialize(index, region.clone(), start, end, Edit::Cut, engine.blocks).await?;

    let cuts = chunk_checked(engine.chunker, &target)?;
    let (new_entries, blocks) = encode_chunks(&target, &cuts, span.start, engine.codec).await?;
    let entries = splice(index, region.clone(), new_entries, length);

    let reused = span.start as u64 + (size - span.end) as u64;
    verify_checksum(&entries, new_size, reused, target.len() as u64)?;

    let snapshot = finalize(entries, new_size, blocks, engine.codec).await?;

    debug!(
        root = %snapshot.root,
        start,
        length,
        rechunked = region.len(),
        new_chunks = snapshot.blocks.len() - 1,
        index_size = snapshot.index.index_size(),
        byte_array_size = new_size,
        "Removed"
    );

    Ok(snapshot)
}
