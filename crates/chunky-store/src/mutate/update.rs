use tracing::debug;

use super::{materialize, region_span, splice, verify_checksum, Edit, Engine};
use crate::create::{chunk_checked, encode_chunks, finalize};
use crate::index::{ChunkIndex, Snapshot};
use crate::read::check_range;
use crate::StoreError;

/// Overwrites `buf.len()` bytes starting at `start`.
pub(crate) async fn update(
    engine: &Engine<'_>,
    index: &ChunkIndex,
    buf: &[u8],
    start: u32,
) -> Result<Snapshot, StoreError> {
    if buf.is_empty() {
        return Ok(Snapshot::unchanged(index));
    }
    let size = index.byte_array_size();
    let end = check_range(start, buf.len() as u64, size)?;

    let region = engine.region(index, start, end);
    let span = region_span(index, &region);
    let target = materialize(
        index,
        region.clone(),
        start,
        end,
        Edit::Patch(buf),
        engine.blocks,
    )
    .await?;

    let cuts = chunk_checked(engine.chunker, &target)?;
    let (new_entries, blocks) = encode_chunks(&target, &cuts, span.start, engine.codec).await?;
    let entries = splice(index, region.clone(), new_entries, 0);

    let reused = span.start as u64 + (size - span.end) as u64;
    verify_checksum(&entries, size, reused, target.len() as u64)?;

    let snapshot = finalize(entries, size, blocks, engine.codec).await?;

    debug!(
        root = %snapshot.root,
        start,
        length = buf.len(),
        rechunked = region.len(),
        new_chunks = snapshot.blocks.len() - 1,
        index_size = snapshot.index.index_size(),
        "Updated"
    );

    Ok(snapshot)
}
