use tracing::debug;

use super::{append, update, Engine, Update};
use crate::block::Overlay;
use crate::index::{ChunkIndex, Snapshot};
use crate::StoreError;

/// Appends `append_buf`, then applies `updates` in order.
///
/// Each step runs against the index produced by the previous one. Blocks
/// created by earlier steps are readable by later ones before the caller
/// persists them. The returned blocks are every step's blocks in call order.
pub(crate) async fn bulk(
    engine: &Engine<'_>,
    index: &ChunkIndex,
    append_buf: &[u8],
    updates: &[Update],
) -> Result<Snapshot, StoreError> {
    let mut overlay = Overlay::new(engine.blocks);

    let appended = append(engine, index, append_buf).await?;
    overlay.extend(&appended.blocks);
    let mut blocks = appended.blocks;
    let mut current = appended.index;

    for (step, u) in updates.iter().enumerate() {
        let snapshot = update(&engine.with_blocks(&overlay), &current, &u.buf, u.offset).await?;
        overlay.extend(&snapshot.blocks);
        blocks.extend(snapshot.blocks);
        current = snapshot.index;
        debug!(step, offset = u.offset, length = u.buf.len(), "Applied bulk update");
    }

    debug!(
        root = %current.root(),
        appended = append_buf.len(),
        updates = updates.len(),
        blocks = blocks.len(),
        "Bulk complete"
    );

    Ok(Snapshot {
        root: current.root().clone(),
        index: current,
        blocks,
    })
}
