//! Create engine.
//!
//! Chunks a whole buffer, encodes every chunk into a block and serializes the
//! resulting index. The helpers here are shared with the mutation engine.

use bytes::Bytes;
use chunky_cdc::Chunker;
use chunky_core::to_wire_u32;
use tracing::{debug, trace};

use crate::block::Block;
use crate::codec::{encode_checked, Codec};
use crate::index::{encode_index, ChunkIndex, IndexEntry, Snapshot};
use crate::StoreError;

/// Runs the chunker over `data` and checks the cut list.
///
/// Cuts must be non-zero, strictly ascending and end at `data.len()`.
pub(crate) fn chunk_checked(chunker: &dyn Chunker, data: &[u8]) -> Result<Vec<u32>, StoreError> {
    let cuts = chunker.chunk(data);

    let mut prev = 0u32;
    for &cut in &cuts {
        if cut <= prev {
            return Err(StoreError::InvalidChunking(format!(
                "cut {} does not follow {}",
                cut, prev
            )));
        }
        prev = cut;
    }
    if prev as usize != data.len() {
        return Err(StoreError::InvalidChunking(format!(
            "last cut {} does not match data length {}",
            prev,
            data.len()
        )));
    }

    Ok(cuts)
}

/// Encodes the chunks of `data` delimited by `cuts`.
///
/// Entry offsets are `base + chunk start`.
pub(crate) async fn encode_chunks(
    data: &[u8],
    cuts: &[u32],
    base: u32,
    codec: &dyn Codec,
) -> Result<(Vec<IndexEntry>, Vec<Block>), StoreError> {
    let mut entries = Vec::with_capacity(cuts.len());
    let mut blocks = Vec::with_capacity(cuts.len());

    let mut start = 0u32;
    for &cut in cuts {
        let chunk = Bytes::copy_from_slice(&data[start as usize..cut as usize]);
        let cid = encode_checked(codec, &chunk).await?;
        let offset = base
            .checked_add(start)
            .ok_or(StoreError::IntegerRange(base as u64 + start as u64))?;

        trace!(offset, size = chunk.len(), cid = %cid, "Encoded chunk");
        entries.push(IndexEntry::new(offset, cid.clone()));
        blocks.push(Block::new(cid, chunk));
        start = cut;
    }

    Ok((entries, blocks))
}

/// Serializes the index, computes the root and appends the root block.
pub(crate) async fn finalize(
    entries: Vec<IndexEntry>,
    byte_array_size: u32,
    mut blocks: Vec<Block>,
    codec: &dyn Codec,
) -> Result<Snapshot, StoreError> {
    let buffer = encode_index(&entries, byte_array_size)?;
    let root = encode_checked(codec, &buffer).await?;
    blocks.push(Block::new(root.clone(), buffer));

    Ok(Snapshot {
        index: ChunkIndex::from_parts(root.clone(), entries, byte_array_size),
        root,
        blocks,
    })
}

/// Chunks `buf` and builds a fresh index over it.
pub async fn create(
    buf: &[u8],
    chunker: &dyn Chunker,
    codec: &dyn Codec,
) -> Result<Snapshot, StoreError> {
    let size = to_wire_u32(buf.len() as u64)?;
    let cuts = chunk_checked(chunker, buf)?;
    let (entries, blocks) = encode_chunks(buf, &cuts, 0, codec).await?;
    let snapshot = finalize(entries, size, blocks, codec).await?;

    debug!(
        root = %snapshot.root,
        index_size = snapshot.index.index_size(),
        byte_array_size = size,
        blocks = snapshot.blocks.len(),
        "Created index"
    );

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemoryBlockStore;
    use crate::codec::Blake3Codec;
    use crate::index::read_index;
    use crate::read::read_all;
    use crate::BlockPut;
    use chunky_cdc::{FastCdc, FixedSize};
    use chunky_core::wire::INDEX_HEADER_SIZE;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    fn random_data(len: usize, seed: u64) -> Vec<u8> {
        let mut data = vec![0u8; len];
        StdRng::seed_from_u64(seed).fill_bytes(&mut data);
        data
    }

    #[tokio::test]
    async fn test_create_layout() {
        let chunker = FixedSize::new(4).unwrap();
        let snapshot = create(b"abcdefghij", &chunker, &Blake3Codec).await.unwrap();

        let offsets: Vec<u32> = snapshot.index.offsets().collect();
        assert_eq!(offsets, vec![0, 4, 8]);
        assert_eq!(snapshot.index.byte_array_size(), 10);

        // Data chunks in offset order, root block last
        assert_eq!(snapshot.blocks.len(), 4);
        assert_eq!(&snapshot.blocks[0].bytes[..], b"abcd");
        assert_eq!(&snapshot.blocks[2].bytes[..], b"ij");
        assert_eq!(snapshot.blocks[3].cid, snapshot.root);
        assert_eq!(snapshot.index.root(), &snapshot.root);
    }

    #[tokio::test]
    async fn test_create_empty() {
        let snapshot = create(&[], &FastCdc::default(), &Blake3Codec).await.unwrap();
        assert_eq!(snapshot.index.index_size(), 0);
        assert_eq!(snapshot.index.byte_array_size(), 0);
        assert_eq!(snapshot.blocks.len(), 1);
        assert_eq!(snapshot.blocks[0].len(), INDEX_HEADER_SIZE);
    }

    #[tokio::test]
    async fn test_create_roundtrip_through_store() {
        let data = random_data(20_000, 42);
        let chunker = FastCdc::with_avg_size(512).unwrap();
        let snapshot = create(&data, &chunker, &Blake3Codec).await.unwrap();

        let store = MemoryBlockStore::new();
        store.put_all(&snapshot.blocks).await.unwrap();

        let index = read_index(&snapshot.root, &store, &Blake3Codec).await.unwrap();
        assert_eq!(index, snapshot.index);
        assert_eq!(&read_all(&index, &store).await.unwrap()[..], &data[..]);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_cuts() {
        let codec = Blake3Codec;

        let unordered = |_: &[u8]| vec![6u32, 3, 10];
        assert!(matches!(
            create(&[0u8; 10], &unordered, &codec).await,
            Err(StoreError::InvalidChunking(_))
        ));

        let short = |_: &[u8]| vec![4u32, 8];
        assert!(matches!(
            create(&[0u8; 10], &short, &codec).await,
            Err(StoreError::InvalidChunking(_))
        ));

        let leading_zero = |data: &[u8]| vec![0u32, data.len() as u32];
        assert!(matches!(
            create(&[0u8; 10], &leading_zero, &codec).await,
            Err(StoreError::InvalidChunking(_))
        ));
    }
}
