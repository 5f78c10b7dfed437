//! Test fixture for store integration testing.

use std::sync::Arc;

use bytes::Bytes;
use chunky_cdc::{Buzhash, Chunker, FastCdc};
use chunky_store::{Blake3Codec, BlockPut, ChunkyStore, MemoryBlockStore, Snapshot, StoreError};
use tracing::info;

use crate::records::RECORD_SIZE_BYTES;

/// Average chunk size used by the fixture's FastCDC chunker.
pub const FIXTURE_AVG_SIZE: usize = 512;

/// Buzhash mask width used by the fixture's Buzhash chunker.
pub const FIXTURE_MASK_BITS: u32 = 9;

/// A store over an in-memory block store.
pub struct TestFixture {
    /// Backing block store
    pub blocks: Arc<MemoryBlockStore>,
    /// Store under test
    pub store: ChunkyStore,
}

impl TestFixture {
    /// Creates a fixture with FastCDC, 512-byte average chunks.
    pub fn fastcdc() -> Result<Self, StoreError> {
        Ok(Self::with_chunker(Arc::new(FastCdc::with_avg_size(
            FIXTURE_AVG_SIZE,
        )?)))
    }

    /// Creates a fixture with Buzhash, 9-bit mask.
    pub fn buzhash() -> Result<Self, StoreError> {
        Ok(Self::with_chunker(Arc::new(Buzhash::with_mask_bits(
            FIXTURE_MASK_BITS,
        )?)))
    }

    /// Creates a fixture with the given chunker.
    pub fn with_chunker(chunker: Arc<dyn Chunker>) -> Self {
        let blocks = Arc::new(MemoryBlockStore::new());
        let store = ChunkyStore::new(chunker, Arc::new(Blake3Codec), blocks.clone());
        Self { blocks, store }
    }

    /// Returns a fixture over a copy of this fixture's blocks.
    pub fn fork(&self, chunker: Arc<dyn Chunker>) -> Self {
        let blocks = Arc::new(self.blocks.fork());
        let store = ChunkyStore::new(chunker, Arc::new(Blake3Codec), blocks.clone());
        Self { blocks, store }
    }

    /// Persists a snapshot's blocks.
    pub async fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.blocks.put_all(&snapshot.blocks).await?;
        info!(
            root = %snapshot.root,
            blocks = snapshot.blocks.len(),
            stored = self.blocks.len(),
            "Persisted snapshot"
        );
        Ok(())
    }

    /// Chunks `buf` and persists the result.
    pub async fn create(&self, buf: &[u8]) -> Result<Snapshot, StoreError> {
        let snapshot = self.store.create(buf).await?;
        self.persist(&snapshot).await?;
        Ok(snapshot)
    }

    /// Reads `count` records starting at record `position`.
    pub async fn read_records(
        &self,
        snapshot: &Snapshot,
        position: usize,
        count: usize,
    ) -> Result<Bytes, StoreError> {
        self.store
            .read(
                &snapshot.root,
                (position * RECORD_SIZE_BYTES) as u32,
                (count * RECORD_SIZE_BYTES) as u32,
            )
            .await
    }
}
