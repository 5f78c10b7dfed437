//! Blocks and block access.
//!
//! A block is an immutable `(Cid, bytes)` pair. Data chunks and serialized
//! indexes are both blocks. The engine only ever reads blocks through
//! [`BlockGet`]; persisting the blocks it returns is up to the caller via
//! [`BlockPut`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chunky_core::Cid;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::StoreError;

/// A content-identified block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Content identifier
    pub cid: Cid,
    /// Payload
    pub bytes: Bytes,
}

impl Block {
    /// Creates a new block.
    pub fn new(cid: Cid, bytes: impl Into<Bytes>) -> Self {
        Self {
            cid,
            bytes: bytes.into(),
        }
    }

    /// Returns the payload length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Read access to stored blocks.
#[async_trait]
pub trait BlockGet: Send + Sync {
    /// Fetches a block payload; `StoreError::NotFound` if absent.
    async fn get(&self, cid: &Cid) -> Result<Bytes, StoreError>;
}

/// Write access to a block store.
#[async_trait]
pub trait BlockPut: Send + Sync {
    /// Persists a block. Storing the same block twice is harmless.
    async fn put(&self, block: &Block) -> Result<(), StoreError>;

    /// Persists every block in order.
    async fn put_all(&self, blocks: &[Block]) -> Result<(), StoreError> {
        for block in blocks {
            self.put(block).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T: BlockGet + ?Sized> BlockGet for Arc<T> {
    async fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        (**self).get(cid).await
    }
}

#[async_trait]
impl<T: BlockPut + ?Sized> BlockPut for Arc<T> {
    async fn put(&self, block: &Block) -> Result<(), StoreError> {
        (**self).put(block).await
    }
}

/// Statistics for a block store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockStoreStats {
    /// Total put calls
    pub blocks_stored: u64,
    /// Total bytes passed to put
    pub bytes_stored: u64,
    /// Successful gets
    pub hits: u64,
    /// Gets for absent blocks
    pub misses: u64,
}

/// In-memory block store.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<Cid, Bytes>>,
    stats: RwLock<BlockStoreStats>,
}

impl MemoryBlockStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an independent store holding a copy of this store's blocks.
    pub fn fork(&self) -> Self {
        Self {
            blocks: RwLock::new(self.blocks.read().clone()),
            stats: RwLock::new(BlockStoreStats::default()),
        }
    }

    /// Checks if a block exists.
    pub fn contains(&self, cid: &Cid) -> bool {
        self.blocks.read().contains_key(cid)
    }

    /// Returns the number of distinct blocks.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Returns true if no block is stored.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    /// Returns the total payload size of distinct blocks.
    pub fn total_size(&self) -> u64 {
        self.blocks.read().values().map(|b| b.len() as u64).sum()
    }

    /// Returns store statistics.
    pub fn stats(&self) -> BlockStoreStats {
        self.stats.read().clone()
    }
}

#[async_trait]
impl BlockGet for MemoryBlockStore {
    async fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        let found = self.blocks.read().get(cid).cloned();
        match found {
            Some(bytes) => {
                self.stats.write().hits += 1;
                Ok(bytes)
            }
            None => {
                self.stats.write().misses += 1;
                Err(StoreError::NotFound(cid.clone()))
            }
        }
    }
}

#[async_trait]
impl BlockPut for MemoryBlockStore {
    async fn put(&self, block: &Block) -> Result<(), StoreError> {
        self.blocks
            .write()
            .insert(block.cid.clone(), block.bytes.clone());

        {
            let mut stats = self.stats.write();
            stats.blocks_stored += 1;
            stats.bytes_stored += block.len() as u64;
        }

        trace!(cid = %block.cid, size = block.len(), "Stored block");
        Ok(())
    }
}

/// Blocks produced earlier in a bulk call, layered over the caller's getter.
///
/// Later steps of a bulk operation read chunks that earlier steps created
/// but the caller has not persisted yet.
pub(crate) struct Overlay<'a> {
    inner: &'a dyn BlockGet,
    pending: HashMap<Cid, Bytes>,
}

impl<'a> Overlay<'a> {
    pub(crate) fn new(inner: &'a dyn BlockGet) -> Self {
        Self {
            inner,
            pending: HashMap::new(),
        }
    }

    pub(crate) fn extend(&mut self, blocks: &[Block]) {
        for block in blocks {
            self.pending.insert(block.cid.clone(), block.bytes.clone());
        }
        debug!(pending = self.pending.len(), "Extended bulk overlay");
    }
}

#[async_trait]
impl BlockGet for Overlay<'_> {
    async fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        if let Some(bytes) = self.pending.get(cid) {
            return Ok(bytes.clone());
        }
        self.inner.get(cid).await
    }
}
