//! Persistent block storage.
//!
//! Stores blocks in a RocksDB column family keyed by identifier bytes.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chunky_core::Cid;
use parking_lot::RwLock;
use rocksdb::{ColumnFamily, IteratorMode, Options, WriteBatch, DB};
use tracing::{debug, trace};

use crate::block::{Block, BlockGet, BlockPut, BlockStoreStats};
use crate::StoreError;

/// Column family name for blocks.
const BLOCKS_CF: &str = "blocks";

fn db_err(e: rocksdb::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Block store backed by RocksDB.
pub struct RocksBlockStore {
    db: Arc<DB>,
    stats: RwLock<BlockStoreStats>,
}

impl RocksBlockStore {
    /// Opens or creates a block store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        // Reads are random point lookups
        opts.set_allow_concurrent_memtable_write(true);
        opts.set_enable_write_thread_adaptive_yield(true);

        let db = DB::open_cf(&opts, path, [BLOCKS_CF]).map_err(db_err)?;
        debug!(path = %path.display(), "Opened block store");

        Ok(Self::with_db(Arc::new(db)))
    }

    /// Wraps an existing DB instance that has a `blocks` column family.
    pub fn with_db(db: Arc<DB>) -> Self {
        Self {
            db,
            stats: RwLock::new(BlockStoreStats::default()),
        }
    }

    fn cf(&self) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(BLOCKS_CF)
            .ok_or_else(|| StoreError::Database("Missing blocks column family".to_string()))
    }

    /// Checks if a block exists.
    pub fn contains(&self, cid: &Cid) -> Result<bool, StoreError> {
        let cf = self.cf()?;
        self.db
            .get_pinned_cf(cf, cid.as_bytes())
            .map(|v| v.is_some())
            .map_err(db_err)
    }

    /// Returns the number of stored blocks.
    ///
    /// Walks the whole column family.
    pub fn len(&self) -> Result<usize, StoreError> {
        let cf = self.cf()?;
        let mut count = 0;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item.map_err(db_err)?;
            count += 1;
        }
        Ok(count)
    }

    /// Returns true if no block is stored.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        let cf = self.cf()?;
        match self.db.iterator_cf(cf, IteratorMode::Start).next() {
            Some(item) => item.map(|_| false).map_err(db_err),
            None => Ok(true),
        }
    }

    /// Returns store statistics.
    pub fn stats(&self) -> BlockStoreStats {
        self.stats.read().clone()
    }
}

#[async_trait]
impl BlockGet for RocksBlockStore {
    async fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        let cf = self.cf()?;
        match self.db.get_cf(cf, cid.as_bytes()).map_err(db_err)? {
            Some(value) => {
                self.stats.write().hits += 1;
                Ok(Bytes::from(value))
            }
            None => {
                self.stats.write().misses += 1;
                Err(StoreError::NotFound(cid.clone()))
            }
        }
    }
}

#[async_trait]
impl BlockPut for RocksBlockStore {
    async fn put(&self, block: &Block) -> Result<(), StoreError> {
        let cf = self.cf()?;
        self.db
            .put_cf(cf, block.cid.as_bytes(), &block.bytes)
            .map_err(db_err)?;

        {
            let mut stats = self.stats.write();
            stats.blocks_stored += 1;
            stats.bytes_stored += block.len() as u64;
        }

        trace!(cid = %block.cid, size = block.len(), "Stored block");
        Ok(())
    }

    async fn put_all(&self, blocks: &[Block]) -> Result<(), StoreError> {
        let cf = self.cf()?;
        let mut batch = WriteBatch::default();
        for block in blocks {
            batch.put_cf(cf, block.cid.as_bytes(), &block.bytes);
        }
        self.db.write(batch).map_err(db_err)?;

        {
            let mut stats = self.stats.write();
            stats.blocks_stored += blocks.len() as u64;
            stats.bytes_stored += blocks.iter().map(|b| b.len() as u64).sum::<u64>();
        }

        debug!(count = blocks.len(), "Stored block batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn block(data: &[u8]) -> Block {
        Block::new(Cid::for_content(data), data.to_vec())
    }

    #[tokio::test]
    async fn test_rocks_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = RocksBlockStore::open(dir.path()).unwrap();

        let b = block(&[0xAA; 100]);
        store.put(&b).await.unwrap();

        assert_eq!(store.get(&b.cid).await.unwrap(), b.bytes);
        assert!(store.contains(&b.cid).unwrap());
        assert!(!store.contains(&Cid::for_content(b"other")).unwrap());
    }

    #[tokio::test]
    async fn test_rocks_store_not_found() {
        let dir = TempDir::new().unwrap();
        let store = RocksBlockStore::open(dir.path()).unwrap();

        let cid = Cid::for_content(b"absent");
        assert!(matches!(store.get(&cid).await, Err(StoreError::NotFound(c)) if c == cid));
    }

    #[tokio::test]
    async fn test_rocks_store_stats() {
        let dir = TempDir::new().unwrap();
        let store = RocksBlockStore::open(dir.path()).unwrap();

        let b = block(b"stats block");
        store.put(&b).await.unwrap();
        store.get(&b.cid).await.unwrap();
        let _ = store.get(&Cid::for_content(b"miss")).await;

        let stats = store.stats();
        assert_eq!(stats.blocks_stored, 1);
        assert_eq!(stats.bytes_stored, 11);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_rocks_store_batch() {
        let dir = TempDir::new().unwrap();
        let store = RocksBlockStore::open(dir.path()).unwrap();
        assert!(store.is_empty().unwrap());

        let blocks: Vec<Block> = (0..100u8).map(|i| block(&vec![i; 100 + i as usize])).collect();
        store.put_all(&blocks).await.unwrap();

        assert_eq!(store.len().unwrap(), 100);
        for (i, b) in blocks.iter().enumerate() {
            assert_eq!(store.get(&b.cid).await.unwrap().len(), 100 + i);
        }
    }

    #[tokio::test]
    async fn test_rocks_store_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        let b = block(&[0x42; 64]);

        {
            let store = RocksBlockStore::open(&path).unwrap();
            store.put(&b).await.unwrap();
        }

        // Reopen store
        {
            let store = RocksBlockStore::open(&path).unwrap();
            assert_eq!(store.get(&b.cid).await.unwrap(), b.bytes);
        }
    }
}
