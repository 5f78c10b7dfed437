//! RocksDB persistence integration tests.
//!
//! Tests for:
//! - Full create, mutate and read cycles over a RocksDB block store
//! - Reading snapshots back after the database is reopened

use std::sync::Arc;

use chunky_cdc::FastCdc;
use chunky_store::{
    Blake3Codec, BlockPut, ChunkyStore, RocksBlockStore, Snapshot, StoreConfig, StoreError,
};
use chunky_tests::harness::FIXTURE_AVG_SIZE;
use chunky_tests::records::{record_offset, split_records};
use chunky_tests::{DemoRecords, RECORD_SIZE_BYTES};
use tempfile::TempDir;

/// Initialize tracing for tests.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("chunky_tests=debug,chunky_store=debug")
        .with_test_writer()
        .try_init();
}

fn rocks_store(blocks: Arc<RocksBlockStore>) -> ChunkyStore {
    ChunkyStore::new(
        Arc::new(FastCdc::with_avg_size(FIXTURE_AVG_SIZE).unwrap()),
        Arc::new(Blake3Codec),
        blocks,
    )
}

async fn persist(blocks: &RocksBlockStore, snapshot: &Snapshot) -> Result<(), StoreError> {
    blocks.put_all(&snapshot.blocks).await
}

#[tokio::test]
async fn test_rocks_full_cycle() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    let blocks = Arc::new(RocksBlockStore::open(dir.path()).unwrap());
    let store = rocks_store(blocks.clone());

    let demo = DemoRecords::generate(500, 400);
    let created = store.create(&demo.buf).await.unwrap();
    persist(&blocks, &created).await.unwrap();
    assert!(blocks.contains(&created.root).unwrap());

    let extra = DemoRecords::generate(50, 401);
    let appended = store.append(&created.root, &extra.buf).await.unwrap();
    persist(&blocks, &appended).await.unwrap();

    let patch = DemoRecords::generate(10, 402);
    let updated = store
        .update(&appended.root, &patch.buf, record_offset(200))
        .await
        .unwrap();
    persist(&blocks, &updated).await.unwrap();

    let removed = store
        .remove(&updated.root, record_offset(0), (5 * RECORD_SIZE_BYTES) as u32)
        .await
        .unwrap();
    persist(&blocks, &removed).await.unwrap();

    let mut expected = demo.records.clone();
    expected.extend(extra.records.iter().cloned());
    expected.splice(200..210, patch.records.iter().cloned());
    expected.drain(0..5);

    let after = store.read_all(&removed.root).await.unwrap();
    assert_eq!(split_records(&after), expected);

    // Every snapshot stays readable
    let first = store.read_all(&created.root).await.unwrap();
    assert_eq!(&first[..], &demo.buf[..]);

    let stats = blocks.stats();
    assert!(stats.hits > 0);
    assert!(stats.blocks_stored as usize >= blocks.len().unwrap());
}

#[tokio::test]
async fn test_rocks_reopen() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    let demo = DemoRecords::generate(300, 410);

    let root = {
        let blocks = Arc::new(RocksBlockStore::open(dir.path()).unwrap());
        let store = rocks_store(blocks.clone());
        let created = store.create(&demo.buf).await.unwrap();
        persist(&blocks, &created).await.unwrap();
        created.root
    };

    let blocks = Arc::new(RocksBlockStore::open(dir.path()).unwrap());
    let store = rocks_store(blocks.clone());

    let index = store.read_index(&root).await.unwrap();
    assert_eq!(index.byte_array_size() as usize, demo.buf.len());

    let middle = store
        .read(&root, record_offset(100), (10 * RECORD_SIZE_BYTES) as u32)
        .await
        .unwrap();
    assert_eq!(split_records(&middle), &demo.records[100..110]);
}

#[tokio::test]
async fn test_rocks_from_config() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    let config = StoreConfig::new(dir.path().to_path_buf());
    config.create_dirs().unwrap();

    let blocks = Arc::new(RocksBlockStore::open(&config.blocks_path()).unwrap());
    let store = ChunkyStore::from_config(&config, Arc::new(Blake3Codec), blocks.clone()).unwrap();

    let demo = DemoRecords::generate(100, 420);
    let created = store.create(&demo.buf).await.unwrap();
    persist(&blocks, &created).await.unwrap();

    let all = store.read_all(&created.root).await.unwrap();
    assert_eq!(&all[..], &demo.buf[..]);
}

#[tokio::test]
async fn test_rocks_missing_root() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    let blocks = Arc::new(RocksBlockStore::open(dir.path()).unwrap());
    let store = rocks_store(blocks);

    let created = store.create(b"not persisted").await.unwrap();
    assert!(matches!(
        store.read_index(&created.root).await,
        Err(StoreError::NotFound(_))
    ));
}
