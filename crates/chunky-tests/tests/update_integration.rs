//! Update integration tests.
//!
//! Tests for:
//! - Record overwrites read back through the store
//! - Untouched records and chunks surviving an update
//! - Chunk-boundary drift against a fresh create of the same bytes

use std::collections::HashSet;

use chunky_store::StoreError;
use chunky_tests::records::{record_offset, split_records};
use chunky_tests::{DemoRecords, TestFixture};

const RECORD_COUNT: usize = 200;
const RECORD_UPDATE_POSITION: usize = 100;
const RECORD_UPDATE_COUNT: usize = 20;

/// Initialize tracing for tests.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("chunky_tests=debug,chunky_store=debug")
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn test_update_records() {
    init_tracing();

    let fixture = TestFixture::fastcdc().unwrap();
    let demo = DemoRecords::generate(RECORD_COUNT, 100);
    let original = fixture.create(&demo.buf).await.unwrap();

    let patch = DemoRecords::generate(RECORD_UPDATE_COUNT, 101);
    let updated = fixture
        .store
        .update(&original.root, &patch.buf, record_offset(RECORD_UPDATE_POSITION))
        .await
        .unwrap();
    fixture.persist(&updated).await.unwrap();

    let after = fixture.read_records(&updated, 0, RECORD_COUNT).await.unwrap();
    let mut expected = demo.records.clone();
    expected.splice(
        RECORD_UPDATE_POSITION..RECORD_UPDATE_POSITION + RECORD_UPDATE_COUNT,
        patch.records.iter().cloned(),
    );
    assert_eq!(split_records(&after), expected);
    assert_eq!(updated.index.byte_array_size(), original.index.byte_array_size());

    // The original root still reads the original records
    let before = fixture.read_records(&original, 0, RECORD_COUNT).await.unwrap();
    assert_eq!(split_records(&before), demo.records);
}

#[tokio::test]
async fn test_update_single_record() {
    init_tracing();

    let fixture = TestFixture::buzhash().unwrap();
    let demo = DemoRecords::generate(RECORD_COUNT, 110);
    let original = fixture.create(&demo.buf).await.unwrap();

    let patch = DemoRecords::generate(1, 111);
    let updated = fixture
        .store
        .update(&original.index, &patch.buf, record_offset(42))
        .await
        .unwrap();
    fixture.persist(&updated).await.unwrap();

    assert_eq!(
        fixture.read_records(&updated, 42, 1).await.unwrap(),
        patch.records[0].as_bytes()
    );
    for i in [0, 41, 43, RECORD_COUNT - 1] {
        assert_eq!(
            fixture.read_records(&updated, i, 1).await.unwrap(),
            demo.records[i].as_bytes(),
            "record {}",
            i
        );
    }
}

#[tokio::test]
async fn test_update_reuses_distant_chunks() {
    init_tracing();

    let fixture = TestFixture::fastcdc().unwrap();
    let demo = DemoRecords::generate(RECORD_COUNT * 5, 120);
    let original = fixture.create(&demo.buf).await.unwrap();

    let patch = DemoRecords::generate(2, 121);
    let updated = fixture
        .store
        .update(&original.root, &patch.buf, record_offset(500))
        .await
        .unwrap();

    let old: HashSet<_> = original.index.cids().collect();
    let fresh = updated.index.cids().filter(|c| !old.contains(c)).count();
    let shared = updated.index.index_size() - fresh;
    assert!(shared > fresh, "shared {} fresh {}", shared, fresh);

    // Fresh chunks and the root are written, distant chunks are not
    assert!(updated.blocks.len() > fresh);
    assert!(updated.blocks.len() < updated.index.index_size());
}

#[tokio::test]
async fn test_update_drift_is_bounded() {
    init_tracing();

    let fixture = TestFixture::fastcdc().unwrap();
    let demo = DemoRecords::generate(RECORD_COUNT * 5, 130);
    let original = fixture.create(&demo.buf).await.unwrap();

    let patch = DemoRecords::generate(RECORD_UPDATE_COUNT, 131);
    let updated = fixture
        .store
        .update(&original.root, &patch.buf, record_offset(RECORD_UPDATE_POSITION))
        .await
        .unwrap();
    fixture.persist(&updated).await.unwrap();

    let contents = fixture.store.read_all(&updated.root).await.unwrap();
    let recreated = fixture.store.create(&contents).await.unwrap();

    let drift = updated
        .index
        .index_size()
        .abs_diff(recreated.index.index_size());
    assert!(drift <= 4, "drift {}", drift);
}

#[tokio::test]
async fn test_update_past_end() {
    init_tracing();

    let fixture = TestFixture::fastcdc().unwrap();
    let demo = DemoRecords::generate(10, 140);
    let original = fixture.create(&demo.buf).await.unwrap();

    let patch = DemoRecords::generate(2, 141);
    assert!(matches!(
        fixture
            .store
            .update(&original.root, &patch.buf, record_offset(9))
            .await,
        Err(StoreError::Range { .. })
    ));
}
