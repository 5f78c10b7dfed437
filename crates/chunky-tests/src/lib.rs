//! Integration tests for the chunky store.
//!
//! This crate provides:
//! - A test fixture binding a block store, codec and chunker
//! - Deterministic record-oriented demo data
//! - Integration tests for create, read, append, update, remove and bulk

pub mod harness;
pub mod records;

pub use harness::TestFixture;
pub use records::{DemoRecords, RECORD_SIZE_BYTES};
