//! Chunky Store - content-defined chunking byte-array store.
//!
//! Partitions a byte buffer into content-addressed chunks and keeps a flat
//! binary index from byte offsets to chunk identifiers. On top of the index it
//! provides:
//! - Random-access reads of any byte range
//! - Append, in-place update and byte-range removal that re-chunk only the
//!   affected region and reuse every other chunk
//! - Bulk transactions combining one append with a sequence of updates
//!
//! Every operation returns a [`Snapshot`]: the new root, the new index and the
//! blocks the caller must persist before dereferencing the root.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod block;
pub mod codec;
pub mod config;
pub mod create;
pub mod index;
pub mod mutate;
pub mod read;
pub mod resolve;
pub mod rocks;
pub mod store;

pub use block::{Block, BlockGet, BlockPut, BlockStoreStats, MemoryBlockStore};
pub use codec::{Blake3Codec, Codec};
pub use config::{ChunkerConfig, StoreConfig};
pub use index::{ChunkIndex, IndexEntry, IndexSource, Snapshot};
pub use mutate::Update;
pub use resolve::{relevant_chunks, ChunkRole, Overlap};
pub use rocks::RocksBlockStore;
pub use store::ChunkyStore;

pub use chunky_cdc::Chunker;
pub use chunky_core::Cid;

use chunky_core::{CidError, DecodeError, EncodingError};
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested range exceeds the byte array
    #[error("Range out of bounds: [{start}, {end}) exceeds byte array size {size}")]
    Range {
        /// Range start
        start: u64,
        /// Range end (exclusive)
        end: u64,
        /// Byte array size
        size: u32,
    },

    /// Codec returned an identifier of unexpected length
    #[error("Invalid identifier size: expected {expected} bytes, got {actual}")]
    InvalidIdentifierSize {
        /// Expected identifier length
        expected: usize,
        /// Returned identifier length
        actual: usize,
    },

    /// Index buffer is not a supported index structure
    #[error("Invalid index format: {0}")]
    Format(String),

    /// Block not found
    #[error("Block not found: {0}")]
    NotFound(Cid),

    /// Internal offset arithmetic invariant violated
    #[error("Invalid checksum: {checksum} != {expected}")]
    Checksum {
        /// Computed value
        checksum: u64,
        /// Expected value
        expected: u64,
    },

    /// Value does not fit the u32 wire range
    #[error("Integer out of range: {0}")]
    IntegerRange(u64),

    /// Chunker output violates the cut-offset contract
    #[error("Invalid chunking: {0}")]
    InvalidChunking(String),

    /// Stored block length differs from its indexed span
    #[error("Corrupt chunk {cid}: expected {expected} bytes, got {actual}")]
    CorruptChunk {
        /// Chunk identifier
        cid: Cid,
        /// Span length in the index
        expected: usize,
        /// Fetched block length
        actual: usize,
    },

    /// Identifier bytes failed to parse
    #[error("Invalid CID: {0}")]
    InvalidCid(#[from] CidError),

    /// RocksDB error
    #[error("Database error: {0}")]
    Database(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<EncodingError> for StoreError {
    fn from(err: EncodingError) -> Self {
        match err {
            EncodingError::IntegerRange(value) => StoreError::IntegerRange(value),
        }
    }
}

impl From<DecodeError> for StoreError {
    fn from(err: DecodeError) -> Self {
        StoreError::Format(err.to_string())
    }
}

impl From<chunky_cdc::ChunkerError> for StoreError {
    fn from(err: chunky_cdc::ChunkerError) -> Self {
        StoreError::Config(err.to_string())
    }
}
