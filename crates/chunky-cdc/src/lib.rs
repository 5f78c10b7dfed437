//! Chunky CDC - content-defined chunkers for the chunky store.
//!
//! A chunker turns a byte buffer into ascending cut offsets. Each offset is the
//! exclusive end of one chunk and the start of the next; the last offset equals
//! the buffer length and an empty buffer yields no offsets.
//!
//! Content-defined boundaries localize changes: modifying one region affects
//! only adjacent chunks while preserving chunk identity elsewhere, which is what
//! lets the store reuse untouched chunks across mutations.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod buzhash;
mod fastcdc;
mod gear;

pub use buzhash::{Buzhash, BuzhashParams, BUZHASH_TABLE};
pub use fastcdc::{ChunkingParams, FastCdc};
pub use gear::{gear_table, GearTable, GEAR_TABLE};

use thiserror::Error;

/// Chunk size parameters.
pub mod params {
    /// Default FastCDC average chunk size: 32 KiB
    pub const FASTCDC_AVG_SIZE_DEFAULT: usize = 32768;

    /// Smallest accepted FastCDC average chunk size
    pub const FASTCDC_AVG_SIZE_MIN: usize = 64;

    /// Default Buzhash mask width in bits (average chunk ~16 KiB)
    pub const BUZHASH_MASK_BITS_DEFAULT: u32 = 14;

    /// Buzhash rolling window in bytes
    pub const BUZHASH_WINDOW_SIZE: usize = 48;
}

/// Errors from chunker construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkerError {
    /// Parameters outside the supported range
    #[error("Invalid chunker parameters: {0}")]
    InvalidParams(String),
}

/// A content-defined chunking algorithm.
///
/// Implementations must be deterministic: identical bytes yield identical cuts.
/// Buffers longer than `u32::MAX` bytes are outside the contract.
pub trait Chunker: Send + Sync {
    /// Returns ascending exclusive cut offsets; the last one equals `data.len()`.
    fn chunk(&self, data: &[u8]) -> Vec<u32>;
}

impl<F> Chunker for F
where
    F: Fn(&[u8]) -> Vec<u32> + Send + Sync,
{
    fn chunk(&self, data: &[u8]) -> Vec<u32> {
        self(data)
    }
}

/// Splits data into fixed-size pieces.
///
/// Not content-defined; useful as a baseline and in tests that need
/// predictable boundaries.
#[derive(Debug, Clone, Copy)]
pub struct FixedSize {
    size: usize,
}

impl FixedSize {
    /// Creates a fixed-size chunker.
    pub fn new(size: usize) -> Result<Self, ChunkerError> {
        if size == 0 {
            return Err(ChunkerError::InvalidParams("chunk size must be positive".into()));
        }
        Ok(Self { size })
    }
}

impl Chunker for FixedSize {
    fn chunk(&self, data: &[u8]) -> Vec<u32> {
        let mut cuts = Vec::with_capacity(data.len().div_ceil(self.size));
        let mut end = 0usize;
        while end < data.len() {
            end = (end + self.size).min(data.len());
            cuts.push(end as u32);
        }
        cuts
    }
}
