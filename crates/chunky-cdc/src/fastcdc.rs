//! FastCDC chunking algorithm.
//!
//! Content-defined chunking based on FastCDC: a gear rolling hash with
//! normalized chunking (a strict mask before the average size, a loose mask
//! after it) bounded by minimum and maximum chunk sizes.

use crate::gear::GEAR_TABLE;
use crate::params::{FASTCDC_AVG_SIZE_DEFAULT, FASTCDC_AVG_SIZE_MIN};
use crate::{Chunker, ChunkerError};

/// Parameters for the chunking algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingParams {
    /// Minimum chunk size in bytes
    pub min_size: usize,
    /// Maximum chunk size in bytes
    pub max_size: usize,
    /// Target average chunk size
    pub avg_size: usize,
    /// Mask for positions before average
    pub mask_s: u64,
    /// Mask for positions at/after average
    pub mask_l: u64,
}

impl ChunkingParams {
    /// Derives parameters from a target average size.
    ///
    /// `min = avg / 2`, `max = avg * 2`; masks carry one bit more (before the
    /// average) and one bit less (after it) than `log2(avg)`.
    pub fn with_avg_size(avg_size: usize) -> Result<Self, ChunkerError> {
        if avg_size < FASTCDC_AVG_SIZE_MIN {
            return Err(ChunkerError::InvalidParams(format!(
                "average size {} below minimum {}",
                avg_size, FASTCDC_AVG_SIZE_MIN
            )));
        }
        let max_size = avg_size.checked_mul(2).ok_or_else(|| {
            ChunkerError::InvalidParams(format!("average size {} too large", avg_size))
        })?;
        let bits = usize::BITS - 1 - avg_size.leading_zeros();
        if bits >= 62 {
            return Err(ChunkerError::InvalidParams(format!(
                "average size {} too large",
                avg_size
            )));
        }

        Ok(Self {
            min_size: avg_size / 2,
            max_size,
            avg_size,
            mask_s: (1u64 << (bits + 1)) - 1,
            mask_l: (1u64 << (bits - 1)) - 1,
        })
    }
}

impl Default for ChunkingParams {
    fn default() -> Self {
        let bits = usize::BITS - 1 - FASTCDC_AVG_SIZE_DEFAULT.leading_zeros();
        Self {
            min_size: FASTCDC_AVG_SIZE_DEFAULT / 2,
            max_size: FASTCDC_AVG_SIZE_DEFAULT * 2,
            avg_size: FASTCDC_AVG_SIZE_DEFAULT,
            mask_s: (1u64 << (bits + 1)) - 1,
            mask_l: (1u64 << (bits - 1)) - 1,
        }
    }
}

/// FastCDC chunker.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastCdc {
    params: ChunkingParams,
}

impl FastCdc {
    /// Creates a chunker with the given parameters.
    ///
    /// `max_size` and `avg_size` must be positive and `min_size <= max_size`.
    pub fn new(params: ChunkingParams) -> Result<Self, ChunkerError> {
        if params.max_size == 0 || params.avg_size == 0 {
            return Err(ChunkerError::InvalidParams(format!(
                "sizes avg={} max={} must be positive",
                params.avg_size, params.max_size
            )));
        }
        if params.min_size > params.max_size {
            return Err(ChunkerError::InvalidParams(format!(
                "min size {} exceeds max size {}",
                params.min_size, params.max_size
            )));
        }
        Ok(Self { params })
    }

    /// Creates a chunker targeting `avg_size` bytes per chunk.
    pub fn with_avg_size(avg_size: usize) -> Result<Self, ChunkerError> {
        Self::new(ChunkingParams::with_avg_size(avg_size)?)
    }

    /// Returns the chunking parameters.
    pub fn params(&self) -> &ChunkingParams {
        &self.params
    }

    /// Finds the end of the chunk starting at `pos`.
    fn next_cut(&self, data: &[u8], pos: usize) -> usize {
        let params = &self.params;

        // Remaining data at or below min_size is emitted as the final chunk
        if data.len() - pos <= params.min_size {
            return data.len();
        }

        let gear = &*GEAR_TABLE;
        let mut hash = 0u64;
        let search_start = pos + params.min_size;
        let search_end = (pos + params.max_size).min(data.len());

        for i in search_start..search_end {
            hash = (hash << 1).wrapping_add(gear[data[i] as usize]);

            let mask = if i - pos < params.avg_size {
                params.mask_s
            } else {
                params.mask_l
            };

            if hash & mask == 0 {
                return i + 1;
            }
        }

        // Force a cut at max_size
        search_end
    }
}

impl Chunker for FastCdc {
    fn chunk(&self, data: &[u8]) -> Vec<u32> {
        let mut cuts = Vec::with_capacity(data.len() / self.params.avg_size + 1);
        let mut pos = 0;
        while pos < data.len() {
            pos = self.next_cut(data, pos);
            cuts.push(pos as u32);
        }
        cuts
    }
}
