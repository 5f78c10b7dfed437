//! Buzhash chunking.
//!
//! Cyclic-polynomial rolling hash over a fixed window. A cut is placed after
//! byte `i` when the low `mask_bits` bits of the window hash are zero, subject
//! to minimum and maximum chunk sizes.

use std::sync::LazyLock;

use crate::gear::derive_table;
use crate::params::{BUZHASH_MASK_BITS_DEFAULT, BUZHASH_WINDOW_SIZE};
use crate::{Chunker, ChunkerError};

/// Domain prefix for Buzhash table derivation.
pub const BUZHASH_DOMAIN: &[u8] = b"chunky/v1/buzhash";

/// Pre-computed Buzhash substitution table.
pub static BUZHASH_TABLE: LazyLock<[u64; 256]> = LazyLock::new(|| derive_table(BUZHASH_DOMAIN));

/// Buzhash parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuzhashParams {
    /// Boundary mask width; average chunk size is about `2^mask_bits`
    pub mask_bits: u32,
    /// Minimum chunk size in bytes
    pub min_size: usize,
    /// Maximum chunk size in bytes
    pub max_size: usize,
    /// Rolling window in bytes
    pub window_size: usize,
}

impl BuzhashParams {
    /// Derives parameters from a mask width.
    ///
    /// `min = 2^(bits-2)`, `max = 2^(bits+2)`.
    pub fn with_mask_bits(mask_bits: u32) -> Result<Self, ChunkerError> {
        if !(8..=30).contains(&mask_bits) {
            return Err(ChunkerError::InvalidParams(format!(
                "mask bits {} outside 8..=30",
                mask_bits
            )));
        }
        Ok(Self {
            mask_bits,
            min_size: 1 << (mask_bits - 2),
            max_size: 1 << (mask_bits + 2),
            window_size: BUZHASH_WINDOW_SIZE,
        })
    }

    fn mask(&self) -> u64 {
        (1u64 << self.mask_bits) - 1
    }
}

impl Default for BuzhashParams {
    fn default() -> Self {
        Self {
            mask_bits: BUZHASH_MASK_BITS_DEFAULT,
            min_size: 1 << (BUZHASH_MASK_BITS_DEFAULT - 2),
            max_size: 1 << (BUZHASH_MASK_BITS_DEFAULT + 2),
            window_size: BUZHASH_WINDOW_SIZE,
        }
    }
}

/// Buzhash chunker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Buzhash {
    params: BuzhashParams,
}

impl Buzhash {
    /// Creates a chunker with the given parameters.
    ///
    /// The minimum size must cover the window so that every eligible cut
    /// position hashes bytes of the current chunk only.
    pub fn new(params: BuzhashParams) -> Result<Self, ChunkerError> {
        if params.window_size == 0 || params.window_size > 64 {
            return Err(ChunkerError::InvalidParams(format!(
                "window size {} outside 1..=64",
                params.window_size
            )));
        }
        if params.min_size < params.window_size || params.max_size < params.min_size {
            return Err(ChunkerError::InvalidParams(format!(
                "sizes min={} max={} invalid for window {}",
                params.min_size, params.max_size, params.window_size
            )));
        }
        Ok(Self { params })
    }

    /// Creates a chunker with the given mask width.
    pub fn with_mask_bits(mask_bits: u32) -> Result<Self, ChunkerError> {
        Self::new(BuzhashParams::with_mask_bits(mask_bits)?)
    }

    /// Returns the parameters.
    pub fn params(&self) -> &BuzhashParams {
        &self.params
    }

    fn next_cut(&self, data: &[u8], pos: usize) -> usize {
        let params = &self.params;
        let table = &*BUZHASH_TABLE;
        let window = params.window_size;
        let mask = params.mask();
        let end = (pos + params.max_size).min(data.len());

        let mut hash = 0u64;
        for i in pos..end {
            hash = hash.rotate_left(1) ^ table[data[i] as usize];
            if i - pos >= window {
                hash ^= table[data[i - window] as usize].rotate_left(window as u32);
            }
            if i + 1 - pos >= params.min_size && hash & mask == 0 {
                return i + 1;
            }
        }
        end
    }
}

impl Chunker for Buzhash {
    fn chunk(&self, data: &[u8]) -> Vec<u32> {
        let mut cuts = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            pos = self.next_cut(data, pos);
            cuts.push(pos as u32);
        }
        cuts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    fn random_data(len: usize, seed: u64) -> Vec<u8> {
        let mut data = vec![0u8; len];
        StdRng::seed_from_u64(seed).fill_bytes(&mut data);
        data
    }

    #[test]
    fn test_empty_data() {
        assert!(Buzhash::default().chunk(&[]).is_empty());
    }

    #[test]
    fn test_cut_contract() {
        let chunker = Buzhash::with_mask_bits(9).unwrap();
        let data = random_data(30_000, 1);
        let cuts = chunker.chunk(&data);

        assert_eq!(*cuts.last().unwrap() as usize, data.len());
        let mut prev = 0;
        for (i, &cut) in cuts.iter().enumerate() {
            let size = (cut - prev) as usize;
            assert!(size <= chunker.params().max_size);
            if i + 1 < cuts.len() {
                assert!(size >= chunker.params().min_size);
            }
            prev = cut;
        }
    }

    #[test]
    fn test_rolling_hash_is_windowed() {
        // A cut depends only on the window ending at it, so two buffers that
        // share a long suffix rediscover the same cuts inside it.
        let chunker = Buzhash::with_mask_bits(9).unwrap();
        let tail = random_data(20_000, 2);

        let mut a = random_data(1_000, 3);
        a.extend_from_slice(&tail);
        let mut b = random_data(1_700, 4);
        b.extend_from_slice(&tail);

        let ends_a: Vec<usize> = chunker
            .chunk(&a)
            .iter()
            .map(|&c| a.len() - c as usize)
            .collect();
        let ends_b: Vec<usize> = chunker
            .chunk(&b)
            .iter()
            .map(|&c| b.len() - c as usize)
            .collect();

        let shared = ends_a.iter().filter(|e| ends_b.contains(e)).count();
        assert!(shared * 2 > ends_a.len(), "only {} shared cuts", shared);
    }

    #[test]
    fn test_params_validation() {
        assert!(Buzhash::with_mask_bits(7).is_err());
        assert!(Buzhash::with_mask_bits(31).is_err());
        assert!(Buzhash::new(BuzhashParams {
            mask_bits: 10,
            min_size: 16,
            max_size: 4096,
            window_size: 48,
        })
        .is_err());
    }

    #[test]
    fn test_determinism() {
        let chunker = Buzhash::default();
        let data = random_data(100_000, 9);
        assert_eq!(chunker.chunk(&data), chunker.chunk(&data));
    }
}
