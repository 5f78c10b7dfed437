//! Gear table for the FastCDC rolling hash.
//!
//! Entries are derived from BLAKE3 under a fixed domain so that every build
//! produces the same table and therefore the same chunk boundaries.

use std::sync::LazyLock;

use chunky_core::hash::blake3_hash_with_domain;

/// Domain prefix for gear table derivation.
pub const GEAR_DOMAIN: &[u8] = b"chunky/v1/gear";

/// Type alias for the gear table.
pub type GearTable = [u64; 256];

/// Pre-computed gear table (computed once at runtime).
pub static GEAR_TABLE: LazyLock<GearTable> = LazyLock::new(gear_table);

/// Generates the gear table.
///
/// For each byte value 0-255, computes BLAKE3 of the domain followed by that
/// byte and takes the first 8 bytes as a little-endian u64.
pub fn gear_table() -> GearTable {
    derive_table(GEAR_DOMAIN)
}

/// Derives a 256-entry table of pseudo-random words from a domain prefix.
pub(crate) fn derive_table(domain: &[u8]) -> [u64; 256] {
    let mut table = [0u64; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let hash = blake3_hash_with_domain(domain, &[i as u8]);
        let mut word = [0u8; 8];
        word.copy_from_slice(&hash[..8]);
        *entry = u64::from_le_bytes(word);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gear_table_derivation() {
        let table = gear_table();

        for i in 0..256 {
            let hash = blake3_hash_with_domain(GEAR_DOMAIN, &[i as u8]);
            let expected = u64::from_le_bytes([
                hash[0], hash[1], hash[2], hash[3], hash[4], hash[5], hash[6], hash[7],
            ]);
            assert_eq!(table[i], expected, "GEAR[{}] derivation mismatch", i);
        }
    }

    #[test]
    fn test_gear_table_uniqueness() {
        let mut values: Vec<u64> = gear_table().to_vec();
        values.sort();
        values.dedup();
        assert_eq!(values.len(), 256, "Duplicate gear values found");
    }

    #[test]
    fn test_lazy_static_table() {
        let fresh = gear_table();
        assert_eq!(*GEAR_TABLE, fresh);
    }

    #[test]
    fn test_domains_differ() {
        assert_ne!(derive_table(GEAR_DOMAIN), derive_table(b"other"));
    }
}
