//! BLAKE3 hashing.
//!
//! BLAKE3 in default mode with 256-bit output backs the reference content
//! identifiers and the chunker lookup tables.

/// Computes BLAKE3 hash in default mode with 256-bit output.
///
/// # Example
/// ```
/// use chunky_core::hash::blake3_hash;
///
/// let hash = blake3_hash(&[]);
/// let expected = hex::decode("af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262").unwrap();
/// assert_eq!(hash.as_slice(), expected.as_slice());
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hashes `data` under a domain separation prefix.
pub fn blake3_hash_with_domain(domain: &[u8], data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_conformance_anchors() {
        assert_eq!(
            hex::encode(blake3_hash(&[])),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
        assert_eq!(
            hex::encode(blake3_hash(&[0x00])),
            "2d3adedff11b61f14c886e35afa036736dcd87a74d27b5c1510225d0f592e213"
        );
        assert_eq!(
            hex::encode(blake3_hash(&[0xFF])),
            "99d44d377bc5936d8cb7f5df90713d84c7587739b4724d3d2f9af1ee0e4c8efd"
        );
    }

    #[test]
    fn test_domain_separation() {
        let plain = blake3_hash(b"chunky");
        let domained = blake3_hash_with_domain(b"buzhash", b"chunky");
        assert_ne!(plain, domained);
        assert_eq!(domained, blake3_hash(b"buzhashchunky"));
    }
}
