//! Chunky Core - shared primitives for the chunky byte-array store.
//!
//! This crate provides:
//! - The index wire-format constants
//! - The `Cid` content identifier (CIDv1, raw codec, BLAKE3 multihash)
//! - Little-endian u32 encoding with range checks
//! - BLAKE3 hashing

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod encoding;
pub mod hash;
pub mod identifiers;

pub use encoding::{to_wire_u32, DecodeError, EncodingError, WireDecode, WireEncode};
pub use hash::blake3_hash;
pub use identifiers::{Cid, CidError};

/// Index wire-format constants.
///
/// ```text
/// ┌──────────────┬──────────────┬──────────────────┬──────────────────────────────┐
/// │ control (4)  │ index size(4)│ byte array size(4)│ N x [delta (4) | cid (36)]  │
/// └──────────────┴──────────────┴──────────────────┴──────────────────────────────┘
/// ```
pub mod wire {
    /// Required bits of the control flag for the relative-offset index layout.
    pub const INDEX_CONTROL_FLAG: u32 = 0b11_1100;

    /// Header size: control flag, index size, byte array size.
    pub const INDEX_HEADER_SIZE: usize = 12;

    /// Size of the relative offset field of a record.
    pub const OFFSET_FIELD_SIZE: usize = 4;

    /// Size of a chunk content identifier.
    pub const CID_SIZE: usize = 36;

    /// Size of one index record: relative offset + identifier.
    pub const INDEX_RECORD_SIZE: usize = OFFSET_FIELD_SIZE + CID_SIZE;

    /// Serialized index size for `index_size` records.
    pub const fn index_buffer_len(index_size: usize) -> usize {
        INDEX_HEADER_SIZE + index_size * INDEX_RECORD_SIZE
    }
}
