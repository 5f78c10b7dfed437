//! Content identifiers.
//!
//! A `Cid` names an immutable block by its content. The reference layout is a
//! CIDv1 with the raw codec and a BLAKE3-256 multihash:
//!
//! ```text
//! ┌─────────┬───────────┬────────────┬──────────┬─────────────────┐
//! │ ver (1) │ codec (1) │ mh code (1)│ mh len(1)│  digest (32)    │
//! │  0x01   │   0x55    │    0x1e    │   0x20   │  BLAKE3(bytes)  │
//! └─────────┴───────────┴────────────┴──────────┴─────────────────┘
//! ```
//!
//! The type itself holds arbitrary identifier bytes, since identifiers come from
//! a pluggable codec. Length checks against [`crate::wire::CID_SIZE`] happen where
//! identifiers enter the index.

use std::fmt;

use bytes::Bytes;
use thiserror::Error;

use crate::hash::blake3_hash;
use crate::wire::CID_SIZE;

/// CID version 1.
pub const CID_VERSION: u8 = 0x01;
/// Multicodec code for raw binary.
pub const RAW_CODEC: u8 = 0x55;
/// Multihash code for BLAKE3.
pub const BLAKE3_MULTIHASH: u8 = 0x1e;
/// BLAKE3 digest length.
pub const DIGEST_SIZE: usize = 32;

const PREFIX: [u8; 4] = [CID_VERSION, RAW_CODEC, BLAKE3_MULTIHASH, DIGEST_SIZE as u8];

/// Errors when parsing identifier bytes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CidError {
    /// Wrong total length
    #[error("Invalid CID length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Unsupported version, codec or multihash prefix
    #[error("Unsupported CID prefix: {0}")]
    UnsupportedPrefix(String),

    /// Invalid hex string
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Content identifier of a block.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cid(Bytes);

impl Cid {
    /// Wraps identifier bytes without validation.
    pub fn from_raw(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Computes the reference identifier (CIDv1, raw, BLAKE3) of `data`.
    pub fn for_content(data: &[u8]) -> Self {
        Self::from_digest(&blake3_hash(data))
    }

    /// Builds a reference identifier from a BLAKE3 digest.
    pub fn from_digest(digest: &[u8; DIGEST_SIZE]) -> Self {
        let mut bytes = Vec::with_capacity(CID_SIZE);
        bytes.extend_from_slice(&PREFIX);
        bytes.extend_from_slice(digest);
        Self(Bytes::from(bytes))
    }

    /// Parses and validates reference identifier bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, CidError> {
        if bytes.len() != CID_SIZE {
            return Err(CidError::InvalidLength {
                expected: CID_SIZE,
                actual: bytes.len(),
            });
        }
        if bytes[..PREFIX.len()] != PREFIX {
            return Err(CidError::UnsupportedPrefix(hex::encode(&bytes[..PREFIX.len()])));
        }
        Ok(Self(Bytes::copy_from_slice(bytes)))
    }

    /// Parses a hex string.
    pub fn from_hex(s: &str) -> Result<Self, CidError> {
        let bytes = hex::decode(s)?;
        Self::parse(&bytes)
    }

    /// Returns the identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the identifier length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the identifier has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the digest part of a reference identifier.
    pub fn digest(&self) -> Option<&[u8]> {
        (self.0.len() == CID_SIZE && self.0[..PREFIX.len()] == PREFIX)
            .then(|| &self.0[PREFIX.len()..])
    }

    /// Returns as a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self)
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 digest bytes, without the constant prefix
        let hex = self.to_hex();
        let start = if self.digest().is_some() { PREFIX.len() * 2 } else { 0 };
        let end = (start + 16).min(hex.len());
        write!(f, "{}", &hex[start..end])
    }
}

impl AsRef<[u8]> for Cid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
