//! Content identifier encoding.
//!
//! The engine turns chunk bytes and index buffers into identifiers through a
//! [`Codec`]. Identifiers written into the index must be exactly
//! [`CID_SIZE`] bytes long; the engine checks every encoded identifier.

use async_trait::async_trait;
use chunky_core::wire::CID_SIZE;
use chunky_core::Cid;

use crate::StoreError;

/// Content identifier codec.
#[async_trait]
pub trait Codec: Send + Sync {
    /// Computes the identifier of `bytes`.
    async fn encode(&self, bytes: &[u8]) -> Result<Cid, StoreError>;

    /// Parses identifier bytes read from an index buffer.
    fn decode(&self, cid_bytes: &[u8]) -> Result<Cid, StoreError>;
}

/// Reference codec: CIDv1, raw codec, BLAKE3-256 multihash.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Codec;

#[async_trait]
impl Codec for Blake3Codec {
    async fn encode(&self, bytes: &[u8]) -> Result<Cid, StoreError> {
        Ok(Cid::for_content(bytes))
    }

    fn decode(&self, cid_bytes: &[u8]) -> Result<Cid, StoreError> {
        Ok(Cid::parse(cid_bytes)?)
    }
}

/// Encodes `bytes` and checks the identifier length.
pub(crate) async fn encode_checked(codec: &dyn Codec, bytes: &[u8]) -> Result<Cid, StoreError> {
    let cid = codec.encode(bytes).await?;
    if cid.len() != CID_SIZE {
        return Err(StoreError::InvalidIdentifierSize {
            expected: CID_SIZE,
            actual: cid.len(),
        });
    }
    Ok(cid)
}
