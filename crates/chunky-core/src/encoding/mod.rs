//! Wire encoding for the chunk index.
//!
//! # Encoding Rules
//!
//! - **Integers**: unsigned 32-bit, little-endian
//! - **Fixed Arrays**: bytes written consecutively without length prefix
//! - **Range**: every integer must fit in `[0, 2^32 - 1]` before it is written

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Errors during wire decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not enough bytes to decode
    #[error("Insufficient bytes: expected {expected}, got {available}")]
    InsufficientBytes {
        /// Expected number of bytes
        expected: usize,
        /// Actually available bytes
        available: usize,
    },
}

/// Errors during wire encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Value does not fit an unsigned 32-bit integer
    #[error("Integer out of range: {0} does not fit in u32")]
    IntegerRange(u64),
}

/// Trait for types that have a fixed wire representation.
pub trait WireEncode {
    /// Writes the value to the buffer.
    fn encode(&self, buf: &mut BytesMut);

    /// Returns the encoded byte representation.
    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// Trait for types that can be read back from their wire representation.
pub trait WireDecode: Sized {
    /// Decodes from the front of the buffer, advancing it.
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError>;

    /// Decodes from a byte slice.
    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut buf = Bytes::copy_from_slice(bytes);
        Self::decode(&mut buf)
    }
}

/// Checks that `value` fits the u32 wire range.
pub fn to_wire_u32(value: u64) -> Result<u32, EncodingError> {
    u32::try_from(value).map_err(|_| EncodingError::IntegerRange(value))
}

fn ensure_remaining(buf: &Bytes, expected: usize) -> Result<(), DecodeError> {
    if buf.remaining() < expected {
        return Err(DecodeError::InsufficientBytes {
            expected,
            available: buf.remaining(),
        });
    }
    Ok(())
}

impl WireEncode for u32 {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(*self);
    }
}

impl WireDecode for u32 {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        ensure_remaining(buf, 4)?;
        Ok(buf.get_u32_le())
    }
}

impl<const N: usize> WireEncode for [u8; N] {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(self);
    }
}

impl<const N: usize> WireDecode for [u8; N] {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        ensure_remaining(buf, N)?;
        let mut arr = [0u8; N];
        buf.copy_to_slice(&mut arr);
        Ok(arr)
    }
}

/// Splits `len` bytes off the front of the buffer.
pub fn take_bytes(buf: &mut Bytes, len: usize) -> Result<Bytes, DecodeError> {
    ensure_remaining(buf, len)?;
    Ok(buf.split_to(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u32_encoding() {
        let encoded = 0x3Cu32.to_bytes();
        assert_eq!(encoded.to_vec(), vec![0x3C, 0x00, 0x00, 0x00]);

        let encoded = 0x0102_0304u32.to_bytes();
        assert_eq!(encoded.to_vec(), vec![0x04, 0x03, 0x02, 0x01]);
        assert_eq!(u32::from_bytes(&encoded).unwrap(), 0x0102_0304);
    }

    #[test]
    fn test_u32_max() {
        let encoded = u32::MAX.to_bytes();
        assert_eq!(encoded.to_vec(), vec![0xFF; 4]);
        assert_eq!(u32::from_bytes(&encoded).unwrap(), u32::MAX);
    }

    #[test]
    fn test_to_wire_u32_range() {
        assert_eq!(to_wire_u32(0).unwrap(), 0);
        assert_eq!(to_wire_u32(u32::MAX as u64).unwrap(), u32::MAX);
        assert_eq!(
            to_wire_u32(u32::MAX as u64 + 1),
            Err(EncodingError::IntegerRange(u32::MAX as u64 + 1))
        );
    }

    #[test]
    fn test_insufficient_bytes() {
        let result = u32::from_bytes(&[0x01, 0x02]);
        assert_eq!(
            result,
            Err(DecodeError::InsufficientBytes {
                expected: 4,
                available: 2
            })
        );
    }

    #[test]
    fn test_fixed_array_encoding() {
        let arr = [0xAAu8; 4];
        let encoded = arr.to_bytes();
        assert_eq!(encoded.to_vec(), vec![0xAA; 4]);
        assert_eq!(<[u8; 4]>::from_bytes(&encoded).unwrap(), arr);
    }

    #[test]
    fn test_take_bytes() {
        let mut buf = Bytes::from_static(&[1, 2, 3, 4, 5]);
        let head = take_bytes(&mut buf, 3).unwrap();
        assert_eq!(head.as_ref(), &[1, 2, 3]);
        assert_eq!(buf.as_ref(), &[4, 5]);
        assert!(take_bytes(&mut buf, 3).is_err());
    }
}
