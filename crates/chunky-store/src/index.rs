//! Binary chunk index.
//!
//! The index maps absolute chunk start offsets to chunk identifiers and is
//! stored as a flat buffer:
//!
//! ```text
//! offset 0:       control flag     u32 LE (required bits 0x3C)
//! offset 4:       index size N     u32 LE
//! offset 8:       byte array size  u32 LE
//! offset 12+40*i: delta u32 LE | cid (36 bytes)
//! ```
//!
//! Each record stores the distance from the previous chunk start; the first
//! record's delta is its absolute offset. The buffer is itself a block and its
//! identifier is the root.

use std::borrow::Cow;
use std::ops::Range;

use bytes::{Bytes, BytesMut};
use chunky_core::encoding::take_bytes;
use chunky_core::wire::{index_buffer_len, CID_SIZE, INDEX_CONTROL_FLAG};
use chunky_core::{to_wire_u32, Cid, WireDecode, WireEncode};
use tracing::debug;

use crate::block::{Block, BlockGet};
use crate::codec::Codec;
use crate::resolve::covering_range;
use crate::StoreError;

/// One index record: a chunk and the absolute offset it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Absolute start offset in the logical buffer
    pub offset: u32,
    /// Chunk identifier
    pub cid: Cid,
}

impl IndexEntry {
    /// Creates a new entry.
    pub fn new(offset: u32, cid: Cid) -> Self {
        Self { offset, cid }
    }
}

/// Decoded chunk index.
///
/// Entries are sorted by offset, start at 0 and cover `[0, byte_array_size)`
/// without gaps or overlaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkIndex {
    root: Cid,
    entries: Vec<IndexEntry>,
    byte_array_size: u32,
}

impl ChunkIndex {
    pub(crate) fn from_parts(root: Cid, entries: Vec<IndexEntry>, byte_array_size: u32) -> Self {
        Self {
            root,
            entries,
            byte_array_size,
        }
    }

    /// Returns the identifier of the serialized index.
    pub fn root(&self) -> &Cid {
        &self.root
    }

    /// Returns the entries in ascending offset order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Returns the number of chunks.
    pub fn index_size(&self) -> usize {
        self.entries.len()
    }

    /// Returns the logical buffer length.
    pub fn byte_array_size(&self) -> u32 {
        self.byte_array_size
    }

    /// Returns true if the logical buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the chunk start offsets.
    pub fn offsets(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|e| e.offset)
    }

    /// Returns the chunk identifiers in offset order.
    pub fn cids(&self) -> impl Iterator<Item = &Cid> + '_ {
        self.entries.iter().map(|e| &e.cid)
    }

    /// Returns the byte span of chunk `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.index_size()`.
    pub fn span(&self, i: usize) -> Range<u32> {
        let start = self.entries[i].offset;
        let end = self
            .entries
            .get(i + 1)
            .map_or(self.byte_array_size, |next| next.offset);
        start..end
    }

    /// Returns the length of chunk `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.index_size()`.
    pub fn chunk_len(&self, i: usize) -> usize {
        let span = self.span(i);
        (span.end - span.start) as usize
    }

    /// Entry positions covering `[start, end)`, plus `pad` trailing entries.
    pub fn relevant_chunks(&self, start: u32, end: u32, pad: usize) -> Range<usize> {
        covering_range(
            self.entries.partition_point(|e| e.offset <= start),
            self.entries.partition_point(|e| e.offset < end),
            self.entries.len(),
            pad,
        )
    }

    /// Serializes the index to its wire form.
    pub fn to_buffer(&self) -> Result<Bytes, StoreError> {
        encode_index(&self.entries, self.byte_array_size)
    }
}

/// Where an operation gets its prior index from.
#[derive(Debug, Clone, Copy)]
pub enum IndexSource<'a> {
    /// Fetch and decode the index block named by this root
    Root(&'a Cid),
    /// Use an already decoded index
    Index(&'a ChunkIndex),
}

impl<'a> From<&'a Cid> for IndexSource<'a> {
    fn from(root: &'a Cid) -> Self {
        IndexSource::Root(root)
    }
}

impl<'a> From<&'a ChunkIndex> for IndexSource<'a> {
    fn from(index: &'a ChunkIndex) -> Self {
        IndexSource::Index(index)
    }
}

impl<'a> From<&'a Snapshot> for IndexSource<'a> {
    fn from(snapshot: &'a Snapshot) -> Self {
        IndexSource::Index(&snapshot.index)
    }
}

impl<'a> IndexSource<'a> {
    pub(crate) async fn resolve(
        self,
        blocks: &dyn BlockGet,
        codec: &dyn Codec,
    ) -> Result<Cow<'a, ChunkIndex>, StoreError> {
        match self {
            IndexSource::Index(index) => Ok(Cow::Borrowed(index)),
            IndexSource::Root(root) => Ok(Cow::Owned(read_index(root, blocks, codec).await?)),
        }
    }
}

/// Result of a create or mutate operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Identifier of the new index block
    pub root: Cid,
    /// The new index
    pub index: ChunkIndex,
    /// New blocks to persist: data chunks in offset order, index block last
    pub blocks: Vec<Block>,
}

impl Snapshot {
    /// Returns the unchanged index with no new blocks.
    pub(crate) fn unchanged(index: &ChunkIndex) -> Self {
        Self {
            root: index.root().clone(),
            index: index.clone(),
            blocks: Vec::new(),
        }
    }
}

/// Serializes entries and the logical buffer length into an index buffer.
pub fn encode_index(entries: &[IndexEntry], byte_array_size: u32) -> Result<Bytes, StoreError> {
    let mut buf = BytesMut::with_capacity(index_buffer_len(entries.len()));

    INDEX_CONTROL_FLAG.encode(&mut buf);
    to_wire_u32(entries.len() as u64)?.encode(&mut buf);
    byte_array_size.encode(&mut buf);

    let mut prev = 0u32;
    for entry in entries {
        if entry.cid.len() != CID_SIZE {
            return Err(StoreError::InvalidIdentifierSize {
                expected: CID_SIZE,
                actual: entry.cid.len(),
            });
        }
        let delta = entry.offset.checked_sub(prev).ok_or_else(|| {
            StoreError::Format(format!(
                "offset {} precedes previous offset {}",
                entry.offset, prev
            ))
        })?;
        delta.encode(&mut buf);
        buf.extend_from_slice(entry.cid.as_bytes());
        prev = entry.offset;
    }

    Ok(buf.freeze())
}

/// Parsed index buffer, before it is bound to a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedIndex {
    /// Entries in ascending offset order
    pub entries: Vec<IndexEntry>,
    /// Number of records declared in the header
    pub index_size: u32,
    /// Logical buffer length
    pub byte_array_size: u32,
}

/// Parses an index buffer.
pub fn decode_index(buffer: &Bytes, codec: &dyn Codec) -> Result<DecodedIndex, StoreError> {
    let mut buf = buffer.clone();

    let control_flag = u32::decode(&mut buf)?;
    if control_flag & INDEX_CONTROL_FLAG != INDEX_CONTROL_FLAG {
        return Err(StoreError::Format(format!(
            "control flag {:#x} is not a supported index structure",
            control_flag
        )));
    }
    let index_size = u32::decode(&mut buf)?;
    let byte_array_size = u32::decode(&mut buf)?;

    let expected_len = index_buffer_len(index_size as usize);
    if buffer.len() != expected_len {
        return Err(StoreError::Format(format!(
            "index buffer of {} bytes does not match {} records ({} bytes)",
            buffer.len(),
            index_size,
            expected_len
        )));
    }

    let mut entries = Vec::with_capacity(index_size as usize);
    let mut absolute = 0u32;
    for i in 0..index_size {
        let delta = u32::decode(&mut buf)?;
        absolute = absolute.checked_add(delta).ok_or_else(|| {
            StoreError::Format(format!("offset overflow at record {}", i))
        })?;
        if i == 0 && absolute != 0 {
            return Err(StoreError::Format(format!("first offset is {}, not 0", absolute)));
        }
        if i > 0 && delta == 0 {
            return Err(StoreError::Format(format!("empty chunk at record {}", i)));
        }
        if absolute >= byte_array_size {
            return Err(StoreError::Format(format!(
                "offset {} beyond byte array size {}",
                absolute, byte_array_size
            )));
        }
        let cid_bytes = take_bytes(&mut buf, CID_SIZE)?;
        entries.push(IndexEntry::new(absolute, codec.decode(&cid_bytes)?));
    }

    if index_size == 0 && byte_array_size != 0 {
        return Err(StoreError::Format(format!(
            "no records for byte array size {}",
            byte_array_size
        )));
    }

    Ok(DecodedIndex {
        entries,
        index_size,
        byte_array_size,
    })
}

/// Fetches and decodes the index named by `root`.
pub async fn read_index(
    root: &Cid,
    blocks: &dyn BlockGet,
    codec: &dyn Codec,
) -> Result<ChunkIndex, StoreError> {
    let buffer = blocks.get(root).await?;
    let decoded = decode_index(&buffer, codec)?;

    debug!(
        root = %root,
        index_size = decoded.index_size,
        byte_array_size = decoded.byte_array_size,
        "Read index"
    );

    Ok(ChunkIndex::from_parts(
        root.clone(),
        decoded.entries,
        decoded.byte_array_size,
    ))
}
