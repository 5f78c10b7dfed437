//! Store facade.
//!
//! Binds a chunker, a codec and a block getter, and exposes every engine
//! operation. Operations take their prior index as an [`IndexSource`]: either
//! a root to fetch and decode, or an index the caller already holds.

use std::borrow::Cow;
use std::sync::Arc;

use bytes::Bytes;
use chunky_cdc::Chunker;
use chunky_core::Cid;

use crate::block::BlockGet;
use crate::codec::Codec;
use crate::config::StoreConfig;
use crate::index::{self, ChunkIndex, IndexSource, Snapshot};
use crate::mutate::{self, Engine, Update, DEFAULT_MAX_RIGHT_PADDING};
use crate::{create, read, StoreError};

/// Chunked byte-array store.
///
/// Nothing is persisted by the store itself: every create or mutation
/// returns a [`Snapshot`] whose blocks the caller must put into its block
/// store before the new root can be read back.
#[derive(Clone)]
pub struct ChunkyStore {
    chunker: Arc<dyn Chunker>,
    codec: Arc<dyn Codec>,
    blocks: Arc<dyn BlockGet>,
    max_right_padding: usize,
}

impl ChunkyStore {
    /// Creates a store with the default right padding.
    pub fn new(
        chunker: Arc<dyn Chunker>,
        codec: Arc<dyn Codec>,
        blocks: Arc<dyn BlockGet>,
    ) -> Self {
        Self {
            chunker,
            codec,
            blocks,
            max_right_padding: DEFAULT_MAX_RIGHT_PADDING,
        }
    }

    /// Creates a store from a configuration.
    pub fn from_config(
        config: &StoreConfig,
        codec: Arc<dyn Codec>,
        blocks: Arc<dyn BlockGet>,
    ) -> Result<Self, StoreError> {
        Ok(Self::new(config.build_chunker()?, codec, blocks)
            .with_max_right_padding(config.max_right_padding))
    }

    /// Sets the number of chunks re-chunked after a mutated region.
    pub fn with_max_right_padding(mut self, max_right_padding: usize) -> Self {
        self.max_right_padding = max_right_padding;
        self
    }

    /// Returns the right padding.
    pub fn max_right_padding(&self) -> usize {
        self.max_right_padding
    }

    fn engine(&self) -> Engine<'_> {
        Engine {
            chunker: self.chunker.as_ref(),
            codec: self.codec.as_ref(),
            blocks: self.blocks.as_ref(),
            max_right_padding: self.max_right_padding,
        }
    }

    /// Chunks `buf` into a new index.
    pub async fn create(&self, buf: &[u8]) -> Result<Snapshot, StoreError> {
        create::create(buf, self.chunker.as_ref(), self.codec.as_ref()).await
    }

    /// Fetches and decodes the index named by `root`.
    pub async fn read_index(&self, root: &Cid) -> Result<ChunkIndex, StoreError> {
        index::read_index(root, self.blocks.as_ref(), self.codec.as_ref()).await
    }

    async fn resolve<'a>(
        &self,
        source: IndexSource<'a>,
    ) -> Result<Cow<'a, ChunkIndex>, StoreError> {
        source.resolve(self.blocks.as_ref(), self.codec.as_ref()).await
    }

    /// Reads `length` bytes at `start`.
    pub async fn read<'a>(
        &self,
        source: impl Into<IndexSource<'a>>,
        start: u32,
        length: u32,
    ) -> Result<Bytes, StoreError> {
        let index = self.resolve(source.into()).await?;
        read::read(&index, self.blocks.as_ref(), start, length).await
    }

    /// Reads the whole buffer.
    pub async fn read_all<'a>(
        &self,
        source: impl Into<IndexSource<'a>>,
    ) -> Result<Bytes, StoreError> {
        let index = self.resolve(source.into()).await?;
        read::read_all(&index, self.blocks.as_ref()).await
    }

    /// Appends `buf` to the end of the buffer.
    pub async fn append<'a>(
        &self,
        source: impl Into<IndexSource<'a>>,
        buf: &[u8],
    ) -> Result<Snapshot, StoreError> {
        let index = self.resolve(source.into()).await?;
        mutate::append(&self.engine(), &index, buf).await
    }

    /// Overwrites `buf.len()` bytes at `start`.
    pub async fn update<'a>(
        &self,
        source: impl Into<IndexSource<'a>>,
        buf: &[u8],
        start: u32,
    ) -> Result<Snapshot, StoreError> {
        let index = self.resolve(source.into()).await?;
        mutate::update(&self.engine(), &index, buf, start).await
    }

    /// Deletes `length` bytes at `start`.
    pub async fn remove<'a>(
        &self,
        source: impl Into<IndexSource<'a>>,
        start: u32,
        length: u32,
    ) -> Result<Snapshot, StoreError> {
        let index = self.resolve(source.into()).await?;
        mutate::remove(&self.engine(), &index, start, length).await
    }

    /// Applies `updates` in order.
    pub async fn bulk_update<'a>(
        &self,
        source: impl Into<IndexSource<'a>>,
        updates: &[Update],
    ) -> Result<Snapshot, StoreError> {
        self.bulk(source, &[], updates).await
    }

    /// Appends `append_buf`, then applies `updates` in order.
    pub async fn bulk<'a>(
        &self,
        source: impl Into<IndexSource<'a>>,
        append_buf: &[u8],
        updates: &[Update],
    ) -> Result<Snapshot, StoreError> {
        let index = self.resolve(source.into()).await?;
        mutate::bulk(&self.engine(), &index, append_buf, updates).await
    }
}

impl std::fmt::Debug for ChunkyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkyStore")
            .field("max_right_padding", &self.max_right_padding)
            .finish_non_exhaustive()
    }
}
