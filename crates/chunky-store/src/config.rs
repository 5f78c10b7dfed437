//! Store configuration.
//!
//! ```toml
//! base_path = ".chunky"
//! max_right_padding = 3
//!
//! [chunker]
//! kind = "fastcdc"
//! avg_size = 32768
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chunky_cdc::params::{BUZHASH_MASK_BITS_DEFAULT, FASTCDC_AVG_SIZE_DEFAULT};
use chunky_cdc::{Buzhash, Chunker, FastCdc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mutate::DEFAULT_MAX_RIGHT_PADDING;
use crate::StoreError;

/// Chunking algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChunkerConfig {
    /// FastCDC with the given average chunk size
    FastCdc {
        /// Target average chunk size in bytes
        avg_size: usize,
    },
    /// Buzhash with the given boundary mask width
    Buzhash {
        /// Mask width in bits
        mask_bits: u32,
    },
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        ChunkerConfig::FastCdc {
            avg_size: FASTCDC_AVG_SIZE_DEFAULT,
        }
    }
}

impl ChunkerConfig {
    /// Buzhash with the default mask width.
    pub fn buzhash() -> Self {
        ChunkerConfig::Buzhash {
            mask_bits: BUZHASH_MASK_BITS_DEFAULT,
        }
    }

    /// Instantiates the configured chunker.
    pub fn build(&self) -> Result<Arc<dyn Chunker>, StoreError> {
        let chunker: Arc<dyn Chunker> = match *self {
            ChunkerConfig::FastCdc { avg_size } => Arc::new(FastCdc::with_avg_size(avg_size)?),
            ChunkerConfig::Buzhash { mask_bits } => Arc::new(Buzhash::with_mask_bits(mask_bits)?),
        };
        Ok(chunker)
    }
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base path for persistent storage
    pub base_path: PathBuf,
    /// Maximum number of chunks re-chunked after a mutated region
    pub max_right_padding: usize,
    /// Chunking algorithm
    pub chunker: ChunkerConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(".chunky"),
            max_right_padding: DEFAULT_MAX_RIGHT_PADDING,
            chunker: ChunkerConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with the given base path.
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            ..Default::default()
        }
    }

    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, StoreError> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Loads a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), chunker = ?config.chunker, "Loaded store config");
        Ok(config)
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml_string(&self) -> Result<String, StoreError> {
        toml::to_string(self).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Returns the path for block storage.
    pub fn blocks_path(&self) -> PathBuf {
        self.base_path.join("blocks")
    }

    /// Creates all necessary directories.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.blocks_path())
    }

    /// Instantiates the configured chunker.
    pub fn build_chunker(&self) -> Result<Arc<dyn Chunker>, StoreError> {
        self.chunker.build()
    }
}
