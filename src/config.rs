use crate::error::{ColourError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Largest k that fits the 2-bit packed `u64` form
pub const MAX_KMER_SIZE: usize = 32;

/// Configuration for a colour index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Instance name, attached to every log line of the index
    pub name: String,
    /// K-mer length
    pub kmer_size: usize,
    /// Which membership store variant backs the index
    pub storage: StorageConfig,
    /// Shape of the per-colour Bloom filters
    pub bloom: BloomConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: "colourdb".to_string(),
            kmer_size: 31,
            storage: StorageConfig::default(),
            bloom: BloomConfig::default(),
        }
    }
}

/// Membership store selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// A single in-process store
    #[default]
    InMemory,
    /// K-mers partitioned across `shards` stores by hash
    Sharded { shards: usize },
}

impl StorageConfig {
    pub fn shard_count(&self) -> usize {
        match self {
            StorageConfig::InMemory => 1,
            StorageConfig::Sharded { shards } => *shards,
        }
    }
}

/// Bloom filter parameters shared by every colour.
///
/// All colours must use the same shape so that two filters can be OR-ed
/// together for union estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    /// Bits per colour filter
    pub num_bits: usize,
    /// Hash functions per insert/lookup
    pub num_hashes: usize,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            num_bits: 1 << 22,
            num_hashes: 3,
        }
    }
}

impl BloomConfig {
    /// Size the filters for `expected_items` k-mers per colour at the given false positive rate.
    pub fn with_fp_rate(expected_items: usize, fp_rate: f64) -> Self {
        // m = -n * ln(p) / (ln(2)^2), k = (m/n) * ln(2)
        let ln2_sq = std::f64::consts::LN_2 * std::f64::consts::LN_2;
        let num_bits = (-(expected_items as f64) * fp_rate.ln() / ln2_sq).ceil() as usize;
        let num_hashes = ((num_bits as f64 / expected_items as f64) * std::f64::consts::LN_2)
            .ceil() as usize;

        Self {
            num_bits: num_bits.max(64),
            num_hashes: num_hashes.max(1),
        }
    }
}

impl IndexConfig {
    /// Load a JSON config file; missing fields fall back to their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: IndexConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.kmer_size == 0 || self.kmer_size > MAX_KMER_SIZE {
            return Err(ColourError::config(format!(
                "kmer_size must be within 1..={} (got {})",
                MAX_KMER_SIZE, self.kmer_size
            )));
        }
        if self.storage.shard_count() == 0 {
            return Err(ColourError::config("sharded storage needs at least one shard"));
        }
        if self.bloom.num_bits < 64 {
            return Err(ColourError::config(format!(
                "bloom.num_bits must be at least 64 (got {})",
                self.bloom.num_bits
            )));
        }
        if self.bloom.num_hashes == 0 {
            return Err(ColourError::config("bloom.num_hashes must be at least 1"));
        }
        Ok(())
    }
}
