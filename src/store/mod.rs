//! Membership stores: where per-colour approximate k-mer sets live.
//!
//! The index only talks to the [`MembershipStore`] trait. Two variants ship
//! with the crate and are chosen from [`StorageConfig`] by [`create_store`]:
//! a single in-process store and a store sharded by k-mer hash.

pub mod memory;
pub mod sharded;

use crate::colour::ColourBitVector;
use crate::config::{BloomConfig, StorageConfig};
use crate::error::{ColourError, Result};
use crate::kmer::bloom::BloomFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

pub use memory::InMemoryStore;
pub use sharded::ShardedStore;

/// K-mers stored for a secondary colour: those its primary's filter did not
/// already report present. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub secondary: u64,
    pub kmers: Vec<u64>,
}

/// Serialized contents of one store partition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSnapshot {
    /// Filter for colour `i` at position `i`
    pub filters: Vec<BloomFilter>,
    /// Diff records per primary colour, in insertion order
    pub diffs: BTreeMap<u64, Vec<DiffRecord>>,
}

/// Serialized contents of a whole store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub kmer_size: usize,
    pub shards: Vec<ShardSnapshot>,
}

/// Trait for approximate colour membership stores.
///
/// K-mers arrive already packed (and canonicalized if the caller asked for
/// it). Implementations may be remote; errors are reported as-is and never
/// retried here.
pub trait MembershipStore: Send + Sync {
    /// Record `kmer` as present in `colour`
    fn insert(&self, colour: u64, kmer: u64) -> Result<()> {
        self.insert_batch(colour, &[kmer])
    }

    fn insert_batch(&self, colour: u64, kmers: &[u64]) -> Result<()>;

    /// Colour bit-vector for one k-mer
    fn get(&self, kmer: u64) -> Result<ColourBitVector> {
        Ok(self.get_batch(&[kmer])?.pop().unwrap_or_default())
    }

    /// Colour bit-vectors, one per k-mer, in input order
    fn get_batch(&self, kmers: &[u64]) -> Result<Vec<ColourBitVector>>;

    /// Membership test of each k-mer against a single colour
    fn may_contain_batch(&self, colour: u64, kmers: &[u64]) -> Result<Vec<bool>> {
        Ok(self
            .get_batch(kmers)?
            .iter()
            .map(|bv| bv.contains(colour))
            .collect())
    }

    /// Estimated number of k-mers in `colour`
    fn count(&self, colour: u64) -> Result<u64>;

    /// Estimated number of k-mers in either colour
    fn union_count(&self, colour_a: u64, colour_b: u64) -> Result<u64>;

    /// Number of set bits across the whole store
    fn bit_count(&self) -> Result<u64>;

    /// Bytes held by the membership structures
    fn memory_usage(&self) -> Result<usize>;

    /// Number of stored colour keys
    fn count_keys(&self) -> Result<usize>;

    fn delete_all(&self) -> Result<()>;

    /// Append a diff record under `primary`
    fn insert_diff(&self, primary: u64, secondary: u64, kmers: &[u64]) -> Result<()>;

    /// K-mer at `index` in the concatenated diff records of `primary`
    fn lookup_diff(&self, primary: u64, index: usize) -> Result<Option<u64>>;

    fn snapshot(&self) -> Result<StoreSnapshot>;

    /// Write the store contents as JSON
    fn dump(&self, target: &mut dyn Write) -> Result<()> {
        serde_json::to_writer(target, &self.snapshot()?)?;
        Ok(())
    }

    /// Returns the name of this store
    fn name(&self) -> &'static str;
}

/// Create the store selected by configuration
pub fn create_store(
    kmer_size: usize,
    storage: &StorageConfig,
    bloom: &BloomConfig,
) -> Box<dyn MembershipStore> {
    match storage {
        StorageConfig::InMemory => {
            tracing::info!("Using in-memory store ({} bits per colour)", bloom.num_bits);
            Box::new(InMemoryStore::new(kmer_size, *bloom))
        }
        StorageConfig::Sharded { shards } => {
            tracing::info!("Using sharded store with {} shards", shards);
            let shards = (0..*shards)
                .map(|_| Box::new(InMemoryStore::new(kmer_size, *bloom)) as Box<dyn MembershipStore>)
                .collect();
            Box::new(ShardedStore::new(kmer_size, shards))
        }
    }
}

/// Rebuild the configured store from a snapshot
pub fn restore_store(
    kmer_size: usize,
    storage: &StorageConfig,
    bloom: &BloomConfig,
    snapshot: StoreSnapshot,
) -> Result<Box<dyn MembershipStore>> {
    if snapshot.kmer_size != kmer_size {
        return Err(ColourError::config(format!(
            "snapshot was built with k={}, index is configured for k={}",
            snapshot.kmer_size, kmer_size
        )));
    }
    if snapshot.shards.len() != storage.shard_count() {
        return Err(ColourError::config(format!(
            "snapshot holds {} shards, storage is configured for {}",
            snapshot.shards.len(),
            storage.shard_count()
        )));
    }

    let mut stores = snapshot
        .shards
        .into_iter()
        .map(|shard| InMemoryStore::from_snapshot(kmer_size, *bloom, shard))
        .collect::<Result<Vec<_>>>()?;

    match storage {
        StorageConfig::InMemory => match stores.pop() {
            Some(store) => Ok(Box::new(store)),
            None => Err(ColourError::config("snapshot holds no shards")),
        },
        StorageConfig::Sharded { .. } => {
            let shards = stores
                .into_iter()
                .map(|store| Box::new(store) as Box<dyn MembershipStore>)
                .collect();
            Ok(Box::new(ShardedStore::new(kmer_size, shards)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_store_follows_config() {
        let bloom = BloomConfig { num_bits: 1024, num_hashes: 2 };
        let store = create_store(5, &StorageConfig::InMemory, &bloom);
        assert_eq!(store.name(), "in-memory");
        let store = create_store(5, &StorageConfig::Sharded { shards: 3 }, &bloom);
        assert_eq!(store.name(), "sharded");
    }

    #[test]
    fn test_restore_rejects_mismatches() {
        let bloom = BloomConfig { num_bits: 1024, num_hashes: 2 };
        let store = create_store(5, &StorageConfig::Sharded { shards: 2 }, &bloom);
        let snapshot = store.snapshot().unwrap();

        assert!(restore_store(5, &StorageConfig::InMemory, &bloom, snapshot.clone()).is_err());
        assert!(restore_store(7, &StorageConfig::Sharded { shards: 2 }, &bloom, snapshot.clone()).is_err());
        assert!(restore_store(5, &StorageConfig::Sharded { shards: 2 }, &bloom, snapshot).is_ok());
    }

    #[test]
    fn test_snapshot_round_trip_through_json() {
        let bloom = BloomConfig { num_bits: 1024, num_hashes: 2 };
        let store = create_store(5, &StorageConfig::Sharded { shards: 2 }, &bloom);
        store.insert_batch(0, &[1, 2, 3, 40, 500]).unwrap();
        store.insert_diff(0, 1, &[7, 8]).unwrap();

        let mut buf = Vec::new();
        store.dump(&mut buf).unwrap();
        let snapshot: StoreSnapshot = serde_json::from_slice(&buf).unwrap();
        let restored = restore_store(5, &StorageConfig::Sharded { shards: 2 }, &bloom, snapshot).unwrap();

        assert_eq!(restored.bit_count().unwrap(), store.bit_count().unwrap());
        assert_eq!(restored.lookup_diff(0, 1).unwrap(), Some(8));
        for kmer in [1, 2, 3, 40, 500] {
            assert!(restored.get(kmer).unwrap().contains(0));
        }
    }
}
