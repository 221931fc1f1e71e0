use crate::colour::ColourBitVector;
use crate::config::BloomConfig;
use crate::error::{ColourError, Result};
use crate::kmer::bloom::BloomFilter;
use crate::kmer::nthash::nthash_packed;
use crate::store::{DiffRecord, MembershipStore, ShardSnapshot, StoreSnapshot};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-process store with one Bloom filter per colour.
///
/// A k-mer's colour bit-vector is assembled by testing it against every
/// colour's filter, so a colour can be reported present by a false positive
/// but never missed.
pub struct InMemoryStore {
    kmer_size: usize,
    bloom: BloomConfig,
    /// Filter for colour `i` at position `i`; grown on first insert
    filters: RwLock<Vec<BloomFilter>>,
    diffs: RwLock<BTreeMap<u64, Vec<DiffRecord>>>,
}

impl InMemoryStore {
    pub fn new(kmer_size: usize, bloom: BloomConfig) -> Self {
        Self {
            kmer_size,
            bloom,
            filters: RwLock::new(Vec::new()),
            diffs: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn from_snapshot(kmer_size: usize, bloom: BloomConfig, snapshot: ShardSnapshot) -> Result<Self> {
        let expected = BloomFilter::from_config(&bloom);
        if let Some(colour) = snapshot.filters.iter().position(|f| !f.same_shape(&expected)) {
            return Err(ColourError::config(format!(
                "filter for colour {} does not match the configured bloom shape ({} bits, {} hashes)",
                colour, expected.num_bits(), expected.num_hashes()
            )));
        }
        Ok(Self {
            kmer_size,
            bloom,
            filters: RwLock::new(snapshot.filters),
            diffs: RwLock::new(snapshot.diffs),
        })
    }

    #[inline]
    fn hash(&self, kmer: u64) -> u64 {
        nthash_packed(kmer, self.kmer_size)
    }
}

impl MembershipStore for InMemoryStore {
    fn insert_batch(&self, colour: u64, kmers: &[u64]) -> Result<()> {
        let len = usize::try_from(colour)
            .ok()
            .and_then(|c| c.checked_add(1))
            .ok_or_else(|| ColourError::backend(format!("colour {} is out of range", colour)))?;
        let mut filters = self.filters.write();
        if filters.len() < len {
            let template = BloomFilter::from_config(&self.bloom);
            filters.resize(len, template);
        }
        let filter = &mut filters[len - 1];
        for &kmer in kmers {
            filter.insert(self.hash(kmer));
        }
        Ok(())
    }

    fn get_batch(&self, kmers: &[u64]) -> Result<Vec<ColourBitVector>> {
        let filters = self.filters.read();
        Ok(kmers
            .iter()
            .map(|&kmer| {
                let hash = self.hash(kmer);
                let mut bv = ColourBitVector::with_colours(filters.len());
                for (colour, filter) in filters.iter().enumerate() {
                    if filter.may_contain(hash) {
                        bv.set(colour as u64);
                    }
                }
                bv
            })
            .collect())
    }

    fn may_contain_batch(&self, colour: u64, kmers: &[u64]) -> Result<Vec<bool>> {
        let filters = self.filters.read();
        Ok(match filters.get(colour as usize) {
            Some(filter) => kmers.iter().map(|&k| filter.may_contain(self.hash(k))).collect(),
            None => vec![false; kmers.len()],
        })
    }

    fn count(&self, colour: u64) -> Result<u64> {
        Ok(self
            .filters
            .read()
            .get(colour as usize)
            .map(BloomFilter::estimate_cardinality)
            .unwrap_or(0))
    }

    fn union_count(&self, colour_a: u64, colour_b: u64) -> Result<u64> {
        let filters = self.filters.read();
        Ok(match (filters.get(colour_a as usize), filters.get(colour_b as usize)) {
            (Some(a), Some(b)) => a.estimate_union(b),
            (Some(f), None) | (None, Some(f)) => f.estimate_cardinality(),
            (None, None) => 0,
        })
    }

    fn bit_count(&self) -> Result<u64> {
        Ok(self.filters.read().iter().map(BloomFilter::count_ones).sum())
    }

    fn memory_usage(&self) -> Result<usize> {
        Ok(self.filters.read().iter().map(BloomFilter::memory_bytes).sum())
    }

    fn count_keys(&self) -> Result<usize> {
        Ok(self.filters.read().len())
    }

    fn delete_all(&self) -> Result<()> {
        self.filters.write().clear();
        self.diffs.write().clear();
        Ok(())
    }

    fn insert_diff(&self, primary: u64, secondary: u64, kmers: &[u64]) -> Result<()> {
        self.diffs.write().entry(primary).or_default().push(DiffRecord {
            secondary,
            kmers: kmers.to_vec(),
        });
        Ok(())
    }

    fn lookup_diff(&self, primary: u64, index: usize) -> Result<Option<u64>> {
        Ok(self.diffs.read().get(&primary).and_then(|records| {
            records
                .iter()
                .flat_map(|record| record.kmers.iter())
                .nth(index)
                .copied()
        }))
    }

    fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(StoreSnapshot {
            kmer_size: self.kmer_size,
            shards: vec![ShardSnapshot {
                filters: self.filters.read().clone(),
                diffs: self.diffs.read().clone(),
            }],
        })
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::kmer::encode_kmer;

    fn store() -> InMemoryStore {
        InMemoryStore::new(8, BloomConfig { num_bits: 1 << 14, num_hashes: 3 })
    }

    #[test]
    fn test_out_of_range_colour_keeps_filters() {
        let store = store();
        store.insert(0, 7).unwrap();
        let bits = store.bit_count().unwrap();
        assert!(matches!(store.insert(u64::MAX, 7), Err(ColourError::Backend { .. })));
        assert_eq!(store.bit_count().unwrap(), bits);
        assert_eq!(store.count_keys().unwrap(), 1);
    }

    #[test]
    fn test_insert_and_get() {
        let store = store();
        let kmer = encode_kmer("ACGTACGT").unwrap();
        store.insert(0, kmer).unwrap();
        store.insert(2, kmer).unwrap();

        let colours: Vec<u64> = store.get(kmer).unwrap().colours().into_iter().collect();
        assert_eq!(colours, vec![0, 2]);
        assert_eq!(store.count_keys().unwrap(), 3);
    }

    #[test]
    fn test_absent_kmer_has_no_colours() {
        let store = store();
        let kmer = encode_kmer("ACGTACGT").unwrap();
        assert!(store.get(kmer).unwrap().colours().is_empty());
        assert_eq!(store.count(0).unwrap(), 0);
        assert_eq!(store.union_count(0, 1).unwrap(), 0);
    }

    #[test]
    fn test_counts() {
        let store = store();
        store.insert_batch(0, &(0..200).collect::<Vec<u64>>()).unwrap();
        store.insert_batch(1, &(100..300).collect::<Vec<u64>>()).unwrap();

        let a = store.count(0).unwrap() as i64;
        let union = store.union_count(0, 1).unwrap() as i64;
        assert!((a - 200).abs() <= 10, "count {}", a);
        assert!((union - 300).abs() <= 15, "union {}", union);
        // a colour with no filter contributes nothing to a union
        assert_eq!(store.union_count(0, 9).unwrap(), store.count(0).unwrap());
    }

    #[test]
    fn test_may_contain_batch() {
        let store = store();
        store.insert_batch(1, &[5, 6]).unwrap();
        assert_eq!(store.may_contain_batch(1, &[5, 6]).unwrap(), vec![true, true]);
        assert_eq!(store.may_contain_batch(7, &[5, 6]).unwrap(), vec![false, false]);
    }

    #[test]
    fn test_diff_records_concatenate_in_order() {
        let store = store();
        store.insert_diff(0, 1, &[10, 11]).unwrap();
        store.insert_diff(0, 2, &[12]).unwrap();
        assert_eq!(store.lookup_diff(0, 0).unwrap(), Some(10));
        assert_eq!(store.lookup_diff(0, 2).unwrap(), Some(12));
        assert_eq!(store.lookup_diff(0, 3).unwrap(), None);
        assert_eq!(store.lookup_diff(5, 0).unwrap(), None);
    }

    #[test]
    fn test_delete_all() {
        let store = store();
        store.insert_batch(0, &[1, 2, 3]).unwrap();
        store.insert_diff(0, 1, &[4]).unwrap();
        assert!(store.bit_count().unwrap() > 0);
        assert_eq!(store.memory_usage().unwrap(), (1 << 14) / 8);

        store.delete_all().unwrap();
        assert_eq!(store.bit_count().unwrap(), 0);
        assert_eq!(store.memory_usage().unwrap(), 0);
        assert_eq!(store.lookup_diff(0, 0).unwrap(), None);
    }

    #[test]
    fn test_from_snapshot_checks_shape() {
        let store = store();
        store.insert(0, 1).unwrap();
        let shard = store.snapshot().unwrap().shards.remove(0);
        let wrong = BloomConfig { num_bits: 1 << 10, num_hashes: 3 };
        assert!(InMemoryStore::from_snapshot(8, wrong, shard.clone()).is_err());
        let restored = InMemoryStore::from_snapshot(8, store.bloom, shard).unwrap();
        assert!(restored.get(1).unwrap().contains(0));
    }
}
