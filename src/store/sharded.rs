use crate::colour::ColourBitVector;
use crate::error::{ColourError, Result};
use crate::kmer::nthash::nthash_packed;
use crate::store::{MembershipStore, StoreSnapshot};
use rayon::prelude::*;

/// Shard that holds diff records, mirroring the single "stats" connection of
/// a partitioned deployment.
const DIFF_SHARD: usize = 0;

/// Store partitioned by k-mer hash.
///
/// Every k-mer lives on exactly one shard, so per-colour counts and union
/// counts are sums over shards. Shards are plain `MembershipStore`s and can
/// be remote clients.
pub struct ShardedStore {
    kmer_size: usize,
    shards: Vec<Box<dyn MembershipStore>>,
}

impl ShardedStore {
    /// # Panics
    /// If `shards` is empty.
    pub fn new(kmer_size: usize, shards: Vec<Box<dyn MembershipStore>>) -> Self {
        assert!(!shards.is_empty(), "sharded store needs at least one shard");
        Self { kmer_size, shards }
    }

    /// Route by the high bits of the hash (multiply-shift). The Bloom filters
    /// index with the low bits, which must stay uniform within a shard.
    #[inline]
    fn shard_of(&self, kmer: u64) -> usize {
        let hash = nthash_packed(kmer, self.kmer_size);
        ((hash as u128 * self.shards.len() as u128) >> 64) as usize
    }

    /// Split `kmers` per shard, remembering each k-mer's input position.
    fn partition(&self, kmers: &[u64]) -> Vec<(Vec<usize>, Vec<u64>)> {
        let mut groups = vec![(Vec::new(), Vec::new()); self.shards.len()];
        for (pos, &kmer) in kmers.iter().enumerate() {
            let (positions, shard_kmers) = &mut groups[self.shard_of(kmer)];
            positions.push(pos);
            shard_kmers.push(kmer);
        }
        groups
    }

    /// Run `op` on every shard with its share of `kmers`, in parallel, and
    /// put the per-k-mer results back in input order.
    fn scatter_gather<T, F>(&self, kmers: &[u64], op: F) -> Result<Vec<T>>
    where
        T: Send + Default + Clone,
        F: Fn(&dyn MembershipStore, &[u64]) -> Result<Vec<T>> + Sync,
    {
        let groups = self.partition(kmers);
        let per_shard = self
            .shards
            .par_iter()
            .zip(groups.par_iter())
            .map(|(shard, (_, shard_kmers))| {
                if shard_kmers.is_empty() {
                    Ok(Vec::new())
                } else {
                    op(shard.as_ref(), shard_kmers)
                }
            })
            .collect::<Result<Vec<Vec<T>>>>()?;

        let mut out = vec![T::default(); kmers.len()];
        for ((positions, _), results) in groups.iter().zip(per_shard) {
            if results.len() != positions.len() {
                return Err(ColourError::backend(format!(
                    "shard returned {} results for {} k-mers",
                    results.len(),
                    positions.len()
                )));
            }
            for (&pos, result) in positions.iter().zip(results) {
                out[pos] = result;
            }
        }
        Ok(out)
    }

    fn sum_over_shards<F>(&self, op: F) -> Result<u64>
    where
        F: Fn(&dyn MembershipStore) -> Result<u64> + Sync,
    {
        self.shards.par_iter().map(|shard| op(shard.as_ref())).sum()
    }
}

impl MembershipStore for ShardedStore {
    fn insert_batch(&self, colour: u64, kmers: &[u64]) -> Result<()> {
        let groups = self.partition(kmers);
        self.shards
            .par_iter()
            .zip(groups.par_iter())
            .filter(|(_, (_, shard_kmers))| !shard_kmers.is_empty())
            .try_for_each(|(shard, (_, shard_kmers))| shard.insert_batch(colour, shard_kmers))
    }

    fn get_batch(&self, kmers: &[u64]) -> Result<Vec<ColourBitVector>> {
        self.scatter_gather(kmers, |shard, shard_kmers| shard.get_batch(shard_kmers))
    }

    fn may_contain_batch(&self, colour: u64, kmers: &[u64]) -> Result<Vec<bool>> {
        self.scatter_gather(kmers, |shard, shard_kmers| {
            shard.may_contain_batch(colour, shard_kmers)
        })
    }

    fn count(&self, colour: u64) -> Result<u64> {
        self.sum_over_shards(|shard| shard.count(colour))
    }

    fn union_count(&self, colour_a: u64, colour_b: u64) -> Result<u64> {
        self.sum_over_shards(|shard| shard.union_count(colour_a, colour_b))
    }

    fn bit_count(&self) -> Result<u64> {
        self.sum_over_shards(|shard| shard.bit_count())
    }

    fn memory_usage(&self) -> Result<usize> {
        self.shards.iter().map(|shard| shard.memory_usage()).sum()
    }

    fn count_keys(&self) -> Result<usize> {
        self.shards.iter().map(|shard| shard.count_keys()).sum()
    }

    fn delete_all(&self) -> Result<()> {
        self.shards.iter().try_for_each(|shard| shard.delete_all())
    }

    fn insert_diff(&self, primary: u64, secondary: u64, kmers: &[u64]) -> Result<()> {
        self.shards[DIFF_SHARD].insert_diff(primary, secondary, kmers)
    }

    fn lookup_diff(&self, primary: u64, index: usize) -> Result<Option<u64>> {
        self.shards[DIFF_SHARD].lookup_diff(primary, index)
    }

    fn snapshot(&self) -> Result<StoreSnapshot> {
        let mut shards = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            let snapshot = shard.snapshot()?;
            if snapshot.kmer_size != self.kmer_size {
                return Err(ColourError::backend(format!(
                    "shard reports k={}, store uses k={}",
                    snapshot.kmer_size, self.kmer_size
                )));
            }
            shards.extend(snapshot.shards);
        }
        Ok(StoreSnapshot {
            kmer_size: self.kmer_size,
            shards,
        })
    }

    fn name(&self) -> &'static str {
        "sharded"
    }
}
