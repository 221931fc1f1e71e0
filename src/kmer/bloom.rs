// src/kmer/bloom.rs
//! Bloom filter used as the approximate membership set of one colour.
//!
//! Bloom filters allow probabilistic membership testing with no false negatives.
//! Each colour owns one filter; all filters in an index share the same shape, so
//! two colours can be OR-ed together to estimate the size of their union.
//!
//! Cardinality is estimated from the fill ratio (Swamidass & Baldi, 2007):
//! n* = -(m / k) * ln(1 - X / m), where X is the number of set bits.

use crate::config::BloomConfig;
use serde::{Deserialize, Serialize};

/// A space-efficient probabilistic data structure for membership testing.
///
/// False positives are possible but false negatives are not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomFilter {
    /// Bit vector storing the filter state
    bits: Vec<u64>,
    /// Number of bits in the filter
    num_bits: usize,
    /// Number of hash functions to use
    num_hashes: usize,
}

impl BloomFilter {
    /// Create a new Bloom filter with explicit size parameters.
    ///
    /// # Arguments
    /// * `num_bits` - Number of bits in the filter
    /// * `num_hashes` - Number of hash functions to use
    pub fn new(num_bits: usize, num_hashes: usize) -> Self {
        // Round up to next multiple of 64 for u64 storage
        let num_bits = num_bits.max(1).div_ceil(64) * 64;
        let num_u64s = num_bits / 64;

        Self {
            bits: vec![0u64; num_u64s],
            num_bits,
            num_hashes: num_hashes.max(1),
        }
    }

    pub fn from_config(config: &BloomConfig) -> Self {
        Self::new(config.num_bits, config.num_hashes)
    }

    /// Insert an item by its 64-bit hash.
    ///
    /// After insertion, `may_contain()` will return true for this hash.
    #[inline]
    pub fn insert(&mut self, hash: u64) {
        for i in 0..self.num_hashes {
            let bit_idx = self.get_bit_index(hash, i);
            self.bits[bit_idx / 64] |= 1u64 << (bit_idx % 64);
        }
    }

    /// Check if an item may be in the filter.
    ///
    /// Returns `true` if the item might be present (could be false positive).
    /// Returns `false` if the item is definitely not present.
    #[inline]
    pub fn may_contain(&self, hash: u64) -> bool {
        (0..self.num_hashes).all(|i| {
            let bit_idx = self.get_bit_index(hash, i);
            self.bits[bit_idx / 64] & (1u64 << (bit_idx % 64)) != 0
        })
    }

    /// Get the bit index for hash function i.
    ///
    /// Uses double hashing: h(i) = h1 + i*h2 mod m
    #[inline]
    fn get_bit_index(&self, hash: u64, i: usize) -> usize {
        let h1 = hash as u32 as u64;
        let h2 = (hash >> 32) as u32 as u64;
        let combined = h1.wrapping_add((i as u64).wrapping_mul(h2));
        (combined % self.num_bits as u64) as usize
    }

    /// Get the number of bits in the filter.
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Get the number of hash functions.
    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    /// Get the memory usage in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.bits.len() * 8
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> u64 {
        self.bits.iter().map(|w| w.count_ones() as u64).sum()
    }

    /// Estimated number of distinct items inserted.
    ///
    /// A saturated filter reports its bit count, the largest value it can resolve.
    pub fn estimate_cardinality(&self) -> u64 {
        Self::estimate_from_fill(self.count_ones(), self.num_bits, self.num_hashes)
    }

    /// Estimated number of distinct items inserted into either filter.
    ///
    /// Both filters must have the same shape.
    pub fn estimate_union(&self, other: &BloomFilter) -> u64 {
        debug_assert!(self.same_shape(other));
        let ones: u64 = self
            .bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a | b).count_ones() as u64)
            .sum();
        Self::estimate_from_fill(ones, self.num_bits, self.num_hashes)
    }

    fn estimate_from_fill(ones: u64, num_bits: usize, num_hashes: usize) -> u64 {
        let m = num_bits as f64;
        if ones as f64 >= m {
            return num_bits as u64;
        }
        let estimate = -(m / num_hashes as f64) * (1.0 - ones as f64 / m).ln();
        estimate.round() as u64
    }

    pub fn same_shape(&self, other: &BloomFilter) -> bool {
        self.num_bits == other.num_bits && self.num_hashes == other.num_hashes
    }
}
