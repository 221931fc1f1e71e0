//! Pairwise set algebra from cardinality estimates.
//!
//! Everything derives from |A|, |B| and |A ∪ B| by inclusion-exclusion:
//! |A ∩ B| = |A| + |B| - |A ∪ B|. The inputs are estimates, so the raw
//! intersection can come out negative; it is clamped to zero, and so is the
//! difference that depends on it.

use crate::error::{ColourError, Result};
use serde::Serialize;

/// Cardinality estimates for one pair of colours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairCounts {
    pub count_a: u64,
    pub count_b: u64,
    pub union: u64,
}

impl PairCounts {
    pub fn new(count_a: u64, count_b: u64, union: u64) -> Self {
        Self { count_a, count_b, union }
    }

    /// The same counts with A and B exchanged.
    pub fn swapped(&self) -> Self {
        Self::new(self.count_b, self.count_a, self.union)
    }

    pub fn union(&self) -> u64 {
        self.union
    }

    pub fn intersection(&self) -> u64 {
        self.count_a.saturating_add(self.count_b).saturating_sub(self.union)
    }

    pub fn jaccard_index(&self) -> Result<f64> {
        if self.union == 0 {
            return Err(ColourError::UndefinedMetric { metric: "jaccard index" });
        }
        Ok(self.intersection() as f64 / self.union as f64)
    }

    pub fn jaccard_distance(&self) -> Result<f64> {
        if self.union == 0 {
            return Err(ColourError::UndefinedMetric { metric: "jaccard distance" });
        }
        Ok(1.0 - self.jaccard_index()?)
    }

    pub fn symmetric_difference(&self) -> u64 {
        self.union.saturating_sub(self.intersection())
    }

    /// Elements of A not in B
    pub fn difference(&self) -> u64 {
        self.count_a.saturating_sub(self.intersection())
    }

    pub fn metrics(&self) -> PairMetrics {
        PairMetrics {
            count_a: self.count_a,
            count_b: self.count_b,
            union: self.union(),
            intersection: self.intersection(),
            symmetric_difference: self.symmetric_difference(),
            difference: self.difference(),
            jaccard_index: self.jaccard_index().ok(),
            jaccard_distance: self.jaccard_distance().ok(),
        }
    }
}

/// Every pairwise metric, computed from one read of the counts.
/// Ratios are `None` when the union is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairMetrics {
    pub count_a: u64,
    pub count_b: u64,
    pub union: u64,
    pub intersection: u64,
    pub symmetric_difference: u64,
    pub difference: u64,
    pub jaccard_index: Option<f64>,
    pub jaccard_distance: Option<f64>,
}
