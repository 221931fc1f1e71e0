//! Turning colour sets into per-sample answers.

use crate::colour::{ColourBitVector, MISSING_SAMPLE};
use crate::error::{ColourError, Result};
use ahash::AHashMap;
use std::collections::BTreeMap;
use tracing::warn;

/// Sample name for `colour`, or the `missing` label for an unregistered colour.
fn sample_label(colour: u64, samples: &BTreeMap<u64, String>) -> &str {
    match samples.get(&colour) {
        Some(name) => name.as_str(),
        None => {
            warn!("Colour {} has no registered sample", colour);
            MISSING_SAMPLE
        }
    }
}

/// Samples asserted present by one bit-vector.
pub fn presence(bv: &ColourBitVector, samples: &BTreeMap<u64, String>) -> BTreeMap<String, bool> {
    bv.colours()
        .into_iter()
        .map(|colour| (sample_label(colour, samples).to_string(), true))
        .collect()
}

pub fn check_threshold(threshold: f64) -> Result<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ColourError::InvalidThreshold(threshold))
    }
}

/// Fraction of the batch each sample is present in, keeping fractions >= `threshold`.
/// `threshold` is expected to have passed [`check_threshold`].
///
/// Each bit-vector counts once, so duplicated k-mers in the batch weigh as many
/// times as they appear. Several unregistered colours share the `missing` label;
/// the highest fraction among them is reported.
pub fn hit_fractions(
    bit_vectors: &[ColourBitVector],
    samples: &BTreeMap<u64, String>,
    threshold: f64,
) -> BTreeMap<String, f64> {
    if bit_vectors.is_empty() {
        return BTreeMap::new();
    }

    let mut hits: AHashMap<u64, usize> = AHashMap::new();
    for bv in bit_vectors {
        for colour in bv.colours() {
            *hits.entry(colour).or_insert(0) += 1;
        }
    }

    let total = bit_vectors.len() as f64;
    let mut out = BTreeMap::new();
    for (colour, count) in hits {
        let fraction = count as f64 / total;
        if fraction >= threshold {
            let entry = out
                .entry(sample_label(colour, samples).to_string())
                .or_insert(fraction);
            *entry = entry.max(fraction);
        }
    }
    out
}
