//! The colour index: sample registry, membership store and the queries
//! built on top of them.
//!
//! Every k-mer-taking operation names its [`KmerMode`]; nothing is
//! canonicalized behind the caller's back. Nothing is cached between calls:
//! colours and counts are re-read from the registry and store each time, so
//! concurrent registrations and inserts from other clients are never masked.

pub mod algebra;
pub mod diff;
pub mod query;

use crate::colour::{ColourBitVector, ColourRegistry};
use crate::config::IndexConfig;
use crate::error::{ColourError, Result};
use crate::io::snapshot::{read_snapshot, write_snapshot, IndexSnapshot};
use crate::kmer::kmer::{Kmer, KmerCodec, KmerMode, KmerRef};
use crate::store::{create_store, restore_store, MembershipStore};
use algebra::{PairCounts, PairMetrics};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, info_span, Span};

pub struct ColourIndex {
    config: IndexConfig,
    codec: KmerCodec,
    registry: ColourRegistry,
    store: Box<dyn MembershipStore>,
    span: Span,
}

impl ColourIndex {
    /// Build an index whose store is chosen by `config.storage`.
    ///
    /// `span` scopes every log line the index emits; pass
    /// [`ColourIndex::default_span`] when the caller has none.
    pub fn new(config: IndexConfig, registry: ColourRegistry, span: Span) -> Result<Self> {
        config.validate()?;
        let store = create_store(config.kmer_size, &config.storage, &config.bloom);
        Self::with_store(config, registry, store, span)
    }

    /// Build an index around an existing store (e.g. remote shards).
    pub fn with_store(
        config: IndexConfig,
        registry: ColourRegistry,
        store: Box<dyn MembershipStore>,
        span: Span,
    ) -> Result<Self> {
        let codec = KmerCodec::new(config.kmer_size)?;
        Ok(Self {
            config,
            codec,
            registry,
            store,
            span,
        })
    }

    /// Index with an in-process registry.
    pub fn in_memory(config: IndexConfig) -> Result<Self> {
        let span = Self::default_span(&config);
        Self::new(config, ColourRegistry::in_memory(), span)
    }

    pub fn default_span(config: &IndexConfig) -> Span {
        info_span!("colour_index", name = %config.name)
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn codec(&self) -> &KmerCodec {
        &self.codec
    }

    pub fn registry(&self) -> &ColourRegistry {
        &self.registry
    }

    // Samples

    /// Register a sample; returns its colour.
    pub fn add_sample(&self, sample: &str) -> Result<u64> {
        let _enter = self.span.enter();
        self.registry.register(sample)
    }

    pub fn sample_colour(&self, sample: &str) -> Result<Option<u64>> {
        let _enter = self.span.enter();
        self.registry.colour_of(sample)
    }

    pub fn colours_to_samples(&self) -> Result<BTreeMap<u64, String>> {
        let _enter = self.span.enter();
        self.registry.samples_by_colour()
    }

    pub fn num_colours(&self) -> Result<u64> {
        let _enter = self.span.enter();
        self.registry.colour_count()
    }

    /// Colours are only written once registered. The count is re-read on
    /// every call so registrations by other clients are seen.
    fn require_registered(&self, colour: u64) -> Result<()> {
        let num_colours = self.registry.colour_count()?;
        if colour < num_colours {
            Ok(())
        } else {
            Err(ColourError::UnknownColour { colour, num_colours })
        }
    }

    // Insertion

    pub fn insert_kmer(&self, kmer: KmerRef<'_>, colour: u64, mode: KmerMode) -> Result<()> {
        let _enter = self.span.enter();
        self.require_registered(colour)?;
        let code = self.codec.prepare(kmer, mode)?;
        self.store.insert(colour, code)
    }

    pub fn insert_kmers(&self, kmers: &[KmerRef<'_>], colour: u64, mode: KmerMode) -> Result<()> {
        let _enter = self.span.enter();
        self.require_registered(colour)?;
        let codes = self.codec.prepare_all(kmers, mode)?;
        debug!("Inserting {} k-mers into colour {}", codes.len(), colour);
        self.store.insert_batch(colour, &codes)
    }

    /// Insert every valid k-mer window of `sequence`; returns how many were inserted.
    pub fn insert_sequence(&self, sequence: &str, colour: u64, mode: KmerMode) -> Result<usize> {
        let kmers: Vec<KmerRef<'_>> = self.codec.windows(sequence).map(KmerRef::Seq).collect();
        self.insert_kmers(&kmers, colour, mode)?;
        Ok(kmers.len())
    }

    // Primary/secondary diffs

    /// K-mers not reported present under `primary_colour`, packed, in input order.
    pub fn diff_against_primary(
        &self,
        kmers: &[KmerRef<'_>],
        primary_colour: u64,
        mode: KmerMode,
    ) -> Result<Vec<u64>> {
        let _enter = self.span.enter();
        let codes = self.codec.prepare_all(kmers, mode)?;
        diff::diff_against_primary(self.store.as_ref(), primary_colour, &codes)
    }

    /// Store a secondary sample as its diff against `primary_colour`; returns the diff length.
    pub fn insert_secondary_kmers(
        &self,
        kmers: &[KmerRef<'_>],
        primary_colour: u64,
        secondary_colour: u64,
        mode: KmerMode,
    ) -> Result<usize> {
        self.require_registered(primary_colour)?;
        self.require_registered(secondary_colour)?;
        let diffs = self.diff_against_primary(kmers, primary_colour, mode)?;
        self.insert_primary_secondary_diffs(primary_colour, secondary_colour, &diffs)?;
        Ok(diffs.len())
    }

    pub fn insert_primary_secondary_diffs(
        &self,
        primary_colour: u64,
        secondary_colour: u64,
        diffs: &[u64],
    ) -> Result<()> {
        let _enter = self.span.enter();
        self.require_registered(primary_colour)?;
        self.require_registered(secondary_colour)?;
        debug!(
            "Storing {} diff k-mers for colour {} against primary {}",
            diffs.len(),
            secondary_colour,
            primary_colour
        );
        self.store.insert_diff(primary_colour, secondary_colour, diffs)
    }

    pub fn lookup_primary_secondary_diff(&self, primary_colour: u64, index: usize) -> Result<Kmer> {
        let _enter = self.span.enter();
        match self.store.lookup_diff(primary_colour, index)? {
            Some(code) => Ok(self.codec.decode(code)),
            None => Err(ColourError::DiffNotFound {
                colour: primary_colour,
                index,
            }),
        }
    }

    // Colour lookup

    pub fn get_kmer_raw(&self, kmer: KmerRef<'_>, mode: KmerMode) -> Result<ColourBitVector> {
        let _enter = self.span.enter();
        let code = self.codec.prepare(kmer, mode)?;
        self.store.get(code)
    }

    pub fn get_kmers_raw(&self, kmers: &[KmerRef<'_>], mode: KmerMode) -> Result<Vec<ColourBitVector>> {
        let _enter = self.span.enter();
        let codes = self.codec.prepare_all(kmers, mode)?;
        self.store.get_batch(&codes)
    }

    pub fn get_kmer_colours(&self, kmer: KmerRef<'_>, mode: KmerMode) -> Result<BTreeSet<u64>> {
        Ok(self.get_kmer_raw(kmer, mode)?.colours())
    }

    /// Colour sets aligned with `kmers`.
    pub fn get_kmers_colours(&self, kmers: &[KmerRef<'_>], mode: KmerMode) -> Result<Vec<BTreeSet<u64>>> {
        Ok(self
            .get_kmers_raw(kmers, mode)?
            .iter()
            .map(ColourBitVector::colours)
            .collect())
    }

    // Sample queries

    /// Samples containing `kmer`. An absent k-mer gives an empty map.
    pub fn query_kmer(&self, kmer: KmerRef<'_>, mode: KmerMode) -> Result<BTreeMap<String, bool>> {
        let bv = self.get_kmer_raw(kmer, mode)?;
        let samples = self.colours_to_samples()?;
        Ok(query::presence(&bv, &samples))
    }

    /// Fraction of `kmers` each sample contains, for samples at or above `threshold`.
    pub fn query_kmers(
        &self,
        kmers: &[KmerRef<'_>],
        threshold: f64,
        mode: KmerMode,
    ) -> Result<BTreeMap<String, f64>> {
        query::check_threshold(threshold)?;
        let bit_vectors = self.get_kmers_raw(kmers, mode)?;
        let samples = self.colours_to_samples()?;
        let _enter = self.span.enter();
        debug!("Querying {} k-mers at threshold {}", kmers.len(), threshold);
        Ok(query::hit_fractions(&bit_vectors, &samples, threshold))
    }

    pub fn query_sequence(
        &self,
        sequence: &str,
        threshold: f64,
        mode: KmerMode,
    ) -> Result<BTreeMap<String, f64>> {
        let kmers: Vec<KmerRef<'_>> = self.codec.windows(sequence).map(KmerRef::Seq).collect();
        self.query_kmers(&kmers, threshold, mode)
    }

    // Set algebra

    pub fn count_kmers(&self, sample: &str) -> Result<u64> {
        let _enter = self.span.enter();
        let colour = self.registry.require_colour(sample)?;
        self.store.count(colour)
    }

    fn pair_counts(&self, sample_a: &str, sample_b: &str) -> Result<PairCounts> {
        let _enter = self.span.enter();
        let colour_a = self.registry.require_colour(sample_a)?;
        let colour_b = self.registry.require_colour(sample_b)?;
        Ok(PairCounts::new(
            self.store.count(colour_a)?,
            self.store.count(colour_b)?,
            self.store.union_count(colour_a, colour_b)?,
        ))
    }

    pub fn kmer_union(&self, sample_a: &str, sample_b: &str) -> Result<u64> {
        let _enter = self.span.enter();
        let colour_a = self.registry.require_colour(sample_a)?;
        let colour_b = self.registry.require_colour(sample_b)?;
        self.store.union_count(colour_a, colour_b)
    }

    pub fn kmer_intersection(&self, sample_a: &str, sample_b: &str) -> Result<u64> {
        Ok(self.pair_counts(sample_a, sample_b)?.intersection())
    }

    pub fn jaccard_index(&self, sample_a: &str, sample_b: &str) -> Result<f64> {
        self.pair_counts(sample_a, sample_b)?.jaccard_index()
    }

    pub fn jaccard_distance(&self, sample_a: &str, sample_b: &str) -> Result<f64> {
        self.pair_counts(sample_a, sample_b)?.jaccard_distance()
    }

    pub fn symmetric_difference(&self, sample_a: &str, sample_b: &str) -> Result<u64> {
        Ok(self.pair_counts(sample_a, sample_b)?.symmetric_difference())
    }

    /// Estimated k-mers of `sample_a` not in `sample_b`
    pub fn difference(&self, sample_a: &str, sample_b: &str) -> Result<u64> {
        Ok(self.pair_counts(sample_a, sample_b)?.difference())
    }

    pub fn compare(&self, sample_a: &str, sample_b: &str) -> Result<PairMetrics> {
        Ok(self.pair_counts(sample_a, sample_b)?.metrics())
    }

    // Maintenance

    pub fn count_keys(&self) -> Result<usize> {
        self.store.count_keys()
    }

    pub fn calculate_memory(&self) -> Result<usize> {
        self.store.memory_usage()
    }

    pub fn bitcount(&self) -> Result<u64> {
        self.store.bit_count()
    }

    /// Drop every k-mer, diff and sample.
    pub fn delete_all(&self) -> Result<()> {
        let _enter = self.span.enter();
        info!("Deleting all samples and k-mers");
        self.store.delete_all()?;
        self.registry.clear()
    }

    pub fn snapshot(&self) -> Result<IndexSnapshot> {
        Ok(IndexSnapshot {
            registry: self.registry.snapshot()?,
            store: self.store.snapshot()?,
        })
    }

    /// Write registry and store to `path` (gzip when it ends in `.gz`).
    pub fn dump(&self, path: &Path) -> Result<()> {
        let _enter = self.span.enter();
        write_snapshot(path, &self.snapshot()?)?;
        info!("Dumped index to {}", path.display());
        Ok(())
    }

    /// Rebuild an index from a file written by [`ColourIndex::dump`].
    pub fn restore(config: IndexConfig, path: &Path) -> Result<Self> {
        config.validate()?;
        let snapshot = read_snapshot(path)?;
        let store = restore_store(config.kmer_size, &config.storage, &config.bloom, snapshot.store)?;
        let registry = ColourRegistry::in_memory();
        registry.restore(&snapshot.registry)?;
        let span = Self::default_span(&config);
        Self::with_store(config, registry, store, span)
    }
}
