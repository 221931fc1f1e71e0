//! Colour-indexed k-mer membership index.
//!
//! Samples are registered as colours; each colour keeps an approximate
//! membership set of its k-mers. On top of that the index answers which
//! samples contain a k-mer or sequence, and estimates pairwise set algebra
//! (union, intersection, Jaccard, differences) between samples.

pub mod colour;
pub mod config;
pub mod error;
pub mod index;
pub mod io;
pub mod kmer;
pub mod store;

pub use colour::{ColourBitVector, ColourRegistry, RegistryBackend, MISSING_SAMPLE};
pub use config::{BloomConfig, IndexConfig, StorageConfig};
pub use error::{ColourError, Result};
pub use index::algebra::{PairCounts, PairMetrics};
pub use index::ColourIndex;
pub use kmer::kmer::{KmerCodec, KmerMode, KmerRef};
pub use store::MembershipStore;
