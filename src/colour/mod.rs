//! Colours: the registry mapping samples to colour indices, and the
//! per-k-mer colour bit-vectors produced by membership stores.

pub mod bitvector;
pub mod registry;

pub use bitvector::ColourBitVector;
pub use registry::{ColourRegistry, MemoryRegistryBackend, RegistryBackend, RegistrySnapshot};

/// Label used for a colour with no registered sample.
pub const MISSING_SAMPLE: &str = "missing";
