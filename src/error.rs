//! Error types for the colour index.
//!
//! Library code returns [`Result`]; the binary reports errors and exits.

use thiserror::Error;

/// Main error type for colour index operations
#[derive(Error, Debug)]
pub enum ColourError {
    /// A sample with this name is already registered
    #[error("{sample} already exists in the db")]
    AlreadyExists { sample: String },

    /// No sample with this name is registered
    #[error("sample not found: {sample}")]
    SampleNotFound { sample: String },

    /// Colour outside the registered range `0..num_colours`
    #[error("colour {colour} is not registered ({num_colours} colours)")]
    UnknownColour { colour: u64, num_colours: u64 },

    /// No diff record entry at this index for the primary colour
    #[error("no diff entry at index {index} for primary colour {colour}")]
    DiffNotFound { colour: u64, index: usize },

    /// A ratio whose denominator (the union estimate) is zero
    #[error("{metric} is undefined for an empty union")]
    UndefinedMetric { metric: &'static str },

    /// K-mer of the wrong length or containing non-ACGT characters
    #[error("invalid k-mer '{kmer}': {reason}")]
    InvalidKmer { kmer: String, reason: String },

    /// Query threshold outside [0, 1]
    #[error("threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    /// Invalid configuration or snapshot
    #[error("configuration error: {message}")]
    Config { message: String },

    /// The membership store or registry backend failed or holds corrupt state
    #[error("backend unavailable: {message}")]
    Backend { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for Results using ColourError
pub type Result<T> = std::result::Result<T, ColourError>;

impl ColourError {
    pub fn invalid_kmer(kmer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKmer {
            kmer: kmer.into(),
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
