use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "colourdb", version, about = "Colour-indexed k-mer membership index", long_about = None)]
pub struct Cli {
    /// Index snapshot to load and update (.gz for compressed)
    #[arg(long, global = true, default_value = "colourdb.json")]
    pub db: PathBuf,

    /// Index configuration (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Number of threads
    #[arg(long, global = true, default_value_t = num_cpus::get())]
    pub threads: usize,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where k-mers for a command come from
#[derive(Args, Debug)]
pub struct KmerInput {
    /// K-mer to use (repeatable)
    #[arg(short, long = "kmer")]
    pub kmers: Vec<String>,

    /// FASTA(.gz) file whose sequences are split into k-mers
    #[arg(short, long)]
    pub fasta: Option<PathBuf>,

    /// K-mers are already canonical; skip canonicalization
    #[arg(long)]
    pub as_given: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a sample and print its colour
    AddSample {
        name: String,
    },

    /// Insert k-mers under a registered sample
    Insert {
        sample: String,

        #[command(flatten)]
        input: KmerInput,
    },

    /// Store a secondary sample as its diff against a primary sample
    InsertSecondary {
        primary: String,

        secondary: String,

        #[command(flatten)]
        input: KmerInput,
    },

    /// Print the k-mer at a position of a primary sample's stored diffs
    LookupDiff {
        primary: String,

        index: usize,
    },

    /// Report which samples contain the given k-mers
    Query {
        #[command(flatten)]
        input: KmerInput,

        /// Minimum fraction of k-mers a sample must contain
        #[arg(short, long, default_value_t = 1.0)]
        threshold: f64,
    },

    /// Pairwise set metrics between two samples
    Compare {
        sample_a: String,

        sample_b: String,
    },

    /// List registered samples by colour
    Samples,

    /// Store and registry statistics
    Stats,

    /// Delete every sample and k-mer
    Reset,
}
