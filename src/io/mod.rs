pub mod fasta;
pub mod snapshot;
