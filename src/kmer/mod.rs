//! K-mer encoding, hashing and the Bloom filters that hold per-colour sets.

pub mod bloom;
pub mod kmer;
pub mod nthash;
