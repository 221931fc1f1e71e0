// src/kmer/nthash.rs
//! ntHash over 2-bit packed k-mers.
//!
//! The per-colour Bloom filters and the shard router both need a hash that is
//! identical in every process, so that dumped indexes stay valid after reload
//! and every client routes a k-mer to the same shard. ntHash is seed-free and
//! only depends on the bases.
//!
//! Reference: Mohamadi, H., Chu, J., Vandervalk, B. P., & Birol, I. (2016).
//! ntHash: recursive nucleotide hashing. Bioinformatics, 32(22), 3492-3494.

/// ntHash constants for each nucleotide, indexed by 2-bit code (A, C, G, T)
const NT_PACKED: [u64; 4] = [
    0x3c8bfbb395c60474,
    0x3193c18562a02b4c,
    0x20323ed082572324,
    0x295549f54be24456,
];

/// Forward ntHash of a packed k-mer of length `k`.
///
/// The k-mer is hashed as stored: canonicalization, if wanted, happens before.
#[inline]
pub fn nthash_packed(code: u64, k: usize) -> u64 {
    let mut hash = 0u64;
    for i in (0..k).rev() {
        let base = ((code >> (2 * i)) & 0b11) as usize;
        hash = hash.rotate_left(1) ^ NT_PACKED[base];
    }
    mix64(hash)
}

/// Finalizer from splitmix64. The Bloom filter indexes with the low bits and
/// the shard router with the high bits; both need to be well mixed.
#[inline]
fn mix64(mut x: u64) -> u64 {
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}
