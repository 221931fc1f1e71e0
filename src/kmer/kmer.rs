use crate::config::MAX_KMER_SIZE;
use crate::error::{ColourError, Result};
use bio::alphabets::dna;

pub type Kmer = String;

/// A k-mer as submitted by a caller: raw text or the 2-bit packed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KmerRef<'a> {
    Seq(&'a str),
    Packed(u64),
}

impl<'a> From<&'a str> for KmerRef<'a> {
    fn from(seq: &'a str) -> Self {
        KmerRef::Seq(seq)
    }
}

impl From<u64> for KmerRef<'_> {
    fn from(code: u64) -> Self {
        KmerRef::Packed(code)
    }
}

/// Whether a k-mer is reduced to its canonical form before storage or lookup.
///
/// Callers that canonicalized upstream pass `AsGiven` to skip the work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KmerMode {
    Canonical,
    AsGiven,
}

#[inline]
fn base_code(b: u8) -> Option<u64> {
    match b {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

/// Encodes a DNA k-mer to a 64-bit integer (2 bits per nucleotide, max 32-mer)
pub fn encode_kmer(seq: &str) -> Option<u64> {
    if seq.len() > MAX_KMER_SIZE {
        return None;
    }
    let mut val: u64 = 0;
    for &b in seq.as_bytes() {
        val = (val << 2) | base_code(b)?;
    }
    Some(val)
}

/// Decodes a packed k-mer of length `k` back to upper-case text
pub fn decode_kmer(code: u64, k: usize) -> Kmer {
    (0..k)
        .rev()
        .map(|i| BASES[((code >> (2 * i)) & 0b11) as usize])
        .collect()
}

/// Returns the canonical form of a k-mer (lexicographically smaller of forward and reverse complement)
pub fn canonical_kmer(seq: &str) -> Option<Kmer> {
    if !seq.bytes().all(|b| base_code(b).is_some()) {
        return None;
    }

    let seq = seq.to_ascii_uppercase();
    let rc = reverse_complement(&seq);
    if seq <= rc {
        Some(seq)
    } else {
        Some(rc)
    }
}

/// Returns the reverse complement of a DNA sequence
pub fn reverse_complement(seq: &str) -> Kmer {
    dna::revcomp(seq.as_bytes()).into_iter().map(char::from).collect()
}

/// Reverse complement of a packed k-mer of length `k`
#[inline]
pub fn reverse_complement_packed(code: u64, k: usize) -> u64 {
    let mut fwd = code;
    let mut rc = 0u64;
    for _ in 0..k {
        // complement of a 2-bit base is 3 - base
        rc = (rc << 2) | (0b11 ^ (fwd & 0b11));
        fwd >>= 2;
    }
    rc
}

/// Canonical packed k-mer. The packing keeps A<C<G<T, so the numeric minimum
/// is the lexicographic minimum.
#[inline]
pub fn canonical_packed(code: u64, k: usize) -> u64 {
    code.min(reverse_complement_packed(code, k))
}

/// Fixed-length k-mer codec: validation, packing, and canonicalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerCodec {
    k: usize,
}

impl KmerCodec {
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 || k > MAX_KMER_SIZE {
            return Err(ColourError::config(format!(
                "k-mer size must be within 1..={} (got {})",
                MAX_KMER_SIZE, k
            )));
        }
        Ok(Self { k })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    fn mask(&self) -> u64 {
        if self.k == MAX_KMER_SIZE {
            u64::MAX
        } else {
            (1u64 << (2 * self.k)) - 1
        }
    }

    pub fn encode(&self, seq: &str) -> Result<u64> {
        if seq.len() != self.k {
            return Err(ColourError::invalid_kmer(
                seq,
                format!("expected length {}, got {}", self.k, seq.len()),
            ));
        }
        encode_kmer(seq).ok_or_else(|| ColourError::invalid_kmer(seq, "contains non-ACGT characters"))
    }

    pub fn decode(&self, code: u64) -> Kmer {
        decode_kmer(code, self.k)
    }

    pub fn canonical(&self, code: u64) -> u64 {
        canonical_packed(code, self.k)
    }

    /// Pack a caller-supplied k-mer, canonicalizing it when `mode` asks for it.
    pub fn prepare(&self, kmer: KmerRef<'_>, mode: KmerMode) -> Result<u64> {
        let code = match kmer {
            KmerRef::Seq(seq) => self.encode(seq)?,
            KmerRef::Packed(code) => {
                if code & !self.mask() != 0 {
                    return Err(ColourError::invalid_kmer(
                        format!("{:#x}", code),
                        format!("packed value wider than {} bases", self.k),
                    ));
                }
                code
            }
        };

        Ok(match mode {
            KmerMode::Canonical => self.canonical(code),
            KmerMode::AsGiven => code,
        })
    }

    pub fn prepare_all(&self, kmers: &[KmerRef<'_>], mode: KmerMode) -> Result<Vec<u64>> {
        kmers.iter().map(|&kmer| self.prepare(kmer, mode)).collect()
    }

    /// All k-length windows of `seq` that contain only ACGT, in order.
    pub fn windows<'a>(&self, seq: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let k = self.k;
        let end = if seq.len() >= k { seq.len() - k + 1 } else { 0 };
        (0..end)
            .filter_map(move |i| seq.get(i..i + k))
            .filter(|w| w.bytes().all(|b| base_code(b).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const K31: &str = "ACGTTGCATGTCGCATGATGCATGAGAGCTA";

    #[test]
    fn test_encode_decode() {
        let code = encode_kmer("ACGT").unwrap();
        assert_eq!(code, 0b00_01_10_11);
        assert_eq!(decode_kmer(code, 4), "ACGT");
        assert!(encode_kmer("ACNT").is_none());
    }

    #[test]
    fn test_canonical_kmer() {
        // TTT reverse complements to AAA
        assert_eq!(canonical_kmer("TTT").unwrap(), "AAA");
        assert_eq!(canonical_kmer("AAA").unwrap(), "AAA");
        assert_eq!(canonical_kmer("acg").unwrap(), "ACG");
        assert!(canonical_kmer("ANA").is_none());
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement("ATCG"), "CGAT");
        let k = 4;
        let code = encode_kmer("ATCG").unwrap();
        assert_eq!(decode_kmer(reverse_complement_packed(code, k), k), "CGAT");
    }

    #[test]
    fn test_packed_canonical_matches_text() {
        let codec = KmerCodec::new(31).unwrap();
        let code = codec.encode(K31).unwrap();
        let expected = canonical_kmer(K31).unwrap();
        assert_eq!(codec.decode(codec.canonical(code)), expected);
    }

    #[test]
    fn test_prepare_modes() {
        let codec = KmerCodec::new(3).unwrap();
        let ttt = codec.prepare(KmerRef::Seq("TTT"), KmerMode::AsGiven).unwrap();
        assert_eq!(codec.decode(ttt), "TTT");
        let canon = codec.prepare(KmerRef::Seq("TTT"), KmerMode::Canonical).unwrap();
        assert_eq!(codec.decode(canon), "AAA");
        let packed = codec.prepare(KmerRef::Packed(ttt), KmerMode::Canonical).unwrap();
        assert_eq!(packed, canon);
    }

    #[test]
    fn test_prepare_rejects_bad_input() {
        let codec = KmerCodec::new(4).unwrap();
        assert!(matches!(
            codec.prepare(KmerRef::Seq("ACG"), KmerMode::AsGiven),
            Err(ColourError::InvalidKmer { .. })
        ));
        assert!(codec.prepare(KmerRef::Seq("ACGN"), KmerMode::AsGiven).is_err());
        assert!(codec.prepare(KmerRef::Packed(1 << 8), KmerMode::AsGiven).is_err());
    }

    #[test]
    fn test_full_width_k() {
        let codec = KmerCodec::new(32).unwrap();
        let seq = "TTTTTTTTTTTTTTTTTTTTTTTTTTTTTTTT";
        let code = codec.encode(seq).unwrap();
        assert_eq!(code, u64::MAX);
        assert_eq!(codec.decode(code), seq);
        assert_eq!(codec.decode(codec.canonical(code)), "A".repeat(32));
    }

    #[test]
    fn test_windows_skip_invalid() {
        let codec = KmerCodec::new(3).unwrap();
        let windows: Vec<&str> = codec.windows("ACGNTACG").collect();
        assert_eq!(windows, vec!["ACG", "TAC", "ACG"]);
        assert_eq!(codec.windows("AC").count(), 0);
    }

    #[test]
    fn test_codec_size_bounds() {
        assert!(KmerCodec::new(0).is_err());
        assert!(KmerCodec::new(33).is_err());
    }
}
