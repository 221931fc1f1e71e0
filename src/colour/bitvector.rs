//! Per-k-mer colour presence bit-vectors.
//!
//! Bit `i` set means the k-mer is asserted present in colour `i` by the
//! approximate membership structure. Bits are laid out most-significant-first
//! within each byte (bit 0 is the top bit of byte 0), the layout used by
//! key-value stores that expose `SETBIT`/`GETBIT`.

use bitvec::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColourBitVector {
    bits: BitVec<u8, Msb0>,
}

impl ColourBitVector {
    /// Wrap raw bytes fetched from a membership store.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bits: BitVec::from_vec(bytes),
        }
    }

    /// All-zero vector wide enough for `num_colours` colours.
    pub(crate) fn with_colours(num_colours: usize) -> Self {
        Self {
            bits: bitvec![u8, Msb0; 0; num_colours],
        }
    }

    pub(crate) fn set(&mut self, colour: u64) {
        let colour = colour as usize;
        if colour >= self.bits.len() {
            self.bits.resize(colour + 1, false);
        }
        self.bits.set(colour, true);
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }

    /// Colours whose bit is set. Empty for a k-mer absent from every colour.
    pub fn colours(&self) -> BTreeSet<u64> {
        self.bits.iter_ones().map(|c| c as u64).collect()
    }

    pub fn contains(&self, colour: u64) -> bool {
        self.bits
            .get(colour as usize)
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    /// Width in bits.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True when no colour is asserted, whatever the width.
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_msb_first() {
        // 0b1010_0000, 0b0000_0001 -> colours 0, 2, 15
        let bv = ColourBitVector::from_bytes(vec![0b1010_0000, 0b0000_0001]);
        let colours: Vec<u64> = bv.colours().into_iter().collect();
        assert_eq!(colours, vec![0, 2, 15]);
        assert!(bv.contains(2));
        assert!(!bv.contains(1));
        assert!(!bv.contains(400));
    }

    #[test]
    fn test_empty_vector_is_not_an_error() {
        let bv = ColourBitVector::from_bytes(Vec::new());
        assert!(bv.colours().is_empty());
        assert!(bv.is_empty());

        let zeros = ColourBitVector::from_bytes(vec![0, 0, 0]);
        assert!(zeros.colours().is_empty());
        assert!(zeros.is_empty());
    }

    #[test]
    fn test_set_grows_and_round_trips_bytes() {
        let mut bv = ColourBitVector::with_colours(3);
        bv.set(1);
        bv.set(9);
        assert_eq!(bv.len(), 10);
        assert_eq!(bv.as_bytes(), &[0b0100_0000, 0b0100_0000]);

        let decoded = ColourBitVector::from_bytes(bv.as_bytes().to_vec());
        assert_eq!(decoded.colours(), bv.colours());
    }
}
