//! Packed 1-bit flags over bones × track kinds.
//!
//! Bit index is `bone * 2 + k` with k = 0 for rotation and k = 1 for
//! translation, MSB-first within each 32-bit word.

use byteorder::{ByteOrder, LittleEndian};

/// Track kinds carried per bone: rotation and translation.
pub(crate) const TRACKS_PER_BONE: usize = 2;

/// Number of 32-bit words needed to hold `num_bits` flags.
pub(crate) fn num_words(num_bits: usize) -> usize {
    num_bits.div_ceil(32)
}

pub(crate) fn rotation_bit(bone: usize) -> usize {
    bone * TRACKS_PER_BONE
}

pub(crate) fn translation_bit(bone: usize) -> usize {
    bone * TRACKS_PER_BONE + 1
}

pub(crate) fn set(words: &mut [u32], index: usize, value: bool) {
    let mask = 1u32 << (31 - (index % 32));
    if value {
        words[index / 32] |= mask;
    } else {
        words[index / 32] &= !mask;
    }
}

/// Tests a bit in a little-endian serialized bitset region.
pub(crate) fn test_bytes(bytes: &[u8], index: usize) -> bool {
    let word = LittleEndian::read_u32(&bytes[(index / 32) * 4..]);
    word >> (31 - (index % 32)) & 1 == 1
}
