//! Big-endian word codec shared by the scalar and vector paths.
//!
//! SM3 is specified over big-endian 32-bit words. Every block load and
//! every digest store in this crate goes through this module so the
//! endianness contract has a single home.

use crate::Digest;

/// Loads one 32-bit word from four big-endian bytes.
#[inline]
#[must_use]
pub(crate) fn load_be32(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

/// Stores one 32-bit word as four big-endian bytes.
#[inline]
#[must_use]
pub(crate) fn store_be32(word: u32) -> [u8; 4] {
    word.to_be_bytes()
}

/// Serializes an 8-word chaining value into a 32-byte digest.
#[inline]
pub(crate) fn serialize_state(state: &[u32; 8]) -> Digest {
    let mut digest = [0u8; 32];
    for (chunk, word) in digest.chunks_exact_mut(4).zip(state) {
        chunk.copy_from_slice(&store_be32(*word));
    }
    digest
}
