//! Merkle-Damgård padding for SM3.
//!
//! A padded message is the message bytes, a `0x80` terminator, zero fill,
//! and the message length in bits as a 64-bit big-endian integer, with the
//! total a multiple of the 64-byte block size. Padding needs 9 bytes of
//! room, so a trailing partial block shorter than 56 bytes absorbs it in
//! one block and anything longer spills into a second. Every padded block
//! count in this crate, scalar or batched, derives from this one policy.

/// Compression block length in bytes.
pub(crate) const BLOCK_LEN: usize = 64;

/// Offset within the final block where the bit-length field starts.
pub(crate) const LENGTH_OFFSET: usize = BLOCK_LEN - 8;

/// Total number of 64-byte blocks a message of `len` bytes occupies once
/// padded: one extra block when the trailing partial block (possibly
/// empty) has room for terminator and length field, two otherwise.
#[inline]
#[must_use]
pub(crate) fn padded_blocks(len: usize) -> usize {
    len / BLOCK_LEN + if len % BLOCK_LEN >= LENGTH_OFFSET { 2 } else { 1 }
}

/// Writes the padding for a message whose trailing partial block holds
/// `trailing` bytes (`trailing < 64`) into the front of `out`, returning
/// the number of bytes written: terminator, zero fill, and the 8-byte
/// big-endian `bit_len`. `trailing` plus the written length is always a
/// multiple of [`BLOCK_LEN`]. `out` must hold at least 72 bytes, the
/// worst case at `trailing == 56`.
pub(crate) fn write_padding(trailing: usize, bit_len: u64, out: &mut [u8]) -> usize {
    debug_assert!(trailing < BLOCK_LEN);

    let fill = if trailing < LENGTH_OFFSET {
        LENGTH_OFFSET - trailing
    } else {
        LENGTH_OFFSET + BLOCK_LEN - trailing
    };

    out[0] = 0x80;
    out[1..fill].fill(0);
    out[fill..fill + 8].copy_from_slice(&bit_len.to_be_bytes());
    fill + 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_block_while_terminator_and_length_fit() {
        assert_eq!(padded_blocks(0), 1);
        assert_eq!(padded_blocks(1), 1);
        assert_eq!(padded_blocks(55), 1);
    }

    #[test]
    fn two_blocks_once_the_length_field_spills() {
        assert_eq!(padded_blocks(56), 2);
        assert_eq!(padded_blocks(63), 2);
    }

    #[test]
    fn block_aligned_lengths_get_one_extra_block() {
        assert_eq!(padded_blocks(64), 2);
        assert_eq!(padded_blocks(128), 3);
        assert_eq!(padded_blocks(1024), 17);
    }

    #[test]
    fn multi_block_trailing_boundaries() {
        assert_eq!(padded_blocks(119), 2);
        assert_eq!(padded_blocks(120), 3);
        assert_eq!(padded_blocks(127), 3);
        assert_eq!(padded_blocks(129), 3);
    }

    #[test]
    fn written_padding_completes_the_block() {
        let mut out = [0u8; 72];
        for trailing in 0..BLOCK_LEN {
            let written = write_padding(trailing, 0, &mut out);
            assert_eq!(
                (trailing + written) % BLOCK_LEN,
                0,
                "trailing {trailing} left a ragged block"
            );
            assert!(written >= 9);
            assert_eq!(out[0], 0x80);
        }
    }

    #[test]
    fn padding_layout_for_empty_message() {
        let mut out = [0u8; 72];
        let written = write_padding(0, 0, &mut out);
        assert_eq!(written, BLOCK_LEN);
        assert_eq!(out[0], 0x80);
        assert!(out[1..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn padding_layout_at_the_spill_boundary() {
        let mut out = [0u8; 72];

        // 55 trailing bytes: terminator and length share the final block.
        let written = write_padding(55, 55 * 8, &mut out);
        assert_eq!(written, 9);
        assert_eq!(out[0], 0x80);
        assert_eq!(out[1..9], (55u64 * 8).to_be_bytes());

        // 56 trailing bytes: the length field no longer fits.
        let written = write_padding(56, 56 * 8, &mut out);
        assert_eq!(written, 72);
        assert_eq!(out[0], 0x80);
        assert!(out[1..64].iter().all(|&byte| byte == 0));
        assert_eq!(out[64..72], (56u64 * 8).to_be_bytes());
    }

    #[test]
    fn padding_length_matches_block_count() {
        for len in [0usize, 1, 54, 55, 56, 57, 63, 64, 65, 119, 120, 127, 128, 500] {
            let trailing = len % BLOCK_LEN;
            let mut out = [0u8; 72];
            let written = write_padding(trailing, (len as u64) * 8, &mut out);
            assert_eq!((len + written) / BLOCK_LEN, padded_blocks(len), "len {len}");
        }
    }
}
