//! Scalar SM3 implementation: the one-block compression function, the
//! streaming hasher, and the fused one-shot digest.

use std::fmt;
use std::io::{self, Read};

use crate::codec;
use crate::padding::{self, BLOCK_LEN};
use crate::Digest;

/// Initial chaining value from GB/T 32905.
pub(crate) const IV: [u32; 8] = [
    0x7380_166f,
    0x4914_b2b9,
    0x1724_42d7,
    0xda8a_0600,
    0xa96f_30bc,
    0x1631_38aa,
    0xe38d_ee4d,
    0xb0fb_0e4e,
];

/// Round constant bases for rounds 0..16 and 16..64.
const T0: u32 = 0x79cc_4519;
const T1: u32 = 0x7a87_9d8a;

/// The 64 round constants, each pre-rotated by its round index. Computed
/// at compile time and shared with the vector path, so there is no runtime
/// table initialization to guard.
pub(crate) const T_ROTATED: [u32; 64] = {
    let mut table = [0u32; 64];
    let mut j = 0;
    while j < 64 {
        let base = if j < 16 { T0 } else { T1 };
        table[j] = base.rotate_left(j as u32);
        j += 1;
    }
    table
};

/// Longest supported message in bytes: the padded bit length must fit the
/// 64-bit length field, so SM3 caps messages at 2^64 - 1 bits.
const MAX_MESSAGE_LEN: u64 = (1 << 61) - 1;

#[inline(always)]
fn ff0(x: u32, y: u32, z: u32) -> u32 {
    x ^ y ^ z
}

#[inline(always)]
fn ff1(x: u32, y: u32, z: u32) -> u32 {
    (x & y) | (x & z) | (y & z)
}

#[inline(always)]
fn gg0(x: u32, y: u32, z: u32) -> u32 {
    x ^ y ^ z
}

#[inline(always)]
fn gg1(x: u32, y: u32, z: u32) -> u32 {
    (x & y) | (!x & z)
}

#[inline(always)]
fn p0(x: u32) -> u32 {
    x ^ x.rotate_left(9) ^ x.rotate_left(17)
}

#[inline(always)]
fn p1(x: u32) -> u32 {
    x ^ x.rotate_left(15) ^ x.rotate_left(23)
}

/// One SM3 compression step: expands the 64-byte block into the message
/// schedule, runs the 64 rounds, and folds the result back into `state`
/// with the XOR combine. Pure function of its two inputs.
pub(crate) fn compress(state: &mut [u32; 8], block: &[u8; 64]) {
    // Message expansion: 16 loaded words extended to 68.
    let mut w = [0u32; 68];
    for (word, chunk) in w.iter_mut().zip(block.chunks_exact(4)) {
        *word = codec::load_be32(chunk.try_into().unwrap());
    }
    for j in 16..68 {
        w[j] = p1(w[j - 16] ^ w[j - 9] ^ w[j - 3].rotate_left(15))
            ^ w[j - 13].rotate_left(7)
            ^ w[j - 6];
    }
    let mut ww = [0u32; 64];
    for j in 0..64 {
        ww[j] = w[j] ^ w[j + 4];
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for j in 0..64 {
        let a12 = a.rotate_left(12);
        let ss1 = a12
            .wrapping_add(e)
            .wrapping_add(T_ROTATED[j])
            .rotate_left(7);
        let ss2 = ss1 ^ a12;

        let (ff, gg) = if j < 16 {
            (ff0(a, b, c), gg0(e, f, g))
        } else {
            (ff1(a, b, c), gg1(e, f, g))
        };

        let tt1 = ff.wrapping_add(d).wrapping_add(ss2).wrapping_add(ww[j]);
        let tt2 = gg.wrapping_add(h).wrapping_add(ss1).wrapping_add(w[j]);

        d = c;
        c = b.rotate_left(9);
        b = a;
        a = tt1;
        h = g;
        g = f.rotate_left(19);
        f = e;
        e = p0(tt2);
    }

    state[0] ^= a;
    state[1] ^= b;
    state[2] ^= c;
    state[3] ^= d;
    state[4] ^= e;
    state[5] ^= f;
    state[6] ^= g;
    state[7] ^= h;
}

/// Computes the SM3 digest of `data` in one shot.
///
/// Compresses full blocks straight from the input slice and assembles the
/// final padded block(s) on the stack, so no hasher state is allocated.
/// Byte-identical to running [`Sm3`] over the same bytes.
pub(crate) fn digest(data: &[u8]) -> Digest {
    let mut state = IV;

    let mut blocks = data.chunks_exact(BLOCK_LEN);
    for block in blocks.by_ref() {
        compress(&mut state, block.try_into().unwrap());
    }
    let trailing = blocks.remainder();

    let bit_len = (data.len() as u64) * 8;
    let mut tail = [0u8; 2 * BLOCK_LEN];
    tail[..trailing.len()].copy_from_slice(trailing);
    let used =
        trailing.len() + padding::write_padding(trailing.len(), bit_len, &mut tail[trailing.len()..]);

    for block in tail[..used].chunks_exact(BLOCK_LEN) {
        compress(&mut state, block.try_into().unwrap());
    }

    codec::serialize_state(&state)
}

/// Streaming SM3 hasher.
///
/// Buffers partial blocks across [`update`](Self::update) calls and
/// compresses once per full 64-byte block. The digest is produced by
/// [`finalize`](Self::finalize), which consumes the hasher.
///
/// # Examples
///
/// Incremental hashing:
///
/// ```
/// use sm3_simd::Sm3;
///
/// let mut hasher = Sm3::new();
/// hasher.update(b"chunk 1");
/// hasher.update(b"chunk 2");
/// let digest = hasher.finalize();
///
/// // Equivalent to one-shot
/// assert_eq!(digest, Sm3::digest(b"chunk 1chunk 2"));
/// ```
#[derive(Clone)]
pub struct Sm3 {
    state: [u32; 8],
    /// Total message bytes absorbed so far; the finalize length field is
    /// derived from this, so it is checked rather than allowed to wrap.
    total_len: u64,
    buffer: [u8; BLOCK_LEN],
    buffered: usize,
}

impl Sm3 {
    /// Default buffer length used by [`update_reader`](Self::update_reader).
    pub const DEFAULT_READER_BUFFER_LEN: usize = 32 * 1024;

    /// Creates a hasher with an empty state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: IV,
            total_len: 0,
            buffer: [0; BLOCK_LEN],
            buffered: 0,
        }
    }

    /// Feeds additional bytes into the digest state.
    ///
    /// Handles inputs that exactly fill, partially fill, or span multiple
    /// block boundaries in one call; full blocks are compressed straight
    /// from `data` without an intermediate copy.
    ///
    /// # Panics
    ///
    /// Panics if the total message length would exceed 2^64 - 1 bits
    /// (2^61 - 1 bytes), the longest message SM3's length field can
    /// represent. The counter never silently wraps.
    pub fn update(&mut self, data: &[u8]) {
        self.total_len = self
            .total_len
            .checked_add(data.len() as u64)
            .filter(|&total| total <= MAX_MESSAGE_LEN)
            .expect("SM3 message length limit of 2^64 - 1 bits exceeded");
        self.absorb(data);
    }

    /// Streams `reader` to completion into the hasher using a 32 KiB
    /// intermediate buffer, returning the number of bytes consumed.
    ///
    /// Reads interrupted by a signal are retried.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> std::io::Result<()> {
    /// use sm3_simd::Sm3;
    /// use std::io::Cursor;
    ///
    /// let mut hasher = Sm3::new();
    /// let consumed = hasher.update_reader(&mut Cursor::new(b"streamed bytes"))?;
    /// assert_eq!(consumed, 14);
    /// assert_eq!(hasher.finalize(), Sm3::digest(b"streamed bytes"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn update_reader<R: Read>(&mut self, reader: &mut R) -> io::Result<u64> {
        let mut buffer = vec![0u8; Self::DEFAULT_READER_BUFFER_LEN];
        self.update_reader_with_buffer(reader, &mut buffer)
    }

    /// Streams `reader` to completion using the caller's buffer.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidInput`] if `buffer` is empty, and
    /// propagates any read error other than `Interrupted`.
    pub fn update_reader_with_buffer<R: Read>(
        &mut self,
        reader: &mut R,
        buffer: &mut [u8],
    ) -> io::Result<u64> {
        if buffer.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "digest reader buffer must not be empty",
            ));
        }

        let mut total = 0u64;
        loop {
            match reader.read(buffer) {
                Ok(0) => break,
                Ok(n) => {
                    self.update(&buffer[..n]);
                    total += n as u64;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(total)
    }

    /// Finalises the digest and returns the 256-bit SM3 output.
    ///
    /// Appends the standard padding through the same block-absorbing path
    /// as [`update`](Self::update), then serializes the chaining value
    /// big-endian. Consumes the hasher; a fresh message needs a fresh
    /// [`Sm3::new`].
    #[must_use]
    pub fn finalize(mut self) -> Digest {
        let bit_len = self.total_len * 8;
        let mut pad = [0u8; 72];
        let written = padding::write_padding(self.buffered, bit_len, &mut pad);
        self.absorb(&pad[..written]);
        debug_assert_eq!(self.buffered, 0);

        codec::serialize_state(&self.state)
    }

    /// Convenience helper that computes the SM3 digest for `data` in one
    /// shot.
    ///
    /// # Examples
    ///
    /// ```
    /// use sm3_simd::Sm3;
    ///
    /// let digest = Sm3::digest(b"abc");
    /// assert_eq!(digest[..4], [0x66, 0xc7, 0xf0, 0xf4]);
    /// ```
    #[must_use]
    pub fn digest(data: &[u8]) -> Digest {
        digest(data)
    }

    /// Appends bytes to the pending buffer and compresses every full
    /// block. Length accounting stays in `update` so the padding bytes
    /// fed by `finalize` can reuse this path.
    fn absorb(&mut self, mut data: &[u8]) {
        if self.buffered > 0 {
            let take = (BLOCK_LEN - self.buffered).min(data.len());
            self.buffer[self.buffered..self.buffered + take].copy_from_slice(&data[..take]);
            self.buffered += take;
            data = &data[take..];

            if self.buffered == BLOCK_LEN {
                compress(&mut self.state, &self.buffer);
                self.buffered = 0;
            }
        }

        let mut blocks = data.chunks_exact(BLOCK_LEN);
        for block in blocks.by_ref() {
            compress(&mut self.state, block.try_into().unwrap());
        }

        let rest = blocks.remainder();
        if !rest.is_empty() {
            self.buffer[..rest.len()].copy_from_slice(rest);
            self.buffered = rest.len();
        }
    }
}

impl Default for Sm3 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sm3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sm3")
            .field("total_len", &self.total_len)
            .field("buffered", &self.buffered)
            .finish_non_exhaustive()
    }
}
