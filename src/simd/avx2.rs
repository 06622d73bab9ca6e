//! AVX2 8-lane parallel SM3 implementation.
//!
//! Processes 8 independent SM3 computations simultaneously using 256-bit
//! YMM registers. The chaining value lives transposed in eight registers,
//! one per state word with one 32-bit lane per message, and an active-lane
//! mask freezes lanes that have already compressed their final block.

use std::arch::x86_64::*;

use crate::batch::LanePlan;
use crate::codec;
use crate::padding::BLOCK_LEN;
use crate::scalar::{IV, T_ROTATED};
use crate::Digest;

/// Rotate left helper - AVX2 doesn't have a rotate instruction.
#[target_feature(enable = "avx2")]
unsafe fn rotl(x: __m256i, n: i32) -> __m256i {
    _mm256_or_si256(
        _mm256_sllv_epi32(x, _mm256_set1_epi32(n)),
        _mm256_srlv_epi32(x, _mm256_set1_epi32(32 - n)),
    )
}

#[target_feature(enable = "avx2")]
unsafe fn xor3(x: __m256i, y: __m256i, z: __m256i) -> __m256i {
    _mm256_xor_si256(_mm256_xor_si256(x, y), z)
}

/// Permutation P0: `x ^ rotl(x, 9) ^ rotl(x, 17)`.
#[target_feature(enable = "avx2")]
unsafe fn p0(x: __m256i) -> __m256i {
    xor3(x, rotl(x, 9), rotl(x, 17))
}

/// Permutation P1: `x ^ rotl(x, 15) ^ rotl(x, 23)`.
#[target_feature(enable = "avx2")]
unsafe fn p1(x: __m256i) -> __m256i {
    xor3(x, rotl(x, 15), rotl(x, 23))
}

/// Majority function for rounds 16..64.
#[target_feature(enable = "avx2")]
unsafe fn ff1(x: __m256i, y: __m256i, z: __m256i) -> __m256i {
    // (x & y) | (x & z) | (y & z) == (x & (y | z)) | (y & z)
    _mm256_or_si256(
        _mm256_and_si256(x, _mm256_or_si256(y, z)),
        _mm256_and_si256(y, z),
    )
}

/// Choice function for rounds 16..64: `(x & y) | (!x & z)`.
#[target_feature(enable = "avx2")]
unsafe fn gg1(x: __m256i, y: __m256i, z: __m256i) -> __m256i {
    _mm256_or_si256(_mm256_and_si256(x, y), _mm256_andnot_si256(x, z))
}

/// One masked 8-lane SM3 compression step.
///
/// `state` holds the eight chaining values transposed (register `i` is
/// state word `i` across all lanes). `mask` carries an all-ones word for
/// every active lane and all-zeros for every finished one: the rounds run
/// over whatever block content inactive lanes carry, but the blend at the
/// end commits the XOR combine only for active lanes, so a finished
/// lane's state stays bit-for-bit untouched. Pure state transition; block
/// scheduling and padding belong to the caller.
///
/// # Safety
/// Caller must ensure AVX2 is available.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn compress8(
    state: &mut [__m256i; 8],
    mask: __m256i,
    blocks: &[[u8; BLOCK_LEN]; 8],
) {
    // Message expansion over transposed words: w[j] holds word j of all
    // 8 blocks, loaded big-endian per lane.
    let mut w = [_mm256_setzero_si256(); 68];
    #[allow(clippy::needless_range_loop)]
    for j in 0..16 {
        let words: [i32; 8] = std::array::from_fn(|lane| {
            codec::load_be32(blocks[lane][j * 4..j * 4 + 4].try_into().unwrap()) as i32
        });
        w[j] = _mm256_setr_epi32(
            words[0], words[1], words[2], words[3], words[4], words[5], words[6], words[7],
        );
    }
    for j in 16..68 {
        let x = xor3(w[j - 16], w[j - 9], rotl(w[j - 3], 15));
        w[j] = xor3(p1(x), rotl(w[j - 13], 7), w[j - 6]);
    }

    let saved = *state;
    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for j in 0..64 {
        let t = _mm256_set1_epi32(T_ROTATED[j] as i32);
        let a12 = rotl(a, 12);
        let ss1 = rotl(_mm256_add_epi32(_mm256_add_epi32(a12, e), t), 7);
        let ss2 = _mm256_xor_si256(ss1, a12);
        let ww = _mm256_xor_si256(w[j], w[j + 4]);

        // Rounds 0..16 use plain XOR for both boolean functions.
        let (ff, gg) = if j < 16 {
            (xor3(a, b, c), xor3(e, f, g))
        } else {
            (ff1(a, b, c), gg1(e, f, g))
        };

        let tt1 = _mm256_add_epi32(_mm256_add_epi32(ff, d), _mm256_add_epi32(ss2, ww));
        let tt2 = _mm256_add_epi32(_mm256_add_epi32(gg, h), _mm256_add_epi32(ss1, w[j]));

        d = c;
        c = rotl(b, 9);
        b = a;
        a = tt1;
        h = g;
        g = rotl(f, 19);
        f = e;
        e = p0(tt2);
    }

    let rounds = [a, b, c, d, e, f, g, h];
    for (word, (&before, &out)) in state.iter_mut().zip(saved.iter().zip(rounds.iter())) {
        // Blend: commit the combine for active lanes, keep the saved
        // state for inactive ones.
        let combined = _mm256_xor_si256(before, out);
        *word = _mm256_blendv_epi8(before, combined, mask);
    }
}

/// Computes SM3 digests for 8 inputs of independent lengths in parallel.
///
/// Per-lane block counts and padding content come from [`LanePlan`]; this
/// driver assembles each step's transposed blocks and active mask, then
/// lets [`compress8`] advance exactly the lanes that still have work. The
/// loop runs to the largest lane's padded block count, so every step has
/// at least one active lane.
///
/// # Safety
/// Caller must ensure AVX2 is available.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn digest_x8(inputs: &[&[u8]; 8]) -> [Digest; 8] {
    let plans: [LanePlan; 8] = std::array::from_fn(|lane| LanePlan::for_len(inputs[lane].len()));
    let max_blocks = plans
        .iter()
        .map(|plan| plan.total_blocks)
        .max()
        .expect("8 lanes");

    let mut state = [_mm256_setzero_si256(); 8];
    for (word, &iv) in state.iter_mut().zip(IV.iter()) {
        *word = _mm256_set1_epi32(iv as i32);
    }

    let mut blocks = [[0u8; BLOCK_LEN]; 8];
    for step in 0..max_blocks {
        let lane_active: [i32; 8] = std::array::from_fn(|lane| {
            if plans[lane].fill_block(inputs[lane], step, &mut blocks[lane]) {
                -1
            } else {
                0
            }
        });
        let mask = _mm256_setr_epi32(
            lane_active[0],
            lane_active[1],
            lane_active[2],
            lane_active[3],
            lane_active[4],
            lane_active[5],
            lane_active[6],
            lane_active[7],
        );

        compress8(&mut state, mask, &blocks);
    }

    let words = store_state(&state);
    std::array::from_fn(|lane| {
        let lane_state: [u32; 8] = std::array::from_fn(|i| words[i][lane]);
        codec::serialize_state(&lane_state)
    })
}

/// Spills the transposed state registers to memory: `result[i][lane]` is
/// state word `i` of `lane`.
#[target_feature(enable = "avx2")]
unsafe fn store_state(state: &[__m256i; 8]) -> [[u32; 8]; 8] {
    #[repr(C, align(32))]
    struct Aligned([u32; 8]);

    let mut out = [[0u32; 8]; 8];
    for (slot, &word) in out.iter_mut().zip(state.iter()) {
        let mut stored = Aligned([0; 8]);
        _mm256_store_si256(stored.0.as_mut_ptr() as *mut __m256i, word);
        *slot = stored.0;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar;

    fn to_hex(bytes: &[u8]) -> String {
        use std::fmt::Write;
        let mut s = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            write!(s, "{b:02x}").unwrap();
        }
        s
    }

    #[test]
    fn avx2_sm3_matches_scalar() {
        if !is_x86_feature_detected!("avx2") {
            eprintln!("AVX2 not available, skipping test");
            return;
        }

        let inputs: [&[u8]; 8] = [
            b"",
            b"a",
            b"abc",
            b"message digest",
            b"abcdefghijklmnopqrstuvwxyz",
            b"test input 5",
            b"test input 6",
            b"test input 7",
        ];

        let results = unsafe { digest_x8(&inputs) };

        for (i, input) in inputs.iter().enumerate() {
            let expected = scalar::digest(input);
            assert_eq!(
                to_hex(&results[i]),
                to_hex(&expected),
                "Mismatch at lane {i} for input {:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn avx2_sm3_standard_vectors() {
        if !is_x86_feature_detected!("avx2") {
            eprintln!("AVX2 not available, skipping test");
            return;
        }

        // The three reference vectors spread across the lanes: the
        // 64-byte one is block-aligned, so its lane pads into an extra
        // block while the short lanes are already finished.
        let inputs: [&[u8]; 8] = [
            b"",
            b"abc",
            b"abcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcd",
            b"abc",
            b"",
            b"abcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcd",
            b"abc",
            b"",
        ];

        const EMPTY: &str = "1ab21d8355cfa17f8e61194831e81a8f22bec8c728fefb747ed035eb5082aa2b";
        const ABC: &str = "66c7f0f462eeedd9d1f2d46bdc10e4e24167c4875cf2f7a2297da02b8f4ba8e0";
        const ABCD16: &str = "debe9ff92275b8a138604889c18e5a4d6fdb70e5387e5765293dcba39c0c5732";
        let expected = [EMPTY, ABC, ABCD16, ABC, EMPTY, ABCD16, ABC, EMPTY];

        let results = unsafe { digest_x8(&inputs) };

        for i in 0..8 {
            assert_eq!(
                to_hex(&results[i]),
                expected[i],
                "standard vector mismatch at lane {i}"
            );
        }
    }

    #[test]
    fn avx2_sm3_various_lengths() {
        if !is_x86_feature_detected!("avx2") {
            eprintln!("AVX2 not available, skipping test");
            return;
        }

        // Lengths straddling every padding boundary, so lanes finish at
        // different steps and the mask does real work.
        let input0: Vec<u8> = (0..55).map(|i| (i % 256) as u8).collect();
        let input1: Vec<u8> = (0..56).map(|i| (i % 256) as u8).collect();
        let input2: Vec<u8> = (0..64).map(|i| (i % 256) as u8).collect();
        let input3: Vec<u8> = (0..65).map(|i| (i % 256) as u8).collect();
        let input4: Vec<u8> = (0..128).map(|i| (i % 256) as u8).collect();
        let input5: Vec<u8> = (0..200).map(|i| (i % 256) as u8).collect();
        let input6: Vec<u8> = (0..1_000).map(|i| (i % 256) as u8).collect();
        let input7: Vec<u8> = vec![];

        let inputs: [&[u8]; 8] = [
            &input0, &input1, &input2, &input3, &input4, &input5, &input6, &input7,
        ];

        let results = unsafe { digest_x8(&inputs) };

        for (i, input) in inputs.iter().enumerate() {
            let expected = scalar::digest(input);
            assert_eq!(
                to_hex(&results[i]),
                to_hex(&expected),
                "Mismatch at lane {i} for input length {}",
                input.len()
            );
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn run_masked_compress() -> ([[u32; 8]; 8], [[u32; 8]; 8]) {
        let mut state = [_mm256_setzero_si256(); 8];
        for (word, &iv) in state.iter_mut().zip(IV.iter()) {
            *word = _mm256_set1_epi32(iv as i32);
        }

        // Distinct garbage per lane so a commit would be visible.
        let blocks: [[u8; BLOCK_LEN]; 8] =
            std::array::from_fn(|lane| std::array::from_fn(|i| (lane * 64 + i) as u8));

        let before = store_state(&state);
        let mask = _mm256_setr_epi32(-1, -1, -1, 0, -1, -1, -1, 0);
        compress8(&mut state, mask, &blocks);
        let after = store_state(&state);
        (before, after)
    }

    #[test]
    fn masked_lanes_keep_state_frozen() {
        if !is_x86_feature_detected!("avx2") {
            eprintln!("AVX2 not available, skipping test");
            return;
        }

        let (before, after) = unsafe { run_masked_compress() };

        for word in 0..8 {
            for lane in 0..8 {
                if lane == 3 || lane == 7 {
                    assert_eq!(
                        before[word][lane], after[word][lane],
                        "masked lane {lane} moved in word {word}"
                    );
                } else {
                    assert_ne!(
                        before[word][lane], after[word][lane],
                        "active lane {lane} failed to advance in word {word}"
                    );
                }
            }
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn run_all_active_compress(blocks: &[[u8; BLOCK_LEN]; 8]) -> [[u32; 8]; 8] {
        let mut state = [_mm256_setzero_si256(); 8];
        for (word, &iv) in state.iter_mut().zip(IV.iter()) {
            *word = _mm256_set1_epi32(iv as i32);
        }
        compress8(&mut state, _mm256_set1_epi32(-1), blocks);
        store_state(&state)
    }

    #[test]
    fn compress8_matches_scalar_compress() {
        if !is_x86_feature_detected!("avx2") {
            eprintln!("AVX2 not available, skipping test");
            return;
        }

        let blocks: [[u8; BLOCK_LEN]; 8] =
            std::array::from_fn(|lane| std::array::from_fn(|i| (lane * 7 + i * 13) as u8));

        let words = unsafe { run_all_active_compress(&blocks) };

        for lane in 0..8 {
            let mut expected = IV;
            scalar::compress(&mut expected, &blocks[lane]);
            let got: [u32; 8] = std::array::from_fn(|i| words[i][lane]);
            assert_eq!(got, expected, "lane {lane}");
        }
    }
}
