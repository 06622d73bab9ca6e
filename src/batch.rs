//! Per-lane planning for batched hashing.
//!
//! Eight messages of independent lengths share one vector compression
//! loop, so each lane's control flow has to be flattened into data: how
//! many blocks it occupies, where its message bytes stop, and what its
//! padding blocks contain. [`LanePlan`] captures that per-lane state as a
//! pure function of the message length, and [`digest_lanes`] runs the
//! resulting step plan with the scalar compression function standing in as
//! a one-lane masked kernel. The AVX2 driver consumes the exact same plan,
//! which keeps the vector kernel free of any batching policy.

use crate::codec;
use crate::padding::{self, BLOCK_LEN, LENGTH_OFFSET};
use crate::scalar;
use crate::Digest;

/// Block schedule for one lane, derived from its message length alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LanePlan {
    /// Number of blocks filled entirely with message bytes.
    pub(crate) message_blocks: usize,
    /// Message bytes left over after the full blocks (`len % 64`).
    pub(crate) trailing: usize,
    /// Message blocks plus one or two padding blocks.
    pub(crate) total_blocks: usize,
}

impl LanePlan {
    pub(crate) fn for_len(len: usize) -> Self {
        Self {
            message_blocks: len / BLOCK_LEN,
            trailing: len % BLOCK_LEN,
            total_blocks: padding::padded_blocks(len),
        }
    }

    /// Writes the 64-byte block this lane contributes at `step` and
    /// returns whether the lane is still active. Inactive lanes get zero
    /// fill, which the kernel must never commit.
    ///
    /// The first padding block carries the trailing message bytes and the
    /// terminator; the bit-length field lands in whichever padding block
    /// has room for it.
    pub(crate) fn fill_block(&self, message: &[u8], step: usize, block: &mut [u8; 64]) -> bool {
        if step >= self.total_blocks {
            block.fill(0);
            return false;
        }

        if step < self.message_blocks {
            let offset = step * BLOCK_LEN;
            block.copy_from_slice(&message[offset..offset + BLOCK_LEN]);
            return true;
        }

        block.fill(0);
        let bit_len = (message.len() as u64) * 8;
        if step == self.message_blocks {
            block[..self.trailing].copy_from_slice(&message[self.message_blocks * BLOCK_LEN..]);
            block[self.trailing] = 0x80;
            if self.trailing < LENGTH_OFFSET {
                block[LENGTH_OFFSET..].copy_from_slice(&bit_len.to_be_bytes());
            }
        } else {
            block[LENGTH_OFFSET..].copy_from_slice(&bit_len.to_be_bytes());
        }
        true
    }
}

/// Hashes `N` independent messages through the shared step plan.
///
/// This is the batching policy at its narrowest width: per step, every
/// active lane's block is compressed and every finished lane is left
/// untouched, exactly the committed-state semantics of the vector
/// kernel's blend. It is the fallback behind the fixed-width batch API on
/// hardware without AVX2, and the reference the SIMD tests compare
/// against; a wider backend slots in without touching this logic.
pub(crate) fn digest_lanes<const N: usize>(inputs: &[&[u8]; N]) -> [Digest; N] {
    let plans: [LanePlan; N] = std::array::from_fn(|lane| LanePlan::for_len(inputs[lane].len()));
    let max_blocks = plans
        .iter()
        .map(|plan| plan.total_blocks)
        .max()
        .unwrap_or(0);

    let mut states = [scalar::IV; N];
    let mut block = [0u8; BLOCK_LEN];
    for step in 0..max_blocks {
        for lane in 0..N {
            if plans[lane].fill_block(inputs[lane], step, &mut block) {
                scalar::compress(&mut states[lane], &block);
            }
        }
    }

    std::array::from_fn(|lane| codec::serialize_state(&states[lane]))
}
