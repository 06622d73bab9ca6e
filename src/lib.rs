//! SIMD-accelerated parallel SM3 hashing.
//!
//! This crate implements the SM3 hash function (GB/T 32905) with a scalar
//! streaming hasher and an 8-lane AVX2 batch hasher that carries eight
//! independent messages of independent lengths through one shared
//! compression loop, applying each lane's Merkle-Damgård padding as it
//! finishes.
//!
//! # Example
//!
//! ```
//! use sm3_simd::{digest, digest_batch, Sm3};
//!
//! // Single hash
//! let hash = digest(b"hello world");
//!
//! // Streaming
//! let mut hasher = Sm3::new();
//! hasher.update(b"hello ");
//! hasher.update(b"world");
//! assert_eq!(hasher.finalize(), hash);
//!
//! // Batch hash (uses SIMD when available)
//! let inputs = [b"input1".as_slice(), b"input2", b"input3"];
//! let hashes = digest_batch(&inputs);
//! assert_eq!(hashes.len(), 3);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod batch;
mod codec;
mod dispatcher;
mod padding;
mod scalar;

#[cfg(target_arch = "x86_64")]
mod simd;

#[cfg(feature = "rayon")]
mod rayon_support;

pub use dispatcher::Backend;
pub use scalar::Sm3;

#[cfg(feature = "rayon")]
#[cfg_attr(docsrs, doc(cfg(feature = "rayon")))]
pub use rayon_support::{digest_files, ParallelSm3};

/// SM3 digest type (32 bytes / 256 bits).
pub type Digest = [u8; 32];

/// Compute SM3 digests for multiple inputs in parallel.
///
/// Uses SIMD instructions when available to process multiple hashes
/// simultaneously. Returns digests in the same order as inputs.
pub fn digest_batch<T: AsRef<[u8]>>(inputs: &[T]) -> Vec<Digest> {
    dispatcher::global().digest_batch(inputs)
}

/// Compute the SM3 digest of a single input.
pub fn digest(input: &[u8]) -> Digest {
    dispatcher::global().digest(input)
}

/// Hash eight independent inputs, producing one digest per lane.
///
/// Lane lengths may differ freely; every digest equals [`digest`] of that
/// lane's input alone. Uses the 8-lane AVX2 kernel when available and a
/// scalar per-lane schedule otherwise.
///
/// # Example
///
/// ```
/// use sm3_simd::{digest, hash8};
///
/// let inputs: [&[u8]; 8] = [b"", b"a", b"bc", b"def", b"ghij", b"klmno", b"pqrstu", b"vwxyz01"];
/// let digests = hash8(&inputs);
/// assert_eq!(digests[3], digest(b"def"));
/// ```
pub fn hash8(inputs: &[&[u8]; 8]) -> [Digest; 8] {
    dispatcher::global().hash8(inputs)
}

/// Get the currently active SIMD backend.
///
/// Useful for logging or diagnostics.
pub fn active_backend() -> Backend {
    dispatcher::global().backend()
}
