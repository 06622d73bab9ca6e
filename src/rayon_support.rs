//! Rayon integration for parallel SM3 hashing.
//!
//! This module provides parallel iteration support and file hashing utilities.

use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::Path;

use crate::{digest, digest_batch, Digest};

/// Extension trait for parallel SM3 hashing.
///
/// Provides a method to compute SM3 digests from a parallel iterator,
/// using SIMD batching when beneficial.
///
/// # Example
///
/// ```
/// use rayon::prelude::*;
/// use sm3_simd::ParallelSm3;
///
/// let data: Vec<Vec<u8>> = vec![
///     b"hello".to_vec(),
///     b"world".to_vec(),
///     b"test".to_vec(),
/// ];
///
/// let digests = data.par_iter().sm3_digest();
/// assert_eq!(digests.len(), 3);
/// ```
pub trait ParallelSm3<T> {
    /// Compute SM3 digests in parallel using SIMD when beneficial.
    fn sm3_digest(self) -> Vec<Digest>;
}

impl<I, T> ParallelSm3<T> for I
where
    I: ParallelIterator<Item = T>,
    T: AsRef<[u8]> + Send,
{
    fn sm3_digest(self) -> Vec<Digest> {
        // Collect and batch for SIMD
        let items: Vec<T> = self.collect();
        digest_batch(&items)
    }
}

/// Compute SM3 digests for multiple files in parallel.
///
/// Reads each file and computes its SM3 digest. Files are read and hashed
/// in parallel using rayon's thread pool.
///
/// # Example
///
/// ```no_run
/// use sm3_simd::digest_files;
///
/// let paths = ["file1.txt", "file2.txt", "file3.txt"];
/// let results = digest_files(&paths);
///
/// for (path, result) in paths.iter().zip(results.iter()) {
///     match result {
///         Ok(digest) => println!("{}: {:02x?}", path, digest),
///         Err(e) => println!("{}: error - {}", path, e),
///     }
/// }
/// ```
pub fn digest_files<P: AsRef<Path> + Sync>(paths: &[P]) -> Vec<io::Result<Digest>> {
    paths
        .par_iter()
        .map(|path| {
            let data = fs::read(path.as_ref())?;
            Ok(digest(&data))
        })
        .collect()
}
