//! SIMD backend implementations for SM3.
//!
//! Each backend processes multiple independent inputs simultaneously in a
//! transposed layout: state word `i` of all lanes shares one register, so
//! the SM3 rounds execute in parallel across lanes. The parent module's
//! dispatcher selects a backend at runtime from CPU feature detection;
//! applications should not call these implementations directly.
//!
//! # Safety
//!
//! All functions in this module are `unsafe` because they use
//! architecture-specific intrinsics. Callers must verify CPU feature
//! support before invoking them.

#[cfg(target_arch = "x86_64")]
pub(crate) mod avx2;
