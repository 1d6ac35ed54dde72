/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Cryptographic primitives.
//!
//! The only primitive this crate computes itself is the cryptographic hash, provided by the [`sha2`]
//! crate. Aggregated signatures are checked by a caller-supplied
//! [`AggregateSignatureVerifier`](super::commit::AggregateSignatureVerifier).

// re-exports below.
pub use sha2::Digest;
pub use sha2::Sha256 as CryptoHasher;

use super::data_types::CryptoHash;

/// Compute the SHA-256 digest of the concatenation of `chunks`.
pub(crate) fn sha256<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> CryptoHash {
    let mut hasher = CryptoHasher::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    CryptoHash::new(hasher.finalize().into())
}
