//! # Hashing Utilities
//!
//! Two hash functions and no more:
//!
//! - **BLAKE3** — transaction ids, owner ids, derived ids. Everything that is
//!   Lumen-native.
//! - **SHA-256** — address derivation from public keys, so that an address is
//!   the familiar "truncated SHA-256 of the key" that wallets already know
//!   how to compute.

use sha2::{Digest, Sha256};

/// Compute the BLAKE3 hash of the input data.
///
/// # Example
///
/// ```
/// use lumen_protocol::crypto::blake3_hash;
///
/// let h = blake3_hash(b"lumen");
/// assert_eq!(h.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// BLAKE3 over several byte slices without concatenating them first.
pub fn blake3_hash_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Compute the SHA-256 hash and return a fixed-size array.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
