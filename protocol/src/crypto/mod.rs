//! # Cryptographic Primitives
//!
//! Thin, type-safe wrappers over audited implementations. The executor
//! treats these as black boxes: it asks "does this signature verify" and
//! "hash these bytes", nothing more.
//!
//! - **Ed25519** for every signature (owners, consortium members, nodes).
//! - **BLAKE3** for ids.
//! - **SHA-256** for address derivation.

pub mod hash;
pub mod keys;

pub use hash::{blake3_hash, blake3_hash_parts, sha256_array};
pub use keys::{KeyError, Keypair, PublicKey, Signature};
