//! # Identifiers
//!
//! Fixed-width identifiers used across the ledger:
//!
//! ```text
//! Id      (32 bytes) — tx ids, asset ids, subnet ids, chain ids, offer ids
//! ShortId (20 bytes) — addresses: SHA-256(public_key)[..20], or aliases
//! NodeId  (20 bytes) — node identity, same derivation as an address
//! UtxoId             — (tx id, output index)
//! ```
//!
//! Addresses render as Bech32 with a network HRP (`lumen1...`) for humans,
//! and as hex everywhere else (logs, debug output).

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::crypto::hash::{blake3_hash, blake3_hash_parts};

/// Errors from parsing identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("bech32 error: {0}")]
    Bech32(String),

    #[error("invalid id length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

// ---------------------------------------------------------------------------
// Id
// ---------------------------------------------------------------------------

/// A 32-byte identifier. The all-zero value is "unset".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Id([u8; 32]);

impl Id {
    pub const EMPTY: Id = Id([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Deterministic id from a human label. Used for well-known chain and
    /// asset ids in configuration and in tests.
    pub fn from_label(label: &str) -> Self {
        Self(blake3_hash(label.as_bytes()))
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, IdError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| IdError::InvalidLength {
            expected: 32,
            got: slice.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Child id `BLAKE3(self || index)`. Used to derive alias addresses
    /// and other ids owned by a transaction.
    pub fn prefixed(&self, index: u64) -> Id {
        Id(blake3_hash_parts(&[&self.0, &index.to_be_bytes()]))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Eight bytes is plenty to tell ids apart in test output.
        write!(f, "Id({}..)", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// ShortId
// ---------------------------------------------------------------------------

/// A 20-byte identifier. Addresses are `ShortId`s.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ShortId([u8; 20]);

/// An address is a short id: either a key hash or a multisig alias.
pub type Address = ShortId;

impl ShortId {
    pub const EMPTY: ShortId = ShortId([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn from_label(label: &str) -> Self {
        Self::from_id(&Id::from_label(label))
    }

    /// The leading 20 bytes of a 32-byte id.
    pub fn from_id(id: &Id) -> Self {
        let mut short = [0u8; 20];
        short.copy_from_slice(&id.as_bytes()[..20]);
        Self(short)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Bech32-encode with the given HRP.
    pub fn to_bech32(&self, hrp: &str) -> Result<String, IdError> {
        let hrp = Hrp::parse(hrp).map_err(|e| IdError::Bech32(e.to_string()))?;
        bech32::encode::<Bech32>(hrp, &self.0).map_err(|e| IdError::Bech32(e.to_string()))
    }

    /// Parse a Bech32 address, returning its HRP alongside the id.
    pub fn from_bech32(s: &str) -> Result<(String, Self), IdError> {
        let (hrp, data) = bech32::decode(s).map_err(|e| IdError::Bech32(e.to_string()))?;
        let bytes: [u8; 20] = data.as_slice().try_into().map_err(|_| IdError::InvalidLength {
            expected: 20,
            got: data.len(),
        })?;
        Ok((hrp.to_string(), Self(bytes)))
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortId({})", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Identity of a validating node.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct NodeId([u8; 20]);

impl NodeId {
    pub const EMPTY: NodeId = NodeId([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// The address a node key signs as.
    pub fn as_address(&self) -> Address {
        ShortId(self.0)
    }
}

impl From<ShortId> for NodeId {
    fn from(id: ShortId) -> Self {
        NodeId(id.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeID-{}", hex::encode(self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

// ---------------------------------------------------------------------------
// UtxoId
// ---------------------------------------------------------------------------

/// Points at output `output_index` of transaction `tx_id`.
///
/// Ordering is (tx id, index), which is also the canonical input order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtxoId {
    pub tx_id: Id,
    pub output_index: u32,
}

impl UtxoId {
    pub fn new(tx_id: Id, output_index: u32) -> Self {
        Self {
            tx_id,
            output_index,
        }
    }
}

impl fmt::Display for UtxoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.output_index)
    }
}

impl fmt::Debug for UtxoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UtxoId({:?}:{})", self.tx_id, self.output_index)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
