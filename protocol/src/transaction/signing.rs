//! Credentials and signed transactions.
//!
//! A transaction's id is `BLAKE3(bincode(unsigned))`. Every credential is a
//! list of Ed25519 signatures over those 32 bytes; the executor turns each
//! credential into the set of addresses that verifiably signed it and
//! checks ownership predicates against that set.
//!
//! Credentials are positional:
//!
//! ```text
//! creds[0 .. n_inputs]          one per spent input (base, then imported)
//! creds[n_inputs ..]            kind-specific extras (node key, subnet auth, ...)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::types::{TxError, UnsignedTx};
use crate::crypto::hash::blake3_hash;
use crate::crypto::keys::{Keypair, PublicKey, Signature};
use crate::ids::{Address, Id};

/// One signature and the key that made it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBy {
    pub public_key: PublicKey,
    pub signature: Signature,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub signatures: Vec<SignedBy>,
}

impl Credential {
    /// Sign `tx_id` with each key.
    pub fn sign(tx_id: &Id, keys: &[&Keypair]) -> Self {
        let signatures = keys
            .iter()
            .map(|key| SignedBy {
                public_key: key.public_key(),
                signature: key.sign(tx_id.as_bytes()),
            })
            .collect();
        Self { signatures }
    }

    /// Addresses that signed `tx_id`. Any bad signature poisons the whole
    /// credential and yields `None`.
    pub fn signers(&self, tx_id: &Id) -> Option<BTreeSet<Address>> {
        let mut signers = BTreeSet::new();
        for signed in &self.signatures {
            if !signed.public_key.verify(tx_id.as_bytes(), &signed.signature) {
                return None;
            }
            signers.insert(signed.public_key.address());
        }
        Some(signers)
    }
}

/// An unsigned body with its credentials and cached id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    unsigned: UnsignedTx,
    creds: Vec<Credential>,
    id: Id,
}

impl Tx {
    pub fn new(unsigned: UnsignedTx, creds: Vec<Credential>) -> Result<Self, TxError> {
        let id = tx_id(&unsigned)?;
        Ok(Self {
            unsigned,
            creds,
            id,
        })
    }

    /// Build and sign: `keys[i]` signs credential `i`.
    pub fn sign(unsigned: UnsignedTx, keys: &[Vec<&Keypair>]) -> Result<Self, TxError> {
        let id = tx_id(&unsigned)?;
        let creds = keys.iter().map(|set| Credential::sign(&id, set)).collect();
        Ok(Self {
            unsigned,
            creds,
            id,
        })
    }

    /// System transaction: no credentials.
    pub fn unsigned(unsigned: UnsignedTx) -> Result<Self, TxError> {
        Self::new(unsigned, Vec::new())
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn body(&self) -> &UnsignedTx {
        &self.unsigned
    }

    pub fn creds(&self) -> &[Credential] {
        &self.creds
    }
}

fn tx_id(unsigned: &UnsignedTx) -> Result<Id, TxError> {
    let bytes = bincode::serialize(unsigned).map_err(|e| TxError::Codec(e.to_string()))?;
    Ok(Id::new(blake3_hash(&bytes)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
