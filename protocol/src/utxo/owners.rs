//! Ownership predicates: "any `threshold` of these addresses, after
//! `locktime`".
//!
//! An address in the set may itself be a multisig alias; resolving that is
//! the authorization resolver's job (`executor::auth`), not this module's.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MAX_OWNER_ADDRESSES;
use crate::crypto::hash::blake3_hash;
use crate::ids::{Address, Id};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OwnersError {
    #[error("threshold {threshold} exceeds {addrs} addresses")]
    ThresholdTooHigh { threshold: u32, addrs: usize },

    #[error("threshold is zero but addresses are listed")]
    ZeroThreshold,

    #[error("addresses are not sorted and unique")]
    AddressesNotSortedUnique,

    #[error("{0} addresses exceed the owner set limit")]
    TooManyAddresses(usize),

    #[error("owner set contains the empty address")]
    EmptyAddress,

    #[error("owner set has no addresses")]
    NoAddresses,
}

/// A threshold-of-addresses owner set.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct OutputOwners {
    /// Unix seconds before which the owners cannot spend.
    pub locktime: u64,
    pub threshold: u32,
    /// Sorted and unique.
    pub addrs: Vec<Address>,
}

impl OutputOwners {
    /// Owner set with sorted, de-duplicated addresses and no locktime.
    pub fn new(threshold: u32, mut addrs: Vec<Address>) -> Self {
        addrs.sort();
        addrs.dedup();
        Self {
            locktime: 0,
            threshold,
            addrs,
        }
    }

    /// A single address, threshold one.
    pub fn single(addr: Address) -> Self {
        Self::new(1, vec![addr])
    }

    /// Well-formedness: sorted unique non-empty addresses and an achievable,
    /// non-zero threshold.
    pub fn verify(&self) -> Result<(), OwnersError> {
        if self.addrs.len() > MAX_OWNER_ADDRESSES {
            return Err(OwnersError::TooManyAddresses(self.addrs.len()));
        }
        if self.threshold as usize > self.addrs.len() {
            return Err(OwnersError::ThresholdTooHigh {
                threshold: self.threshold,
                addrs: self.addrs.len(),
            });
        }
        if self.threshold == 0 && !self.addrs.is_empty() {
            return Err(OwnersError::ZeroThreshold);
        }
        if self.addrs.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(OwnersError::AddressesNotSortedUnique);
        }
        if self.addrs.iter().any(Address::is_empty) {
            return Err(OwnersError::EmptyAddress);
        }
        Ok(())
    }

    /// Stable identity of this owner set: `BLAKE3(bincode(self))`.
    /// Claimable reward records are keyed by it.
    pub fn owner_id(&self) -> Id {
        let bytes = bincode::serialize(self).unwrap_or_default();
        Id::new(blake3_hash(&bytes))
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.addrs.binary_search(addr).is_ok()
    }
}
