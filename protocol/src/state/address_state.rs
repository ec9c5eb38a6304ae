//! Per-address role and status bits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One flag in an [`AddressState`]. Discriminants are bit positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AddressStateBit {
    /// May grant and revoke roles and membership.
    Admin = 0,
    /// May set KYC statuses.
    KycRole = 1,
    KycVerified = 32,
    KycExpired = 33,
    Consortium = 38,
    /// The member's node failed to earn its last reward.
    NodeDeferred = 39,
}

impl AddressStateBit {
    pub fn mask(self) -> u64 {
        1u64 << (self as u8)
    }

    /// Role bits grant permissions; the rest are statuses.
    pub fn is_role(self) -> bool {
        matches!(self, Self::Admin | Self::KycRole)
    }

    /// The bit that may not be set together with this one.
    pub fn exclusive_with(self) -> Option<AddressStateBit> {
        match self {
            Self::Admin => Some(Self::KycRole),
            Self::KycRole => Some(Self::Admin),
            Self::KycVerified => Some(Self::KycExpired),
            Self::KycExpired => Some(Self::KycVerified),
            Self::Consortium | Self::NodeDeferred => None,
        }
    }
}

/// Bitmask of [`AddressStateBit`]s. Unknown addresses are all-zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AddressState(u64);

impl AddressState {
    pub const EMPTY: AddressState = AddressState(0);

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn has(self, bit: AddressStateBit) -> bool {
        self.0 & bit.mask() != 0
    }

    pub fn with(self, bit: AddressStateBit) -> Self {
        Self(self.0 | bit.mask())
    }

    pub fn without(self, bit: AddressStateBit) -> Self {
        Self(self.0 & !bit.mask())
    }
}

impl fmt::Debug for AddressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddressState({:#x})", self.0)
    }
}
