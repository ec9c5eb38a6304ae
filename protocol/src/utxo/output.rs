//! Outputs, inputs and UTXOs.
//!
//! An output is one of three kinds:
//!
//! - [`Output::Transfer`] plain unlocked value,
//! - [`Output::Locked`] value under bond and/or deposit locks ([`LockIds`]),
//! - [`Output::Stakeable`] value under a time lock.
//!
//! `Locked` and `Stakeable` are alternative lock models for the same value;
//! the executor only speaks the bond/deposit one and rejects the
//! time-locked kind on sight with [`LockError::WrongType`]. Inputs mirror
//! the same three kinds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::owners::OutputOwners;
use crate::ids::{Id, UtxoId};
use crate::locked::LockIds;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    /// A stakeable (time-locked) container reached the bond/deposit model.
    #[error("wrong output/input type: time-locked value is not allowed here")]
    WrongType,
}

/// Amount plus owners.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutput {
    pub amount: u64,
    pub owners: OutputOwners,
}

impl TransferOutput {
    pub fn new(amount: u64, owners: OutputOwners) -> Self {
        Self { amount, owners }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Output {
    Transfer(TransferOutput),
    Locked { ids: LockIds, out: TransferOutput },
    Stakeable { locktime: u64, out: TransferOutput },
}

impl Output {
    /// Locked output, or a plain transfer when `ids` has no slots set.
    pub fn with_locks(ids: LockIds, out: TransferOutput) -> Self {
        if ids.is_locked() {
            Output::Locked { ids, out }
        } else {
            Output::Transfer(out)
        }
    }

    /// The full amount, whatever the lock.
    pub fn amount(&self) -> u64 {
        self.inner().amount
    }

    pub fn owners(&self) -> &OutputOwners {
        &self.inner().owners
    }

    /// Lock slots of this output. Time-locked outputs are not expressible
    /// in this model.
    pub fn lock_ids(&self) -> Result<LockIds, LockError> {
        match self {
            Output::Transfer(_) => Ok(LockIds::UNLOCKED),
            Output::Locked { ids, .. } => Ok(*ids),
            Output::Stakeable { .. } => Err(LockError::WrongType),
        }
    }

    /// The transfer payload under whichever lock.
    pub fn inner(&self) -> &TransferOutput {
        match self {
            Output::Transfer(out) => out,
            Output::Locked { out, .. } => out,
            Output::Stakeable { out, .. } => out,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Input {
    Transfer { amount: u64 },
    Locked { ids: LockIds, amount: u64 },
    Stakeable { locktime: u64, amount: u64 },
}

impl Input {
    /// Input spending an output of the given lock slots.
    pub fn with_locks(ids: LockIds, amount: u64) -> Self {
        if ids.is_locked() {
            Input::Locked { ids, amount }
        } else {
            Input::Transfer { amount }
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Input::Transfer { amount } => *amount,
            Input::Locked { amount, .. } => *amount,
            Input::Stakeable { amount, .. } => *amount,
        }
    }

    pub fn lock_ids(&self) -> Result<LockIds, LockError> {
        match self {
            Input::Transfer { .. } => Ok(LockIds::UNLOCKED),
            Input::Locked { ids, .. } => Ok(*ids),
            Input::Stakeable { .. } => Err(LockError::WrongType),
        }
    }
}

/// An output together with the asset it carries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferableOutput {
    pub asset_id: Id,
    pub out: Output,
}

impl TransferableOutput {
    pub fn new(asset_id: Id, out: Output) -> Self {
        Self { asset_id, out }
    }
}

/// A reference to a UTXO being consumed, with the amount and lock slots
/// the spender claims it holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferableInput {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub input: Input,
}

impl TransferableInput {
    /// The input that spends `utxo` exactly as it is.
    pub fn spending(utxo: &Utxo) -> Result<Self, LockError> {
        let ids = utxo.out.lock_ids()?;
        Ok(Self {
            utxo_id: utxo.id,
            asset_id: utxo.asset_id,
            input: Input::with_locks(ids, utxo.out.amount()),
        })
    }
}

/// An unspent output addressable by [`UtxoId`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub id: UtxoId,
    pub asset_id: Id,
    pub out: Output,
}

impl Utxo {
    pub fn new(id: UtxoId, asset_id: Id, out: Output) -> Self {
        Self { id, asset_id, out }
    }

    /// Whether `input` claims exactly what this UTXO holds: same asset,
    /// same amount, same lock slots.
    pub fn matches(&self, input: &TransferableInput) -> Result<bool, LockError> {
        let out_ids = self.out.lock_ids()?;
        let in_ids = input.input.lock_ids()?;
        Ok(self.id == input.utxo_id
            && self.asset_id == input.asset_id
            && self.out.amount() == input.input.amount()
            && out_ids == in_ids)
    }
}
