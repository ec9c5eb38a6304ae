//! # Lock Model
//!
//! A value container carries two independent lock slots:
//!
//! ```text
//! LockIds { deposit_tx_id, bond_tx_id }
//!
//!   (∅, ∅)  unlocked
//!   (D, ∅)  deposited by tx D
//!   (∅, B)  bonded by tx B
//!   (D, B)  deposited by D and bonded by B
//! ```
//!
//! An empty id means "slot unset". While a transaction is being built it
//! cannot know its own id, so outputs it locks carry [`THIS_TX_ID`] in the
//! slot; [`LockIds::resolve`] swaps the placeholder for the real id when the
//! output becomes a UTXO.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::Id;

/// Placeholder meaning "the transaction that produces this output".
pub const THIS_TX_ID: Id = Id::new([0xFF; 32]);

// ---------------------------------------------------------------------------
// LockState
// ---------------------------------------------------------------------------

/// Bitmask over lock kinds. Bit 0 is deposit, bit 1 is bond.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct LockState(u8);

impl LockState {
    pub const UNLOCKED: LockState = LockState(0b00);
    pub const DEPOSITED: LockState = LockState(0b01);
    pub const BONDED: LockState = LockState(0b10);
    pub const DEPOSITED_BONDED: LockState = LockState(0b11);

    pub fn bits(self) -> u8 {
        self.0
    }

    /// True when every bit of `other` is set in `self`.
    pub fn contains(self, other: LockState) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: LockState) -> LockState {
        LockState(self.0 | other.0)
    }

    pub fn without(self, other: LockState) -> LockState {
        LockState(self.0 & !other.0)
    }

    pub fn is_unlocked(self) -> bool {
        self.0 == 0
    }

    /// The single-bit kinds contained in this state.
    pub fn kinds(self) -> impl Iterator<Item = LockState> {
        [LockState::DEPOSITED, LockState::BONDED]
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0b00 => write!(f, "unlocked"),
            0b01 => write!(f, "deposited"),
            0b10 => write!(f, "bonded"),
            _ => write!(f, "deposited+bonded"),
        }
    }
}

impl fmt::Debug for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LockState({})", self)
    }
}

// ---------------------------------------------------------------------------
// LockIds
// ---------------------------------------------------------------------------

/// The lock slots of one output or input.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Serialize, Deserialize)]
pub struct LockIds {
    pub deposit_tx_id: Id,
    pub bond_tx_id: Id,
}

impl LockIds {
    pub const UNLOCKED: LockIds = LockIds {
        deposit_tx_id: Id::EMPTY,
        bond_tx_id: Id::EMPTY,
    };

    pub fn new(deposit_tx_id: Id, bond_tx_id: Id) -> Self {
        Self {
            deposit_tx_id,
            bond_tx_id,
        }
    }

    pub fn deposited(deposit_tx_id: Id) -> Self {
        Self::new(deposit_tx_id, Id::EMPTY)
    }

    pub fn bonded(bond_tx_id: Id) -> Self {
        Self::new(Id::EMPTY, bond_tx_id)
    }

    /// Which slots are set.
    pub fn lock_state(&self) -> LockState {
        let mut state = LockState::UNLOCKED;
        if !self.deposit_tx_id.is_empty() {
            state = state.union(LockState::DEPOSITED);
        }
        if !self.bond_tx_id.is_empty() {
            state = state.union(LockState::BONDED);
        }
        state
    }

    pub fn is_locked(&self) -> bool {
        !self.lock_state().is_unlocked()
    }

    /// True when every kind in `kinds` is set.
    pub fn is_locked_with(&self, kinds: LockState) -> bool {
        self.lock_state().contains(kinds)
    }

    /// Id held by a single-kind slot, `None` when unset.
    pub fn id_for(&self, kind: LockState) -> Option<Id> {
        let id = match kind {
            LockState::DEPOSITED => self.deposit_tx_id,
            LockState::BONDED => self.bond_tx_id,
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    }

    /// Set the slots named by `kinds` to `tx_id`.
    pub fn lock(&self, kinds: LockState, tx_id: Id) -> LockIds {
        let mut ids = *self;
        if kinds.contains(LockState::DEPOSITED) {
            ids.deposit_tx_id = tx_id;
        }
        if kinds.contains(LockState::BONDED) {
            ids.bond_tx_id = tx_id;
        }
        ids
    }

    /// Clear the slots named by `kinds`.
    pub fn unlock(&self, kinds: LockState) -> LockIds {
        self.lock(kinds, Id::EMPTY)
    }

    /// Kinds whose slot holds the [`THIS_TX_ID`] placeholder.
    pub fn new_lock_state(&self) -> LockState {
        let mut state = LockState::UNLOCKED;
        if self.deposit_tx_id == THIS_TX_ID {
            state = state.union(LockState::DEPOSITED);
        }
        if self.bond_tx_id == THIS_TX_ID {
            state = state.union(LockState::BONDED);
        }
        state
    }

    /// Replace every [`THIS_TX_ID`] placeholder with `tx_id`.
    pub fn resolve(&self, tx_id: Id) -> LockIds {
        self.lock(self.new_lock_state(), tx_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
