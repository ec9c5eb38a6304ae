//! Small state records: claimables, multisig aliases, chains.

use serde::{Deserialize, Serialize};

use crate::ids::{Address, Id};
use crate::utxo::OutputOwners;

/// Unclaimed rewards of one owner set, keyed in state by
/// [`OutputOwners::owner_id`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claimable {
    pub owners: OutputOwners,
    pub validator_reward: u64,
    /// Leftover interest of deposits that were fully unlocked.
    pub deposit_reward: u64,
}

impl Claimable {
    pub fn new(owners: OutputOwners) -> Self {
        Self {
            owners,
            validator_reward: 0,
            deposit_reward: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.validator_reward == 0 && self.deposit_reward == 0
    }
}

/// An address standing for an owner set. Aliases may nest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigAlias {
    pub id: Address,
    pub owners: OutputOwners,
    pub memo: Vec<u8>,
}

/// A blockchain created on a subnet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub id: Id,
    pub subnet_id: Id,
    pub name: String,
    pub vm_id: Id,
}
