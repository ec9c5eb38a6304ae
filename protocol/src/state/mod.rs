//! # Ledger State
//!
//! The executor reads state through [`Chain`] and writes through
//! [`ChainMut`]. Two implementations:
//!
//! ```text
//! memory.rs — MemoryState: BTreeMap-backed base state
//! diff.rs   — Diff: copy-on-write overlay over any &dyn Chain,
//!             yielding a StateChanges delta
//! ```
//!
//! Proposals are evaluated as two sibling `Diff`s over the same parent;
//! whichever the vote picks is applied, the other is dropped. Nothing is
//! ever written to the parent while a transaction is being validated.

pub mod address_state;
pub mod diff;
pub mod memory;
pub mod records;
pub mod staker;

pub use address_state::{AddressState, AddressStateBit};
pub use diff::{Diff, StakerKey, StateChanges};
pub use memory::MemoryState;
pub use records::{ChainRecord, Claimable, MultisigAlias};
pub use staker::{sort_stakers, Staker, StakerSet};

use crate::config::PRIMARY_NETWORK_ID;
use crate::deposit::{Deposit, DepositOffer};
use crate::ids::{Address, Id, NodeId, UtxoId};
use crate::locked::LockState;
use crate::shared_memory::AtomicOps;
use crate::utxo::{OutputOwners, Utxo};

/// Read access to ledger state.
pub trait Chain {
    /// Chain time, unix seconds.
    fn timestamp(&self) -> u64;
    fn current_supply(&self) -> u64;
    /// Imported validator rewards not yet handed out.
    fn not_distributed_validator_reward(&self) -> u64;

    fn utxo(&self, id: &UtxoId) -> Option<Utxo>;
    /// UTXOs whose `kind` slot (a single kind) holds `lock_tx_id`, ordered
    /// by utxo id.
    fn locked_utxos(&self, lock_tx_id: &Id, kind: LockState) -> Vec<Utxo>;

    fn staker(&self, set: StakerSet, subnet_id: &Id, node_id: &NodeId) -> Option<Staker>;
    /// All stakers of `set` in its canonical order.
    fn stakers(&self, set: StakerSet) -> Vec<Staker>;

    fn deposit(&self, deposit_tx_id: &Id) -> Option<Deposit>;
    fn deposit_offer(&self, offer_id: &Id) -> Option<DepositOffer>;

    fn address_state(&self, address: &Address) -> AddressState;
    fn multisig_alias(&self, alias: &Address) -> Option<MultisigAlias>;
    /// Consortium member a node is registered to.
    fn node_owner(&self, node_id: &NodeId) -> Option<Address>;
    /// Node registered by a consortium member.
    fn registered_node(&self, member: &Address) -> Option<NodeId>;

    fn claimable(&self, owner_id: &Id) -> Option<Claimable>;
    fn subnet_owner(&self, subnet_id: &Id) -> Option<OutputOwners>;
    fn chain_record(&self, chain_id: &Id) -> Option<ChainRecord>;

    /// Whether a removal of `utxo_id` from `peer_chain`'s shared memory is
    /// already queued but not yet applied.
    fn atomic_removed(&self, peer_chain: &Id, utxo_id: &UtxoId) -> bool;

    /// The primary-network staker of `node_id`, current first.
    fn primary_staker(&self, node_id: &NodeId) -> Option<(StakerSet, Staker)> {
        [StakerSet::Current, StakerSet::Pending]
            .into_iter()
            .find_map(|set| {
                self.staker(set, &PRIMARY_NETWORK_ID, node_id)
                    .map(|s| (set, s))
            })
    }
}

/// Write access to ledger state.
pub trait ChainMut: Chain {
    fn set_timestamp(&mut self, time: u64);
    fn set_current_supply(&mut self, supply: u64);
    fn set_not_distributed_validator_reward(&mut self, amount: u64);

    fn add_utxo(&mut self, utxo: Utxo);
    fn delete_utxo(&mut self, id: &UtxoId);

    fn put_staker(&mut self, set: StakerSet, staker: Staker);
    fn delete_staker(&mut self, set: StakerSet, subnet_id: &Id, node_id: &NodeId);

    fn put_deposit(&mut self, deposit_tx_id: Id, deposit: Deposit);
    fn delete_deposit(&mut self, deposit_tx_id: &Id);

    fn set_address_state(&mut self, address: Address, state: AddressState);
    fn put_multisig_alias(&mut self, alias: MultisigAlias);
    /// Link node and member both ways.
    fn link_node(&mut self, node_id: NodeId, member: Address);
    /// Remove the link between node and member both ways.
    fn unlink_node(&mut self, node_id: &NodeId, member: &Address);

    fn put_claimable(&mut self, owner_id: Id, claimable: Claimable);
    fn delete_claimable(&mut self, owner_id: &Id);
    fn put_subnet(&mut self, subnet_id: Id, owner: OutputOwners);
    fn put_chain_record(&mut self, record: ChainRecord);

    /// Queue shared-memory requests against `peer_chain`.
    fn add_atomic_requests(&mut self, peer_chain: Id, ops: AtomicOps);
}
