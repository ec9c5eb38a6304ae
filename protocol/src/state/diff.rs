//! Copy-on-write state overlay.
//!
//! A [`Diff`] borrows a parent [`Chain`] and records every write in a
//! [`StateChanges`]. Reads consult the changes first and fall through to
//! the parent. `Some(None)` entries are deletions that shadow the parent.
//!
//! Diffs nest: a block is a `Diff` over the base state, and each of its
//! transactions runs in a `Diff` over the block's. A transaction that
//! fails just drops its overlay.

use std::collections::BTreeMap;

use super::{
    sort_stakers, AddressState, Chain, ChainMut, ChainRecord, Claimable, MultisigAlias, Staker,
    StakerSet,
};
use crate::deposit::{Deposit, DepositOffer};
use crate::ids::{Address, Id, NodeId, UtxoId};
use crate::locked::LockState;
use crate::shared_memory::AtomicOps;
use crate::utxo::{OutputOwners, Utxo};

/// Stakers are keyed by set, subnet and node.
pub type StakerKey = (StakerSet, Id, NodeId);

/// The delta a transaction (or block) applies to state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateChanges {
    pub timestamp: Option<u64>,
    pub current_supply: Option<u64>,
    pub not_distributed_validator_reward: Option<u64>,
    pub utxos: BTreeMap<UtxoId, Option<Utxo>>,
    pub stakers: BTreeMap<StakerKey, Option<Staker>>,
    pub deposits: BTreeMap<Id, Option<Deposit>>,
    pub address_states: BTreeMap<Address, AddressState>,
    pub multisig_aliases: BTreeMap<Address, MultisigAlias>,
    pub node_links: BTreeMap<NodeId, Option<Address>>,
    pub member_links: BTreeMap<Address, Option<NodeId>>,
    pub claimables: BTreeMap<Id, Option<Claimable>>,
    pub subnets: BTreeMap<Id, OutputOwners>,
    pub chains: BTreeMap<Id, ChainRecord>,
    pub atomic_requests: BTreeMap<Id, AtomicOps>,
}

impl StateChanges {
    pub fn is_empty(&self) -> bool {
        *self == StateChanges::default()
    }

    /// Layer `later` on top of `self`; later writes win.
    pub fn merge(&mut self, later: StateChanges) {
        if later.timestamp.is_some() {
            self.timestamp = later.timestamp;
        }
        if later.current_supply.is_some() {
            self.current_supply = later.current_supply;
        }
        if later.not_distributed_validator_reward.is_some() {
            self.not_distributed_validator_reward = later.not_distributed_validator_reward;
        }
        self.utxos.extend(later.utxos);
        self.stakers.extend(later.stakers);
        self.deposits.extend(later.deposits);
        self.address_states.extend(later.address_states);
        self.multisig_aliases.extend(later.multisig_aliases);
        self.node_links.extend(later.node_links);
        self.member_links.extend(later.member_links);
        self.claimables.extend(later.claimables);
        self.subnets.extend(later.subnets);
        self.chains.extend(later.chains);
        for (peer, ops) in later.atomic_requests {
            self.atomic_requests.entry(peer).or_default().extend(ops);
        }
    }

    /// UTXOs created by this delta.
    pub fn created_utxos(&self) -> impl Iterator<Item = &Utxo> {
        self.utxos.values().flatten()
    }

    /// Ids of UTXOs this delta deletes.
    pub fn consumed_utxos(&self) -> impl Iterator<Item = &UtxoId> {
        self.utxos
            .iter()
            .filter(|(_, utxo)| utxo.is_none())
            .map(|(id, _)| id)
    }
}

/// Overlay over a parent chain view.
pub struct Diff<'a> {
    parent: &'a dyn Chain,
    changes: StateChanges,
}

impl<'a> Diff<'a> {
    pub fn new(parent: &'a dyn Chain) -> Self {
        Self {
            parent,
            changes: StateChanges::default(),
        }
    }

    pub fn changes(&self) -> &StateChanges {
        &self.changes
    }

    pub fn into_changes(self) -> StateChanges {
        self.changes
    }

    /// Fold a child overlay's delta into this one.
    pub fn absorb(&mut self, child: StateChanges) {
        self.changes.merge(child);
    }
}

/// `Some(Some(v))` hit, `Some(None)` shadowed deletion, `None` fall through.
fn overlay<K: Ord, V: Clone>(
    changes: &BTreeMap<K, Option<V>>,
    key: &K,
    parent: impl FnOnce() -> Option<V>,
) -> Option<V> {
    match changes.get(key) {
        Some(value) => value.clone(),
        None => parent(),
    }
}

impl Chain for Diff<'_> {
    fn timestamp(&self) -> u64 {
        self.changes
            .timestamp
            .unwrap_or_else(|| self.parent.timestamp())
    }

    fn current_supply(&self) -> u64 {
        self.changes
            .current_supply
            .unwrap_or_else(|| self.parent.current_supply())
    }

    fn not_distributed_validator_reward(&self) -> u64 {
        self.changes
            .not_distributed_validator_reward
            .unwrap_or_else(|| self.parent.not_distributed_validator_reward())
    }

    fn utxo(&self, id: &UtxoId) -> Option<Utxo> {
        overlay(&self.changes.utxos, id, || self.parent.utxo(id))
    }

    fn locked_utxos(&self, lock_tx_id: &Id, kind: LockState) -> Vec<Utxo> {
        let mut utxos: Vec<Utxo> = self
            .parent
            .locked_utxos(lock_tx_id, kind)
            .into_iter()
            .filter(|utxo| !self.changes.utxos.contains_key(&utxo.id))
            .collect();
        utxos.extend(
            self.changes
                .created_utxos()
                .filter(|utxo| {
                    utxo.out
                        .lock_ids()
                        .map(|ids| ids.id_for(kind) == Some(*lock_tx_id))
                        .unwrap_or(false)
                })
                .cloned(),
        );
        utxos.sort_by_key(|utxo| utxo.id);
        utxos
    }

    fn staker(&self, set: StakerSet, subnet_id: &Id, node_id: &NodeId) -> Option<Staker> {
        overlay(&self.changes.stakers, &(set, *subnet_id, *node_id), || {
            self.parent.staker(set, subnet_id, node_id)
        })
    }

    fn stakers(&self, set: StakerSet) -> Vec<Staker> {
        let mut stakers: Vec<Staker> = self
            .parent
            .stakers(set)
            .into_iter()
            .filter(|s| {
                !self
                    .changes
                    .stakers
                    .contains_key(&(set, s.subnet_id, s.node_id))
            })
            .collect();
        stakers.extend(
            self.changes
                .stakers
                .iter()
                .filter(|((s, _, _), _)| *s == set)
                .filter_map(|(_, staker)| staker.clone()),
        );
        sort_stakers(&mut stakers, set);
        stakers
    }

    fn deposit(&self, deposit_tx_id: &Id) -> Option<Deposit> {
        overlay(&self.changes.deposits, deposit_tx_id, || {
            self.parent.deposit(deposit_tx_id)
        })
    }

    fn deposit_offer(&self, offer_id: &Id) -> Option<DepositOffer> {
        self.parent.deposit_offer(offer_id)
    }

    fn address_state(&self, address: &Address) -> AddressState {
        self.changes
            .address_states
            .get(address)
            .copied()
            .unwrap_or_else(|| self.parent.address_state(address))
    }

    fn multisig_alias(&self, alias: &Address) -> Option<MultisigAlias> {
        self.changes
            .multisig_aliases
            .get(alias)
            .cloned()
            .or_else(|| self.parent.multisig_alias(alias))
    }

    fn node_owner(&self, node_id: &NodeId) -> Option<Address> {
        overlay(&self.changes.node_links, node_id, || {
            self.parent.node_owner(node_id)
        })
    }

    fn registered_node(&self, member: &Address) -> Option<NodeId> {
        overlay(&self.changes.member_links, member, || {
            self.parent.registered_node(member)
        })
    }

    fn claimable(&self, owner_id: &Id) -> Option<Claimable> {
        overlay(&self.changes.claimables, owner_id, || {
            self.parent.claimable(owner_id)
        })
    }

    fn subnet_owner(&self, subnet_id: &Id) -> Option<OutputOwners> {
        self.changes
            .subnets
            .get(subnet_id)
            .cloned()
            .or_else(|| self.parent.subnet_owner(subnet_id))
    }

    fn chain_record(&self, chain_id: &Id) -> Option<ChainRecord> {
        self.changes
            .chains
            .get(chain_id)
            .cloned()
            .or_else(|| self.parent.chain_record(chain_id))
    }

    fn atomic_removed(&self, peer_chain: &Id, utxo_id: &UtxoId) -> bool {
        self.changes
            .atomic_requests
            .get(peer_chain)
            .is_some_and(|ops| ops.remove.contains(utxo_id))
            || self.parent.atomic_removed(peer_chain, utxo_id)
    }
}

impl ChainMut for Diff<'_> {
    fn set_timestamp(&mut self, time: u64) {
        self.changes.timestamp = Some(time);
    }

    fn set_current_supply(&mut self, supply: u64) {
        self.changes.current_supply = Some(supply);
    }

    fn set_not_distributed_validator_reward(&mut self, amount: u64) {
        self.changes.not_distributed_validator_reward = Some(amount);
    }

    fn add_utxo(&mut self, utxo: Utxo) {
        self.changes.utxos.insert(utxo.id, Some(utxo));
    }

    fn delete_utxo(&mut self, id: &UtxoId) {
        self.changes.utxos.insert(*id, None);
    }

    fn put_staker(&mut self, set: StakerSet, staker: Staker) {
        let key = (set, staker.subnet_id, staker.node_id);
        self.changes.stakers.insert(key, Some(staker));
    }

    fn delete_staker(&mut self, set: StakerSet, subnet_id: &Id, node_id: &NodeId) {
        self.changes
            .stakers
            .insert((set, *subnet_id, *node_id), None);
    }

    fn put_deposit(&mut self, deposit_tx_id: Id, deposit: Deposit) {
        self.changes.deposits.insert(deposit_tx_id, Some(deposit));
    }

    fn delete_deposit(&mut self, deposit_tx_id: &Id) {
        self.changes.deposits.insert(*deposit_tx_id, None);
    }

    fn set_address_state(&mut self, address: Address, state: AddressState) {
        self.changes.address_states.insert(address, state);
    }

    fn put_multisig_alias(&mut self, alias: MultisigAlias) {
        self.changes.multisig_aliases.insert(alias.id, alias);
    }

    fn link_node(&mut self, node_id: NodeId, member: Address) {
        self.changes.node_links.insert(node_id, Some(member));
        self.changes.member_links.insert(member, Some(node_id));
    }

    fn unlink_node(&mut self, node_id: &NodeId, member: &Address) {
        self.changes.node_links.insert(*node_id, None);
        self.changes.member_links.insert(*member, None);
    }

    fn put_claimable(&mut self, owner_id: Id, claimable: Claimable) {
        self.changes.claimables.insert(owner_id, Some(claimable));
    }

    fn delete_claimable(&mut self, owner_id: &Id) {
        self.changes.claimables.insert(*owner_id, None);
    }

    fn put_subnet(&mut self, subnet_id: Id, owner: OutputOwners) {
        self.changes.subnets.insert(subnet_id, owner);
    }

    fn put_chain_record(&mut self, record: ChainRecord) {
        self.changes.chains.insert(record.id, record);
    }

    fn add_atomic_requests(&mut self, peer_chain: Id, ops: AtomicOps) {
        self.changes
            .atomic_requests
            .entry(peer_chain)
            .or_default()
            .extend(ops);
    }
}
