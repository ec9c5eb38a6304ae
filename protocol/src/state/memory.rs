//! In-memory base state.

use std::collections::BTreeMap;
use std::mem;

use super::{
    sort_stakers, AddressState, Chain, ChainMut, ChainRecord, Claimable, MultisigAlias, Staker,
    StakerKey, StakerSet, StateChanges,
};
use crate::deposit::{Deposit, DepositOffer, OfferError};
use crate::ids::{Address, Id, NodeId, UtxoId};
use crate::locked::LockState;
use crate::shared_memory::AtomicOps;
use crate::utxo::{OutputOwners, Utxo};

/// BTreeMap-backed ledger state. The reference [`Chain`] implementation
/// and the base layer of every [`super::Diff`].
#[derive(Clone, Debug, Default)]
pub struct MemoryState {
    timestamp: u64,
    current_supply: u64,
    not_distributed_validator_reward: u64,
    utxos: BTreeMap<UtxoId, Utxo>,
    stakers: BTreeMap<StakerKey, Staker>,
    deposits: BTreeMap<Id, Deposit>,
    deposit_offers: BTreeMap<Id, DepositOffer>,
    address_states: BTreeMap<Address, AddressState>,
    multisig_aliases: BTreeMap<Address, MultisigAlias>,
    node_links: BTreeMap<NodeId, Address>,
    member_links: BTreeMap<Address, NodeId>,
    claimables: BTreeMap<Id, Claimable>,
    subnets: BTreeMap<Id, OutputOwners>,
    chains: BTreeMap<Id, ChainRecord>,
    /// Atomic requests applied but not yet handed to shared memory.
    atomic_outbox: BTreeMap<Id, AtomicOps>,
}

impl MemoryState {
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    /// Publish a deposit offer. Offers are genesis or governance data, not
    /// transaction output.
    pub fn add_deposit_offer(&mut self, offer: DepositOffer) -> Result<(), OfferError> {
        offer.validate()?;
        self.deposit_offers.insert(offer.id, offer);
        Ok(())
    }

    pub fn utxos(&self) -> impl Iterator<Item = &Utxo> {
        self.utxos.values()
    }

    /// Sum of every UTXO amount of `asset_id`, locked or not.
    pub fn total_value(&self, asset_id: &Id) -> u128 {
        self.utxos
            .values()
            .filter(|u| u.asset_id == *asset_id)
            .map(|u| u128::from(u.out.amount()))
            .sum()
    }

    /// Drain atomic requests accumulated by [`MemoryState::apply`].
    pub fn take_atomic_requests(&mut self) -> BTreeMap<Id, AtomicOps> {
        mem::take(&mut self.atomic_outbox)
    }

    /// Apply a delta produced by a [`super::Diff`].
    pub fn apply(&mut self, changes: StateChanges) {
        let StateChanges {
            timestamp,
            current_supply,
            not_distributed_validator_reward,
            utxos,
            stakers,
            deposits,
            address_states,
            multisig_aliases,
            node_links,
            member_links,
            claimables,
            subnets,
            chains,
            atomic_requests,
        } = changes;

        if let Some(t) = timestamp {
            self.timestamp = t;
        }
        if let Some(s) = current_supply {
            self.current_supply = s;
        }
        if let Some(r) = not_distributed_validator_reward {
            self.not_distributed_validator_reward = r;
        }
        apply_map(&mut self.utxos, utxos);
        apply_map(&mut self.stakers, stakers);
        apply_map(&mut self.deposits, deposits);
        self.address_states.extend(address_states);
        self.multisig_aliases.extend(multisig_aliases);
        apply_map(&mut self.node_links, node_links);
        apply_map(&mut self.member_links, member_links);
        apply_map(&mut self.claimables, claimables);
        self.subnets.extend(subnets);
        self.chains.extend(chains);
        for (peer, ops) in atomic_requests {
            self.atomic_outbox.entry(peer).or_default().extend(ops);
        }
    }
}

fn apply_map<K: Ord, V>(target: &mut BTreeMap<K, V>, changes: BTreeMap<K, Option<V>>) {
    for (key, value) in changes {
        match value {
            Some(v) => {
                target.insert(key, v);
            }
            None => {
                target.remove(&key);
            }
        }
    }
}

impl Chain for MemoryState {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn current_supply(&self) -> u64 {
        self.current_supply
    }

    fn not_distributed_validator_reward(&self) -> u64 {
        self.not_distributed_validator_reward
    }

    fn utxo(&self, id: &UtxoId) -> Option<Utxo> {
        self.utxos.get(id).cloned()
    }

    fn locked_utxos(&self, lock_tx_id: &Id, kind: LockState) -> Vec<Utxo> {
        // BTreeMap iteration is already in utxo id order.
        self.utxos
            .values()
            .filter(|utxo| {
                utxo.out
                    .lock_ids()
                    .map(|ids| ids.id_for(kind) == Some(*lock_tx_id))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    fn staker(&self, set: StakerSet, subnet_id: &Id, node_id: &NodeId) -> Option<Staker> {
        self.stakers.get(&(set, *subnet_id, *node_id)).cloned()
    }

    fn stakers(&self, set: StakerSet) -> Vec<Staker> {
        let mut stakers: Vec<Staker> = self
            .stakers
            .iter()
            .filter(|((s, _, _), _)| *s == set)
            .map(|(_, staker)| staker.clone())
            .collect();
        sort_stakers(&mut stakers, set);
        stakers
    }

    fn deposit(&self, deposit_tx_id: &Id) -> Option<Deposit> {
        self.deposits.get(deposit_tx_id).cloned()
    }

    fn deposit_offer(&self, offer_id: &Id) -> Option<DepositOffer> {
        self.deposit_offers.get(offer_id).cloned()
    }

    fn address_state(&self, address: &Address) -> AddressState {
        self.address_states
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    fn multisig_alias(&self, alias: &Address) -> Option<MultisigAlias> {
        self.multisig_aliases.get(alias).cloned()
    }

    fn node_owner(&self, node_id: &NodeId) -> Option<Address> {
        self.node_links.get(node_id).copied()
    }

    fn registered_node(&self, member: &Address) -> Option<NodeId> {
        self.member_links.get(member).copied()
    }

    fn claimable(&self, owner_id: &Id) -> Option<Claimable> {
        self.claimables.get(owner_id).cloned()
    }

    fn subnet_owner(&self, subnet_id: &Id) -> Option<OutputOwners> {
        self.subnets.get(subnet_id).cloned()
    }

    fn chain_record(&self, chain_id: &Id) -> Option<ChainRecord> {
        self.chains.get(chain_id).cloned()
    }

    fn atomic_removed(&self, peer_chain: &Id, utxo_id: &UtxoId) -> bool {
        self.atomic_outbox
            .get(peer_chain)
            .is_some_and(|ops| ops.remove.contains(utxo_id))
    }
}

impl ChainMut for MemoryState {
    fn set_timestamp(&mut self, time: u64) {
        self.timestamp = time;
    }

    fn set_current_supply(&mut self, supply: u64) {
        self.current_supply = supply;
    }

    fn set_not_distributed_validator_reward(&mut self, amount: u64) {
        self.not_distributed_validator_reward = amount;
    }

    fn add_utxo(&mut self, utxo: Utxo) {
        self.utxos.insert(utxo.id, utxo);
    }

    fn delete_utxo(&mut self, id: &UtxoId) {
        self.utxos.remove(id);
    }

    fn put_staker(&mut self, set: StakerSet, staker: Staker) {
        self.stakers
            .insert((set, staker.subnet_id, staker.node_id), staker);
    }

    fn delete_staker(&mut self, set: StakerSet, subnet_id: &Id, node_id: &NodeId) {
        self.stakers.remove(&(set, *subnet_id, *node_id));
    }

    fn put_deposit(&mut self, deposit_tx_id: Id, deposit: Deposit) {
        self.deposits.insert(deposit_tx_id, deposit);
    }

    fn delete_deposit(&mut self, deposit_tx_id: &Id) {
        self.deposits.remove(deposit_tx_id);
    }

    fn set_address_state(&mut self, address: Address, state: AddressState) {
        self.address_states.insert(address, state);
    }

    fn put_multisig_alias(&mut self, alias: MultisigAlias) {
        self.multisig_aliases.insert(alias.id, alias);
    }

    fn link_node(&mut self, node_id: NodeId, member: Address) {
        self.node_links.insert(node_id, member);
        self.member_links.insert(member, node_id);
    }

    fn unlink_node(&mut self, node_id: &NodeId, member: &Address) {
        self.node_links.remove(node_id);
        self.member_links.remove(member);
    }

    fn put_claimable(&mut self, owner_id: Id, claimable: Claimable) {
        self.claimables.insert(owner_id, claimable);
    }

    fn delete_claimable(&mut self, owner_id: &Id) {
        self.claimables.remove(owner_id);
    }

    fn put_subnet(&mut self, subnet_id: Id, owner: OutputOwners) {
        self.subnets.insert(subnet_id, owner);
    }

    fn put_chain_record(&mut self, record: ChainRecord) {
        self.chains.insert(record.id, record);
    }

    fn add_atomic_requests(&mut self, peer_chain: Id, ops: AtomicOps) {
        self.atomic_outbox.entry(peer_chain).or_default().extend(ops);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deposit::OfferError;
    use crate::state::Diff;
    use crate::utxo::{Output, TransferOutput};

    #[test]
    fn apply_replays_diff() {
        let mut base = MemoryState::new(10);
        let u = Utxo::new(
            UtxoId::new(Id::from_label("tx"), 0),
            Id::from_label("asset"),
            Output::Transfer(TransferOutput::new(
                3,
                OutputOwners::single(Address::from_label("a")),
            )),
        );
        base.add_utxo(u.clone());

        let changes = {
            let mut diff = Diff::new(&base);
            diff.delete_utxo(&u.id);
            diff.set_timestamp(20);
            diff.set_current_supply(99);
            diff.add_atomic_requests(Id::from_label("peer"), AtomicOps::default());
            diff.into_changes()
        };
        base.apply(changes);

        assert_eq!(base.utxo(&u.id), None);
        assert_eq!(base.timestamp(), 20);
        assert_eq!(base.current_supply(), 99);
        assert_eq!(base.take_atomic_requests().len(), 1);
        assert!(base.take_atomic_requests().is_empty());
    }

    #[test]
    fn rejects_invalid_offer() {
        let mut base = MemoryState::new(0);
        let mut offer = crate::deposit::offer::test_offer();
        offer.end = offer.start;
        match base.add_deposit_offer(offer) {
            Err(OfferError::EmptyWindow { .. }) => {}
            other => panic!("expected EmptyWindow, got {:?}", other),
        }
    }
}
