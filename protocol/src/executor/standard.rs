//! Standard (non-proposal) transaction execution.
//!
//! Every kind validates completely against the read view before it
//! writes anything. Writes go to the caller's overlay, which is dropped on
//! any error.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use super::atomic::{plan_reward_distribution, verify_export, verify_import, verify_rewards_import};
use super::auth::{
    owners_satisfied, signed_as, verify_consortium_member, verify_node_signature,
    verify_subnet_auth,
};
use super::flow::{fetch_consumed, verify_flow, FlowRules, FlowSummary};
use super::staking::{
    is_primary_validator, verify_add_subnet_validator, verify_add_validator,
    verify_remove_subnet_validator,
};
use super::{Backend, ExecError};
use crate::config::PRIMARY_NETWORK_ID;
use crate::deposit::{Deposit, DepositOffer};
use crate::ids::{Address, Id, ShortId, UtxoId};
use crate::locked::LockState;
use crate::shared_memory::{AtomicOps, AtomicUtxo};
use crate::state::{
    AddressStateBit, Chain, ChainMut, ChainRecord, Claimable, MultisigAlias, Staker, StakerSet,
};
use crate::transaction::*;
use crate::utxo::{Output, OutputOwners, TransferOutput, TransferableInput, TransferableOutput, Utxo};

/// Recover the signer set of every credential, in order.
pub fn recover_signers(tx: &Tx) -> Result<Vec<BTreeSet<Address>>, ExecError> {
    let expected = tx.body().expected_credential_count();
    if tx.creds().len() != expected {
        return Err(ExecError::WrongCredentialCount {
            expected,
            got: tx.creds().len(),
        });
    }
    let id = tx.id();
    tx.creds()
        .iter()
        .enumerate()
        .map(|(index, cred)| cred.signers(&id).ok_or(ExecError::InvalidSignature { index }))
        .collect()
}

/// Validate `tx` against `state` and write its effects into `state`.
pub fn execute<S: ChainMut>(backend: &Backend<'_>, state: &mut S, tx: &Tx) -> Result<(), ExecError> {
    let body = tx.body();
    body.syntactic_verify()?;
    if body.is_proposal() || matches!(body, UnsignedTx::TransformSubnet(_)) {
        return Err(ExecError::WrongTxType(body.kind()));
    }
    let signers = recover_signers(tx)?;

    let mut executor = StandardTxExecutor {
        backend,
        state,
        tx_id: tx.id(),
        signers: &signers,
    };
    executor.visit(body)?;
    debug!(tx_id = %tx.id(), kind = %body.kind(), "standard transaction executed");
    Ok(())
}

struct StandardTxExecutor<'e, S> {
    backend: &'e Backend<'e>,
    state: &'e mut S,
    tx_id: Id,
    signers: &'e [BTreeSet<Address>],
}

impl<'e, S: ChainMut> StandardTxExecutor<'e, S> {
    fn chain(&self) -> &dyn Chain {
        &*self.state
    }

    fn now(&self) -> u64 {
        self.state.timestamp()
    }

    fn fee_rules(&self, fee: u64) -> FlowRules {
        let config = self.backend.config;
        FlowRules::fee(config.fee_asset_id, fee, config.lock_mode_bond_deposit)
    }

    fn require_lock_mode(&self) -> Result<(), ExecError> {
        if self.backend.config.lock_mode_bond_deposit {
            Ok(())
        } else {
            Err(ExecError::WrongLockMode)
        }
    }

    /// Signers of the credentials covering the first `count` inputs.
    fn input_signers(&self, count: usize) -> Result<&'e [BTreeSet<Address>], ExecError> {
        self.signers
            .get(..count)
            .ok_or(ExecError::WrongCredentialCount {
                expected: count,
                got: self.signers.len(),
            })
    }

    fn credential(&self, index: usize) -> Result<&'e BTreeSet<Address>, ExecError> {
        self.signers
            .get(index)
            .ok_or(ExecError::WrongCredentialCount {
                expected: index + 1,
                got: self.signers.len(),
            })
    }

    fn flow(
        &self,
        ins: &[TransferableInput],
        outs: &[TransferableOutput],
        rules: &FlowRules,
    ) -> Result<FlowSummary, ExecError> {
        let consumed = fetch_consumed(self.chain(), ins)?;
        let signers = self.input_signers(ins.len())?;
        verify_flow(self.chain(), self.now(), ins, &consumed, signers, outs, rules)
    }

    fn consume(&mut self, ins: &[TransferableInput]) {
        for input in ins {
            self.state.delete_utxo(&input.utxo_id);
        }
    }

    fn produce(&mut self, index: usize, out: &TransferableOutput) {
        let output = match out.out.lock_ids() {
            Ok(ids) => Output::with_locks(ids.resolve(self.tx_id), out.out.inner().clone()),
            Err(_) => out.out.clone(),
        };
        self.state.add_utxo(Utxo::new(
            UtxoId::new(self.tx_id, index as u32),
            out.asset_id,
            output,
        ));
    }

    fn consume_and_produce(&mut self, base: &BaseTx) {
        self.consume(&base.ins);
        for (index, out) in base.outs.iter().enumerate() {
            self.produce(index, out);
        }
    }

    fn visit(&mut self, body: &UnsignedTx) -> Result<(), ExecError> {
        match body {
            UnsignedTx::Base(tx) => self.base(tx),
            UnsignedTx::AddValidator(tx) => self.add_validator(tx),
            UnsignedTx::AddSubnetValidator(tx) => self.add_subnet_validator(tx),
            UnsignedTx::RemoveSubnetValidator(tx) => self.remove_subnet_validator(tx),
            UnsignedTx::Deposit(tx) => self.deposit(tx),
            UnsignedTx::UnlockDeposit(tx) => self.unlock_deposit(tx),
            UnsignedTx::Claim(tx) => self.claim(tx),
            UnsignedTx::RegisterNode(tx) => self.register_node(tx),
            UnsignedTx::AddressState(tx) => self.address_state(tx),
            UnsignedTx::MultisigAlias(tx) => self.multisig_alias(tx),
            UnsignedTx::RewardsImport(tx) => self.rewards_import(tx),
            UnsignedTx::Import(tx) => self.import(tx),
            UnsignedTx::Export(tx) => self.export(tx),
            UnsignedTx::CreateSubnet(tx) => self.create_subnet(tx),
            UnsignedTx::CreateChain(tx) => self.create_chain(tx),
            UnsignedTx::TransformSubnet(_)
            | UnsignedTx::RewardValidator(_)
            | UnsignedTx::AdvanceTime(_) => Err(ExecError::WrongTxType(body.kind())),
        }
    }

    // -----------------------------------------------------------------------
    // Value transfer
    // -----------------------------------------------------------------------

    fn base(&mut self, tx: &BaseTx) -> Result<(), ExecError> {
        self.flow(&tx.ins, &tx.outs, &self.fee_rules(self.backend.config.tx_fee))?;
        self.consume_and_produce(tx);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Staking
    // -----------------------------------------------------------------------

    fn add_validator(&mut self, tx: &AddValidatorTx) -> Result<(), ExecError> {
        self.require_lock_mode()?;
        let config = self.backend.config;
        let node_signers = self.credential(tx.base.ins.len())?;
        let member = verify_add_validator(config, self.chain(), &tx.validator, node_signers)?;

        let rules = self.fee_rules(config.tx_fee).applying(LockState::BONDED);
        let summary = self.flow(&tx.base.ins, &tx.base.outs, &rules)?;
        let bonded = summary.newly_locked(&config.fee_asset_id, LockState::BONDED);
        if bonded != tx.validator.weight
            || summary.total_newly_locked(LockState::BONDED) != u128::from(bonded)
        {
            debug!(bonded, weight = tx.validator.weight, "bond differs from validator weight");
            return Err(ExecError::FlowCheckFailed);
        }

        self.consume_and_produce(&tx.base);
        let v = &tx.validator;
        self.state.put_staker(
            StakerSet::Pending,
            Staker {
                tx_id: self.tx_id,
                node_id: v.node_id,
                subnet_id: PRIMARY_NETWORK_ID,
                start: v.start,
                end: v.end,
                weight: v.weight,
            },
        );
        info!(
            node = %v.node_id,
            member = %config.display_address(&member),
            weight = v.weight,
            start = v.start,
            "validator scheduled"
        );
        Ok(())
    }

    fn add_subnet_validator(&mut self, tx: &AddSubnetValidatorTx) -> Result<(), ExecError> {
        let config = self.backend.config;
        let auth = self.credential(tx.base.ins.len())?;
        verify_add_subnet_validator(config, self.chain(), tx, auth)?;
        self.flow(&tx.base.ins, &tx.base.outs, &self.fee_rules(config.tx_fee))?;

        self.consume_and_produce(&tx.base);
        let v = &tx.validator;
        self.state.put_staker(
            StakerSet::Pending,
            Staker {
                tx_id: self.tx_id,
                node_id: v.node_id,
                subnet_id: tx.subnet_id,
                start: v.start,
                end: v.end,
                weight: v.weight,
            },
        );
        info!(node = %v.node_id, subnet = %tx.subnet_id, "subnet validator scheduled");
        Ok(())
    }

    fn remove_subnet_validator(&mut self, tx: &RemoveSubnetValidatorTx) -> Result<(), ExecError> {
        let auth = self.credential(tx.base.ins.len())?;
        let set = verify_remove_subnet_validator(self.chain(), tx, auth)?;
        self.flow(
            &tx.base.ins,
            &tx.base.outs,
            &self.fee_rules(self.backend.config.tx_fee),
        )?;

        self.consume_and_produce(&tx.base);
        self.state.delete_staker(set, &tx.subnet_id, &tx.node_id);
        info!(node = %tx.node_id, subnet = %tx.subnet_id, ?set, "subnet validator removed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Deposits and rewards
    // -----------------------------------------------------------------------

    fn deposit(&mut self, tx: &DepositTx) -> Result<(), ExecError> {
        self.require_lock_mode()?;
        let config = self.backend.config;
        let now = self.now();
        let offer = self
            .chain()
            .deposit_offer(&tx.deposit_offer_id)
            .ok_or(ExecError::DepositOfferNotFound)?;

        let rules = self.fee_rules(config.tx_fee).applying(LockState::DEPOSITED);
        let summary = self.flow(&tx.base.ins, &tx.base.outs, &rules)?;
        let amount = summary.newly_locked(&config.fee_asset_id, LockState::DEPOSITED);
        if summary.total_newly_locked(LockState::DEPOSITED) != u128::from(amount) {
            debug!("deposit locks a non-fee asset");
            return Err(ExecError::FlowCheckFailed);
        }
        offer.check_eligibility(now, tx.deposit_duration, amount)?;

        let deposit = Deposit {
            offer_id: offer.id,
            start: now,
            duration: tx.deposit_duration,
            amount,
            unlocked_amount: 0,
            claimed_reward: 0,
            rewards_owner: tx.rewards_owner.clone(),
        };
        let reward = deposit.total_reward(&offer);
        let supply = self
            .state
            .current_supply()
            .checked_add(reward)
            .filter(|supply| *supply <= config.max_supply)
            .ok_or(ExecError::SupplyOverflow)?;

        self.consume_and_produce(&tx.base);
        self.state.put_deposit(self.tx_id, deposit);
        self.state.set_current_supply(supply);
        info!(deposit = %self.tx_id, amount, reward, duration = tx.deposit_duration, "deposit created");
        Ok(())
    }

    fn unlock_deposit(&mut self, tx: &UnlockDepositTx) -> Result<(), ExecError> {
        self.require_lock_mode()?;
        let now = self.now();
        let rules = self
            .fee_rules(self.backend.config.tx_fee)
            .removing(LockState::DEPOSITED);
        let summary = self.flow(&tx.base.ins, &tx.base.outs, &rules)?;

        let mut updated: Vec<(Id, Deposit)> = Vec::new();
        let mut credits: BTreeMap<Id, Claimable> = BTreeMap::new();
        let mut total_released: u64 = 0;
        for (deposit_id, released) in summary.released(LockState::DEPOSITED) {
            let (mut deposit, offer) = self.deposit_with_offer(&deposit_id)?;
            let unlockable = deposit.unlockable_amount(&offer, now);
            if released != unlockable {
                return Err(ExecError::UnlockAmountMismatch {
                    released,
                    unlockable,
                });
            }
            total_released = total_released.saturating_add(released);
            deposit.unlocked_amount += released;

            if deposit.is_fully_unlocked() {
                let remaining = deposit.remaining_reward(&offer);
                if remaining > 0 {
                    let owner_id = deposit.rewards_owner.owner_id();
                    let mut claimable = match credits.remove(&owner_id) {
                        Some(c) => c,
                        None => self
                            .chain()
                            .claimable(&owner_id)
                            .unwrap_or_else(|| Claimable::new(deposit.rewards_owner.clone())),
                    };
                    claimable.deposit_reward = claimable
                        .deposit_reward
                        .checked_add(remaining)
                        .ok_or(ExecError::SupplyOverflow)?;
                    credits.insert(owner_id, claimable);
                }
            }
            updated.push((deposit_id, deposit));
        }
        if total_released == 0 {
            return Err(ExecError::UnlockAmountMismatch {
                released: 0,
                unlockable: 0,
            });
        }

        self.consume_and_produce(&tx.base);
        for (deposit_id, deposit) in updated {
            if deposit.is_fully_unlocked() {
                self.state.delete_deposit(&deposit_id);
                info!(deposit = %deposit_id, "deposit fully unlocked");
            } else {
                self.state.put_deposit(deposit_id, deposit);
            }
        }
        for (owner_id, claimable) in credits {
            self.state.put_claimable(owner_id, claimable);
        }
        debug!(released = total_released, "deposit principal unlocked");
        Ok(())
    }

    fn deposit_with_offer(&self, deposit_id: &Id) -> Result<(Deposit, DepositOffer), ExecError> {
        let deposit = self
            .chain()
            .deposit(deposit_id)
            .ok_or(ExecError::DepositNotFound)?;
        let offer = self
            .chain()
            .deposit_offer(&deposit.offer_id)
            .ok_or(ExecError::DepositOfferNotFound)?;
        Ok((deposit, offer))
    }

    fn claim(&mut self, tx: &ClaimTx) -> Result<(), ExecError> {
        let config = self.backend.config;
        let now = self.now();
        let first_claim_cred = tx.base.ins.len();

        let mut deposits: BTreeMap<Id, (Deposit, DepositOffer)> = BTreeMap::new();
        let mut claimables: BTreeMap<Id, Claimable> = BTreeMap::new();
        let mut total: u64 = 0;

        for (i, entry) in tx.claimables.iter().enumerate() {
            let signers = self.credential(first_claim_cred + i)?;
            match entry.kind {
                ClaimKind::ActiveDepositReward(deposit_id) => {
                    let (mut deposit, offer) = match deposits.remove(&deposit_id) {
                        Some(pair) => pair,
                        None => self.deposit_with_offer(&deposit_id)?,
                    };
                    if !owners_satisfied(self.chain(), &deposit.rewards_owner, signers, now) {
                        return Err(ExecError::DepositCredentialMismatch);
                    }
                    let available = deposit.claimable_reward(&offer, now);
                    if entry.amount > available {
                        return Err(ExecError::ClaimAmountExceeded {
                            requested: entry.amount,
                            available,
                        });
                    }
                    deposit.claimed_reward += entry.amount;
                    deposits.insert(deposit_id, (deposit, offer));
                }
                ClaimKind::ExpiredDepositReward(owner_id) | ClaimKind::ValidatorReward(owner_id) => {
                    let mut claimable = match claimables.remove(&owner_id) {
                        Some(c) => c,
                        None => self
                            .chain()
                            .claimable(&owner_id)
                            .ok_or(ExecError::ClaimableNotFound)?,
                    };
                    if !owners_satisfied(self.chain(), &claimable.owners, signers, now) {
                        return Err(ExecError::ClaimableCredentialMismatch);
                    }
                    let field = match entry.kind {
                        ClaimKind::ValidatorReward(_) => &mut claimable.validator_reward,
                        _ => &mut claimable.deposit_reward,
                    };
                    if entry.amount > *field {
                        return Err(ExecError::ClaimAmountExceeded {
                            requested: entry.amount,
                            available: *field,
                        });
                    }
                    *field -= entry.amount;
                    claimables.insert(owner_id, claimable);
                }
            }
            total = total
                .checked_add(entry.amount)
                .ok_or(ExecError::SupplyOverflow)?;
        }

        self.flow(&tx.base.ins, &tx.base.outs, &self.fee_rules(config.tx_fee))?;

        self.consume_and_produce(&tx.base);
        for (deposit_id, (deposit, _)) in deposits {
            self.state.put_deposit(deposit_id, deposit);
        }
        for (owner_id, claimable) in claimables {
            if claimable.is_empty() {
                self.state.delete_claimable(&owner_id);
            } else {
                self.state.put_claimable(owner_id, claimable);
            }
        }
        if total > 0 {
            let payout = TransferableOutput::new(
                config.fee_asset_id,
                Output::Transfer(TransferOutput::new(total, tx.claim_to.clone())),
            );
            self.produce(tx.base.outs.len(), &payout);
        }
        info!(claimed = total, entries = tx.claimables.len(), "rewards claimed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Consortium and addresses
    // -----------------------------------------------------------------------

    fn register_node(&mut self, tx: &RegisterNodeTx) -> Result<(), ExecError> {
        let member = tx.consortium_member;
        let first_extra = tx.base.ins.len();
        verify_consortium_member(self.chain(), &member, self.credential(first_extra)?)?;

        let registered = self.chain().registered_node(&member);
        match tx.old_node_id {
            Some(old) => {
                if registered != Some(old) {
                    return Err(ExecError::NodeNotRegistered);
                }
                if is_primary_validator(self.chain(), &old) {
                    return Err(ExecError::NodeStillValidating);
                }
            }
            None => {
                if registered.is_some() {
                    return Err(ExecError::NodeAlreadyRegistered);
                }
            }
        }
        if let Some(new) = tx.new_node_id {
            if new.is_empty() {
                return Err(ExecError::EmptyAddress);
            }
            if self.chain().node_owner(&new).is_some() {
                return Err(ExecError::NodeAlreadyRegistered);
            }
            verify_node_signature(&new, self.credential(first_extra + 1)?)?;
        }

        self.flow(
            &tx.base.ins,
            &tx.base.outs,
            &self.fee_rules(self.backend.config.tx_fee),
        )?;

        self.consume_and_produce(&tx.base);
        if let Some(old) = tx.old_node_id {
            self.state.unlink_node(&old, &member);
        }
        if let Some(new) = tx.new_node_id {
            self.state.link_node(new, member);
        }
        info!(
            member = %self.backend.config.display_address(&member),
            old = ?tx.old_node_id,
            new = ?tx.new_node_id,
            "node registration changed"
        );
        Ok(())
    }

    fn address_state(&mut self, tx: &AddressStateTx) -> Result<(), ExecError> {
        if tx.address.is_empty() {
            return Err(ExecError::EmptyAddress);
        }
        let executor_signers = self.credential(tx.base.ins.len())?;
        if !signed_as(self.chain(), &tx.executor, executor_signers) {
            return Err(ExecError::AddressStateNotPermitted);
        }
        let roles = self.chain().address_state(&tx.executor);
        let permitted = match tx.bit {
            AddressStateBit::Admin
            | AddressStateBit::KycRole
            | AddressStateBit::Consortium
            | AddressStateBit::NodeDeferred => roles.has(AddressStateBit::Admin),
            AddressStateBit::KycVerified | AddressStateBit::KycExpired => {
                roles.has(AddressStateBit::Admin) || roles.has(AddressStateBit::KycRole)
            }
        };
        if !permitted {
            return Err(ExecError::AddressStateNotPermitted);
        }

        let current = self.chain().address_state(&tx.address);
        let next = if tx.remove {
            if tx.bit == AddressStateBit::Consortium
                && self.chain().registered_node(&tx.address).is_some()
            {
                return Err(ExecError::MemberHasRegisteredNode);
            }
            current.without(tx.bit)
        } else {
            if let Some(partner) = tx.bit.exclusive_with() {
                if current.has(partner) {
                    return Err(ExecError::InvalidRoleTransition);
                }
            }
            current.with(tx.bit)
        };

        self.flow(
            &tx.base.ins,
            &tx.base.outs,
            &self.fee_rules(self.backend.config.tx_fee),
        )?;

        self.consume_and_produce(&tx.base);
        self.state.set_address_state(tx.address, next);
        info!(
            address = %self.backend.config.display_address(&tx.address),
            bit = ?tx.bit,
            remove = tx.remove,
            "address state changed"
        );
        Ok(())
    }

    fn multisig_alias(&mut self, tx: &MultisigAliasTx) -> Result<(), ExecError> {
        let alias_id = match tx.alias {
            None => ShortId::from_id(&self.tx_id.prefixed(0)),
            Some(alias) => {
                let existing = self
                    .chain()
                    .multisig_alias(&alias)
                    .ok_or(ExecError::AliasNotFound)?;
                let signers = self.credential(tx.base.ins.len())?;
                if !owners_satisfied(self.chain(), &existing.owners, signers, self.now()) {
                    return Err(ExecError::UnauthorizedAliasUpdate);
                }
                alias
            }
        };

        self.flow(
            &tx.base.ins,
            &tx.base.outs,
            &self.fee_rules(self.backend.config.tx_fee),
        )?;

        self.consume_and_produce(&tx.base);
        self.state.put_multisig_alias(MultisigAlias {
            id: alias_id,
            owners: tx.owners.clone(),
            memo: tx.memo.clone(),
        });
        info!(alias = %self.backend.config.display_address(&alias_id), "multisig alias stored");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cross-chain
    // -----------------------------------------------------------------------

    fn rewards_import(&mut self, tx: &RewardsImportTx) -> Result<(), ExecError> {
        let config = self.backend.config;
        let records = verify_rewards_import(config, self.chain(), self.backend.shared_memory, tx)?;
        let imported = records.iter().try_fold(0u64, |acc, r| {
            acc.checked_add(r.utxo.out.amount())
                .ok_or(ExecError::SupplyOverflow)
        })?;
        let plan = plan_reward_distribution(self.chain(), imported)?;

        let mut credits = Vec::with_capacity(plan.recipients.len());
        for member in &plan.recipients {
            let owners = OutputOwners::single(*member);
            let owner_id = owners.owner_id();
            let mut claimable = self
                .chain()
                .claimable(&owner_id)
                .unwrap_or_else(|| Claimable::new(owners));
            claimable.validator_reward = claimable
                .validator_reward
                .checked_add(plan.per_recipient)
                .ok_or(ExecError::SupplyOverflow)?;
            credits.push((owner_id, claimable));
        }

        for (owner_id, claimable) in credits {
            self.state.put_claimable(owner_id, claimable);
        }
        self.state
            .set_not_distributed_validator_reward(plan.remainder);
        self.state.add_atomic_requests(
            config.reward_import_chain_id,
            AtomicOps {
                remove: records.iter().map(|r| r.utxo.id).collect(),
                put: Vec::new(),
            },
        );
        info!(
            imported,
            recipients = plan.recipients.len(),
            per_recipient = plan.per_recipient,
            undistributed = plan.remainder,
            "validator rewards imported"
        );
        Ok(())
    }

    fn import(&mut self, tx: &ImportTx) -> Result<(), ExecError> {
        let config = self.backend.config;
        let imported = verify_import(config, self.chain(), self.backend.shared_memory, tx)?;

        let mut ins = tx.base.ins.clone();
        ins.extend(tx.imported_ins.iter().cloned());
        let mut consumed = fetch_consumed(self.chain(), &tx.base.ins)?;
        consumed.extend(imported);
        let signers = self.input_signers(ins.len())?;
        verify_flow(
            self.chain(),
            self.now(),
            &ins,
            &consumed,
            signers,
            &tx.base.outs,
            &self.fee_rules(config.tx_fee),
        )?;

        self.consume_and_produce(&tx.base);
        self.state.add_atomic_requests(
            tx.source_chain,
            AtomicOps {
                remove: tx.imported_ins.iter().map(|i| i.utxo_id).collect(),
                put: Vec::new(),
            },
        );
        info!(source = %tx.source_chain, count = tx.imported_ins.len(), "utxos imported");
        Ok(())
    }

    fn export(&mut self, tx: &ExportTx) -> Result<(), ExecError> {
        let config = self.backend.config;
        verify_export(config, tx)?;
        let mut outs = tx.base.outs.clone();
        outs.extend(tx.exported_outs.iter().cloned());
        self.flow(&tx.base.ins, &outs, &self.fee_rules(config.tx_fee))?;

        let now = self.now();
        self.consume_and_produce(&tx.base);
        let first_index = tx.base.outs.len();
        let put = tx
            .exported_outs
            .iter()
            .enumerate()
            .map(|(i, out)| AtomicUtxo {
                utxo: Utxo::new(
                    UtxoId::new(self.tx_id, (first_index + i) as u32),
                    out.asset_id,
                    out.out.clone(),
                ),
                timestamp: Some(now),
                traits: out.out.owners().addrs.clone(),
            })
            .collect();
        self.state.add_atomic_requests(
            tx.destination_chain,
            AtomicOps {
                remove: Vec::new(),
                put,
            },
        );
        info!(destination = %tx.destination_chain, count = tx.exported_outs.len(), "utxos exported");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Subnets and chains
    // -----------------------------------------------------------------------

    fn create_subnet(&mut self, tx: &CreateSubnetTx) -> Result<(), ExecError> {
        let fee = self.backend.config.create_subnet_fee;
        self.flow(&tx.base.ins, &tx.base.outs, &self.fee_rules(fee))?;
        self.consume_and_produce(&tx.base);
        self.state.put_subnet(self.tx_id, tx.owner.clone());
        info!(subnet = %self.tx_id, "subnet created");
        Ok(())
    }

    fn create_chain(&mut self, tx: &CreateChainTx) -> Result<(), ExecError> {
        if tx.subnet_id == PRIMARY_NETWORK_ID {
            return Err(ExecError::SubnetNotFound);
        }
        let auth = self.credential(tx.base.ins.len())?;
        verify_subnet_auth(self.chain(), &tx.subnet_id, auth)?;
        let fee = self.backend.config.create_chain_fee;
        self.flow(&tx.base.ins, &tx.base.outs, &self.fee_rules(fee))?;

        self.consume_and_produce(&tx.base);
        self.state.put_chain_record(ChainRecord {
            id: self.tx_id,
            subnet_id: tx.subnet_id,
            name: tx.chain_name.clone(),
            vm_id: tx.vm_id,
        });
        info!(chain = %self.tx_id, subnet = %tx.subnet_id, name = %tx.chain_name, "chain created");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
