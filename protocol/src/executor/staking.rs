//! # Staking Set Validator
//!
//! Temporal and membership rules for the pending and current staker sets.
//! A node has at most one primary-network staker; subnet stakers ride on
//! top of it and must fit inside its window.

use std::collections::BTreeSet;

use super::auth::{verify_node_binding, verify_subnet_auth};
use super::ExecError;
use crate::config::{ExecutorConfig, PRIMARY_NETWORK_ID};
use crate::ids::{Address, Id, NodeId};
use crate::locked::LockState;
use crate::state::{AddressStateBit, Chain, Staker, StakerSet};
use crate::transaction::{AddSubnetValidatorTx, RemoveSubnetValidatorTx, Validator};
use crate::utxo::{Output, TransferOutput, TransferableInput, TransferableOutput};

fn verify_window(config: &ExecutorConfig, chain_time: u64, v: &Validator) -> Result<(), ExecError> {
    let duration = v.duration();
    if v.end <= v.start || duration < config.min_stake_duration {
        return Err(ExecError::StakeTooShort { duration });
    }
    if duration > config.max_stake_duration {
        return Err(ExecError::StakeTooLong { duration });
    }
    if v.start <= chain_time {
        return Err(ExecError::ChainTimeNotBeforeStart {
            start: v.start,
            chain_time,
        });
    }
    let max_start = chain_time.saturating_add(config.max_future_start_time);
    if v.start > max_start {
        return Err(ExecError::FutureStakeTime {
            start: v.start,
            max_start,
        });
    }
    Ok(())
}

/// Primary-network validator admission. Returns the consortium member the
/// node is registered to.
///
/// `signers` is the extra node credential.
pub fn verify_add_validator(
    config: &ExecutorConfig,
    chain: &dyn Chain,
    validator: &Validator,
    signers: &BTreeSet<Address>,
) -> Result<Address, ExecError> {
    verify_window(config, chain.timestamp(), validator)?;
    if validator.weight < config.min_validator_stake {
        return Err(ExecError::WeightTooSmall {
            weight: validator.weight,
        });
    }
    if validator.weight > config.max_validator_stake {
        return Err(ExecError::WeightTooLarge {
            weight: validator.weight,
        });
    }
    if chain.primary_staker(&validator.node_id).is_some() {
        return Err(ExecError::DuplicateValidator);
    }
    let member = verify_node_binding(
        chain,
        &validator.node_id,
        signers,
        config.verify_node_signature,
    )?;
    let member_state = chain.address_state(&member);
    if !member_state.has(AddressStateBit::Consortium) {
        return Err(ExecError::NotConsortiumMember);
    }
    if member_state.has(AddressStateBit::NodeDeferred) {
        return Err(ExecError::MemberNodeDeferred);
    }
    Ok(member)
}

/// Subnet validator admission. `signers` is the subnet auth credential.
pub fn verify_add_subnet_validator(
    config: &ExecutorConfig,
    chain: &dyn Chain,
    tx: &AddSubnetValidatorTx,
    signers: &BTreeSet<Address>,
) -> Result<(), ExecError> {
    let v = &tx.validator;
    verify_window(config, chain.timestamp(), v)?;
    if tx.subnet_id == PRIMARY_NETWORK_ID || chain.subnet_owner(&tx.subnet_id).is_none() {
        return Err(ExecError::SubnetNotFound);
    }
    let (_, primary) = chain
        .primary_staker(&v.node_id)
        .ok_or(ExecError::NotValidator)?;
    if !v.within(primary.start, primary.end) {
        return Err(ExecError::ValidatorWindowNotSubset);
    }
    let duplicate = [StakerSet::Pending, StakerSet::Current]
        .into_iter()
        .any(|set| chain.staker(set, &tx.subnet_id, &v.node_id).is_some());
    if duplicate {
        return Err(ExecError::DuplicateValidator);
    }
    verify_subnet_auth(chain, &tx.subnet_id, signers)
}

/// Which set the subnet staker being removed is in.
pub fn verify_remove_subnet_validator(
    chain: &dyn Chain,
    tx: &RemoveSubnetValidatorTx,
    signers: &BTreeSet<Address>,
) -> Result<StakerSet, ExecError> {
    if tx.subnet_id == PRIMARY_NETWORK_ID {
        return Err(ExecError::UnauthorizedSubnetModification);
    }
    let set = [StakerSet::Current, StakerSet::Pending]
        .into_iter()
        .find(|set| chain.staker(*set, &tx.subnet_id, &tx.node_id).is_some())
        .ok_or(ExecError::StakerNotFound)?;
    verify_subnet_auth(chain, &tx.subnet_id, signers)?;
    Ok(set)
}

/// The current primary staker created by `staker_tx_id`.
pub fn current_primary_staker(chain: &dyn Chain, staker_tx_id: &Id) -> Result<Staker, ExecError> {
    chain
        .stakers(StakerSet::Current)
        .into_iter()
        .find(|s| s.tx_id == *staker_tx_id && s.subnet_id == PRIMARY_NETWORK_ID)
        .ok_or(ExecError::StakerNotFound)
}

/// The one body that releases `staker`'s bond: every UTXO bonded by its tx,
/// spent whole and reproduced with the bond slot cleared, in utxo order.
/// The bonded total must equal the staker weight.
pub fn expected_bond_release(
    chain: &dyn Chain,
    staker: &Staker,
) -> Result<(Vec<TransferableInput>, Vec<TransferableOutput>), ExecError> {
    let bonded = chain.locked_utxos(&staker.tx_id, LockState::BONDED);
    let mut ins = Vec::with_capacity(bonded.len());
    let mut outs = Vec::with_capacity(bonded.len());
    let mut total: u128 = 0;
    for utxo in &bonded {
        let ids = utxo.out.lock_ids().map_err(|_| ExecError::WrongType)?;
        ins.push(TransferableInput::spending(utxo).map_err(|_| ExecError::WrongType)?);
        let inner = utxo.out.inner();
        outs.push(TransferableOutput::new(
            utxo.asset_id,
            Output::with_locks(
                ids.unlock(LockState::BONDED),
                TransferOutput::new(inner.amount, inner.owners.clone()),
            ),
        ));
        total += u128::from(inner.amount);
    }
    if total != u128::from(staker.weight) {
        return Err(ExecError::InvalidSystemTxBody);
    }
    Ok((ins, outs))
}

/// Earliest time any staker changes sets.
pub fn next_staker_change_time(chain: &dyn Chain) -> Option<u64> {
    let next_start = chain.stakers(StakerSet::Pending).first().map(|s| s.start);
    let next_end = chain.stakers(StakerSet::Current).first().map(|s| s.end);
    match (next_start, next_end) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Pending stakers due by `time`.
pub fn stakers_to_promote(chain: &dyn Chain, time: u64) -> Vec<Staker> {
    chain
        .stakers(StakerSet::Pending)
        .into_iter()
        .take_while(|s| s.start <= time)
        .collect()
}

/// Current subnet stakers whose window closed by `time`. Primary stakers
/// leave only through a reward proposal.
pub fn subnet_stakers_to_remove(chain: &dyn Chain, time: u64) -> Vec<Staker> {
    chain
        .stakers(StakerSet::Current)
        .into_iter()
        .take_while(|s| s.end <= time)
        .filter(|s| s.subnet_id != PRIMARY_NETWORK_ID)
        .collect()
}

/// Whether the node validates the primary network in either set.
pub fn is_primary_validator(chain: &dyn Chain, node_id: &NodeId) -> bool {
    chain.primary_staker(node_id).is_some()
}
