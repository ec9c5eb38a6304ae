//! Proposal transactions: advance time and reward validator.
//!
//! A proposal is validated once and yields two change sets. Consensus
//! picks one; the other is discarded.

use tracing::{debug, info};

use super::staking::{
    current_primary_staker, expected_bond_release, next_staker_change_time,
    stakers_to_promote, subnet_stakers_to_remove,
};
use super::{Backend, ExecError};
use crate::config::PRIMARY_NETWORK_ID;
use crate::ids::{Id, UtxoId};
use crate::state::{AddressStateBit, Chain, ChainMut, Diff, StakerSet, StateChanges};
use crate::transaction::{AdvanceTimeTx, RewardValidatorTx, Tx, UnsignedTx};
use crate::utxo::{TransferableInput, TransferableOutput, Utxo};

/// The two possible outcomes of a proposal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProposalOutcome {
    pub on_commit: StateChanges,
    pub on_abort: StateChanges,
}

pub fn execute(
    backend: &Backend<'_>,
    parent: &dyn Chain,
    tx: &Tx,
) -> Result<ProposalOutcome, ExecError> {
    let body = tx.body();
    body.syntactic_verify()?;
    if !tx.creds().is_empty() {
        return Err(ExecError::WrongCredentialCount {
            expected: 0,
            got: tx.creds().len(),
        });
    }
    let outcome = match body {
        UnsignedTx::AdvanceTime(advance) => advance_time(backend, parent, advance)?,
        UnsignedTx::RewardValidator(reward) => {
            reward_validator(backend, parent, tx.id(), reward)?
        }
        other => return Err(ExecError::WrongTxType(other.kind())),
    };
    debug!(tx_id = %tx.id(), kind = %body.kind(), "proposal executed");
    Ok(outcome)
}

fn advance_time(
    backend: &Backend<'_>,
    parent: &dyn Chain,
    tx: &AdvanceTimeTx,
) -> Result<ProposalOutcome, ExecError> {
    let chain_time = parent.timestamp();
    if tx.time <= chain_time {
        return Err(ExecError::TimestampNotAfterCurrent {
            proposed: tx.time,
            chain_time,
        });
    }
    let max = backend
        .clock
        .unix_now()
        .saturating_add(backend.config.max_future_block_time);
    if tx.time > max {
        return Err(ExecError::TimestampTooFarInFuture {
            proposed: tx.time,
            max,
        });
    }
    if let Some(next_change) = next_staker_change_time(parent) {
        if tx.time > next_change {
            return Err(ExecError::TimestampBeyondStakerChange {
                proposed: tx.time,
                next_change,
            });
        }
    }

    let mut commit = Diff::new(parent);
    commit.set_timestamp(tx.time);
    let promoted = stakers_to_promote(parent, tx.time);
    for staker in &promoted {
        commit.delete_staker(StakerSet::Pending, &staker.subnet_id, &staker.node_id);
        commit.put_staker(StakerSet::Current, staker.clone());
    }
    let expired = subnet_stakers_to_remove(parent, tx.time);
    for staker in &expired {
        commit.delete_staker(StakerSet::Current, &staker.subnet_id, &staker.node_id);
    }
    info!(
        time = tx.time,
        promoted = promoted.len(),
        expired = expired.len(),
        "advance time proposed"
    );

    Ok(ProposalOutcome {
        on_commit: commit.into_changes(),
        on_abort: StateChanges::default(),
    })
}

fn reward_validator(
    backend: &Backend<'_>,
    parent: &dyn Chain,
    tx_id: Id,
    tx: &RewardValidatorTx,
) -> Result<ProposalOutcome, ExecError> {
    if !backend.config.lock_mode_bond_deposit {
        return Err(ExecError::WrongLockMode);
    }
    let staker = current_primary_staker(parent, &tx.staker_tx_id)?;
    let chain_time = parent.timestamp();
    if chain_time < staker.end {
        return Err(ExecError::RemoveStakerTooEarly {
            end: staker.end,
            chain_time,
        });
    }
    let (ins, outs) = expected_bond_release(parent, &staker)?;
    if ins != tx.ins || outs != tx.outs {
        debug!(staker = %staker.tx_id, "reward body differs from the bond release");
        return Err(ExecError::InvalidSystemTxBody);
    }

    let mut commit = Diff::new(parent);
    release_bond(&mut commit, tx_id, &ins, &outs);
    commit.delete_staker(StakerSet::Current, &PRIMARY_NETWORK_ID, &staker.node_id);

    let mut abort = Diff::new(parent);
    release_bond(&mut abort, tx_id, &ins, &outs);
    abort.delete_staker(StakerSet::Current, &PRIMARY_NETWORK_ID, &staker.node_id);
    if let Some(member) = parent.node_owner(&staker.node_id) {
        let state = parent
            .address_state(&member)
            .with(AddressStateBit::NodeDeferred);
        abort.set_address_state(member, state);
    }
    info!(node = %staker.node_id, weight = staker.weight, "validator reward proposed");

    Ok(ProposalOutcome {
        on_commit: commit.into_changes(),
        on_abort: abort.into_changes(),
    })
}

fn release_bond(
    state: &mut dyn ChainMut,
    tx_id: Id,
    ins: &[TransferableInput],
    outs: &[TransferableOutput],
) {
    for input in ins {
        state.delete_utxo(&input.utxo_id);
    }
    for (index, out) in outs.iter().enumerate() {
        state.add_utxo(Utxo::new(
            UtxoId::new(tx_id, index as u32),
            out.asset_id,
            out.out.clone(),
        ));
    }
}
