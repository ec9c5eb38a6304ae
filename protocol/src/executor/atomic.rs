//! Cross-chain value: reward import, generic import and export.
//!
//! Shared memory is eventually consistent. A timestamped record is only
//! final once `timestamp + cross_chain_sync_bound <= chain time`; the reward
//! import insists on a timestamp, generic imports accept untimestamped
//! records from chains that do not keep one.

use tracing::debug;

use super::ExecError;
use crate::config::ExecutorConfig;
use crate::ids::{Address, UtxoId};
use crate::shared_memory::{AtomicUtxo, SharedMemory};
use crate::state::{AddressStateBit, Chain, StakerSet};
use crate::transaction::{ExportTx, ImportTx, RewardsImportTx};
use crate::utxo::{TransferableInput, Utxo};

fn is_final(timestamp: u64, sync_bound: u64, chain_time: u64) -> bool {
    timestamp.saturating_add(sync_bound) <= chain_time
}

/// Every imported input must claim exactly its record's asset and amount,
/// unlocked.
fn verify_claims(ins: &[TransferableInput], records: &[AtomicUtxo]) -> Result<(), ExecError> {
    for (input, record) in ins.iter().zip(records) {
        if input.utxo_id != record.utxo.id {
            return Err(ExecError::ImportedInputsMismatch);
        }
        let matches = record
            .utxo
            .matches(input)
            .map_err(|_| ExecError::WrongType)?;
        if !matches || record.utxo.out.lock_ids().map_err(|_| ExecError::WrongType)?.is_locked() {
            return Err(ExecError::InputAmountMismatch);
        }
    }
    Ok(())
}

/// The imported inputs must be exactly the final reward records escrowed
/// for the treasury. Returns those records.
pub fn verify_rewards_import(
    config: &ExecutorConfig,
    chain: &dyn Chain,
    shared_memory: &dyn SharedMemory,
    tx: &RewardsImportTx,
) -> Result<Vec<AtomicUtxo>, ExecError> {
    let chain_time = chain.timestamp();
    let source = config.reward_import_chain_id;
    let (eligible, young): (Vec<AtomicUtxo>, Vec<AtomicUtxo>) = shared_memory
        .indexed(&source, &[config.treasury_address])?
        .into_iter()
        .filter(|record| !chain.atomic_removed(&source, &record.utxo.id))
        .partition(|record| {
            record
                .timestamp
                .is_some_and(|ts| is_final(ts, config.cross_chain_sync_bound, chain_time))
        });

    let declared: Vec<UtxoId> = tx.ins.iter().map(|i| i.utxo_id).collect();
    let available: Vec<UtxoId> = eligible.iter().map(|r| r.utxo.id).collect();
    if declared != available {
        if young.iter().any(|r| declared.contains(&r.utxo.id)) {
            return Err(ExecError::AtomicUtxoNotFinal);
        }
        debug!(
            declared = declared.len(),
            eligible = available.len(),
            "rewards import does not match eligible records"
        );
        return Err(ExecError::ImportedInputsMismatch);
    }
    verify_claims(&tx.ins, &eligible)?;
    Ok(eligible)
}

/// How an amount of validator reward is split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardDistribution {
    /// Consortium members of eligible current validators.
    pub recipients: Vec<Address>,
    pub per_recipient: u64,
    /// Left undistributed for the next import.
    pub remainder: u64,
}

/// Split `imported` plus the undistributed pool evenly across the members
/// behind current primary validators. Members marked node-deferred and
/// nodes without a member get nothing.
pub fn plan_reward_distribution(
    chain: &dyn Chain,
    imported: u64,
) -> Result<RewardDistribution, ExecError> {
    let total = imported
        .checked_add(chain.not_distributed_validator_reward())
        .ok_or(ExecError::SupplyOverflow)?;

    let mut recipients: Vec<Address> = chain
        .stakers(StakerSet::Current)
        .into_iter()
        .filter(|s| s.subnet_id == crate::config::PRIMARY_NETWORK_ID)
        .filter_map(|s| chain.node_owner(&s.node_id))
        .filter(|member| {
            !chain
                .address_state(member)
                .has(AddressStateBit::NodeDeferred)
        })
        .collect();
    recipients.sort();
    recipients.dedup();

    let count = recipients.len() as u64;
    if count == 0 {
        return Ok(RewardDistribution {
            recipients,
            per_recipient: 0,
            remainder: total,
        });
    }
    Ok(RewardDistribution {
        recipients,
        per_recipient: total / count,
        remainder: total % count,
    })
}

/// Fetch and vet the records an import consumes.
pub fn verify_import(
    config: &ExecutorConfig,
    chain: &dyn Chain,
    shared_memory: &dyn SharedMemory,
    tx: &ImportTx,
) -> Result<Vec<Utxo>, ExecError> {
    if tx.source_chain == config.chain_id || tx.source_chain.is_empty() {
        return Err(ExecError::InvalidDestinationChain);
    }
    let ids: Vec<UtxoId> = tx.imported_ins.iter().map(|i| i.utxo_id).collect();
    if ids.iter().any(|id| chain.atomic_removed(&tx.source_chain, id)) {
        debug!(source = %tx.source_chain, "import spends a record already consumed");
        return Err(ExecError::ImportedInputsMismatch);
    }
    let records = shared_memory
        .get(&tx.source_chain, &ids)
        .map_err(|err| {
            debug!(%err, "import references a missing record");
            ExecError::ImportedInputsMismatch
        })?;

    let chain_time = chain.timestamp();
    for record in &records {
        if let Some(ts) = record.timestamp {
            if !is_final(ts, config.cross_chain_sync_bound, chain_time) {
                return Err(ExecError::AtomicUtxoNotFinal);
            }
        }
    }
    verify_claims(&tx.imported_ins, &records)?;
    Ok(records.into_iter().map(|r| r.utxo).collect())
}

/// Exports go to another chain, unlocked.
pub fn verify_export(config: &ExecutorConfig, tx: &ExportTx) -> Result<(), ExecError> {
    if tx.destination_chain == config.chain_id || tx.destination_chain.is_empty() {
        return Err(ExecError::InvalidDestinationChain);
    }
    for out in &tx.exported_outs {
        if out.out.lock_ids().map_err(|_| ExecError::WrongType)?.is_locked() {
            debug!("locked value cannot be exported");
            return Err(ExecError::FlowCheckFailed);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PRIMARY_NETWORK_ID;
    use crate::ids::{Id, NodeId};
    use crate::shared_memory::MemorySharedMemory;
    use crate::shared_memory::AtomicOps;
    use crate::state::{AddressState, ChainMut, Diff, MemoryState, Staker};
    use crate::utxo::{Output, OutputOwners, TransferOutput};

    const NOW: u64 = 10_000;

    fn record(label: &str, amount: u64, timestamp: Option<u64>, config: &ExecutorConfig) -> AtomicUtxo {
        AtomicUtxo {
            utxo: Utxo::new(
                UtxoId::new(Id::from_label(label), 0),
                config.fee_asset_id,
                Output::Transfer(TransferOutput::new(
                    amount,
                    OutputOwners::single(config.treasury_address),
                )),
            ),
            timestamp,
            traits: vec![config.treasury_address],
        }
    }

    fn inputs(records: &[&AtomicUtxo]) -> Vec<TransferableInput> {
        let mut ins: Vec<_> = records
            .iter()
            .map(|r| TransferableInput::spending(&r.utxo).unwrap())
            .collect();
        ins.sort_by_key(|i| i.utxo_id);
        ins
    }

    #[test]
    fn only_final_timestamped_records_are_eligible() {
        let config = ExecutorConfig::default();
        let state = MemoryState::new(NOW);
        let old = record("old", 10, Some(NOW - config.cross_chain_sync_bound), &config);
        let young = record("young", 10, Some(NOW - config.cross_chain_sync_bound + 1), &config);
        let untimed = record("untimed", 10, None, &config);
        let mut memory = MemorySharedMemory::new();
        for r in [&old, &young, &untimed] {
            memory.insert_inbound(config.reward_import_chain_id, r.clone());
        }

        let tx = RewardsImportTx {
            ins: inputs(&[&old]),
        };
        let eligible = verify_rewards_import(&config, &state, &memory, &tx).unwrap();
        assert_eq!(eligible, vec![old.clone()]);

        let greedy = RewardsImportTx {
            ins: inputs(&[&old, &young]),
        };
        assert_eq!(
            verify_rewards_import(&config, &state, &memory, &greedy),
            Err(ExecError::AtomicUtxoNotFinal)
        );
        let partial = RewardsImportTx { ins: Vec::new() };
        assert_eq!(
            verify_rewards_import(&config, &state, &memory, &partial),
            Err(ExecError::ImportedInputsMismatch)
        );
    }

    #[test]
    fn imported_amount_must_match_record() {
        let config = ExecutorConfig::default();
        let state = MemoryState::new(NOW);
        let old = record("old", 10, Some(0), &config);
        let mut memory = MemorySharedMemory::new();
        memory.insert_inbound(config.reward_import_chain_id, old.clone());

        let mut ins = inputs(&[&old]);
        ins[0].input = crate::utxo::Input::Transfer { amount: 11 };
        assert_eq!(
            verify_rewards_import(&config, &state, &memory, &RewardsImportTx { ins }),
            Err(ExecError::InputAmountMismatch)
        );
    }

    #[test]
    fn distribution_skips_deferred_and_unlinked() {
        let mut state = MemoryState::new(NOW);
        state.set_not_distributed_validator_reward(5);
        for n in 1..=4u8 {
            state.put_staker(
                StakerSet::Current,
                Staker {
                    tx_id: Id::from_label(&format!("v{n}")),
                    node_id: NodeId::new([n; 20]),
                    subnet_id: PRIMARY_NETWORK_ID,
                    start: 0,
                    end: NOW + u64::from(n),
                    weight: 1,
                },
            );
        }
        let m1 = Address::from_label("m1");
        let m2 = Address::from_label("m2");
        let m3 = Address::from_label("m3");
        state.link_node(NodeId::new([1; 20]), m1);
        state.link_node(NodeId::new([2; 20]), m2);
        state.link_node(NodeId::new([3; 20]), m3);
        // Node 4 has no member.
        state.set_address_state(m3, AddressState::EMPTY.with(AddressStateBit::NodeDeferred));

        let plan = plan_reward_distribution(&state, 100).unwrap();
        let mut expected = vec![m1, m2];
        expected.sort();
        assert_eq!(plan.recipients, expected);
        assert_eq!(plan.per_recipient, 52);
        assert_eq!(plan.remainder, 1);
    }

    #[test]
    fn no_recipients_keeps_everything_pooled() {
        let mut state = MemoryState::new(NOW);
        state.set_not_distributed_validator_reward(7);
        let plan = plan_reward_distribution(&state, 3).unwrap();
        assert!(plan.recipients.is_empty());
        assert_eq!(plan.remainder, 10);
    }

    #[test]
    fn import_checks_source_and_finality() {
        let config = ExecutorConfig::default();
        let state = MemoryState::new(NOW);
        let source = Id::from_label("x-chain");
        let fresh = record("fresh", 10, Some(NOW), &config);
        let untimed = record("untimed", 10, None, &config);
        let mut memory = MemorySharedMemory::new();
        memory.insert_inbound(source, fresh.clone());
        memory.insert_inbound(source, untimed.clone());

        let tx = |source_chain, recs: &[&AtomicUtxo]| ImportTx {
            base: Default::default(),
            source_chain,
            imported_ins: inputs(recs),
        };
        assert_eq!(
            verify_import(&config, &state, &memory, &tx(config.chain_id, &[&untimed])),
            Err(ExecError::InvalidDestinationChain)
        );
        assert_eq!(
            verify_import(&config, &state, &memory, &tx(source, &[&fresh])),
            Err(ExecError::AtomicUtxoNotFinal)
        );
        let consumed = verify_import(&config, &state, &memory, &tx(source, &[&untimed])).unwrap();
        assert_eq!(consumed, vec![untimed.utxo.clone()]);

        let missing = record("missing", 1, None, &config);
        assert_eq!(
            verify_import(&config, &state, &memory, &tx(source, &[&missing])),
            Err(ExecError::ImportedInputsMismatch)
        );
    }

    #[test]
    fn queued_removals_are_not_importable_again() {
        let config = ExecutorConfig::default();
        let state = MemoryState::new(NOW);
        let source = Id::from_label("x-chain");
        let reward = record("reward", 10, Some(0), &config);
        let untimed = record("untimed", 10, None, &config);
        let mut memory = MemorySharedMemory::new();
        memory.insert_inbound(config.reward_import_chain_id, reward.clone());
        memory.insert_inbound(source, untimed.clone());

        let import = ImportTx {
            base: Default::default(),
            source_chain: source,
            imported_ins: inputs(&[&untimed]),
        };
        assert!(verify_import(&config, &state, &memory, &import).is_ok());

        // An earlier transaction of the same block consumed both records.
        let mut block = Diff::new(&state);
        block.add_atomic_requests(
            config.reward_import_chain_id,
            AtomicOps {
                remove: vec![reward.utxo.id],
                put: Vec::new(),
            },
        );
        block.add_atomic_requests(
            source,
            AtomicOps {
                remove: vec![untimed.utxo.id],
                put: Vec::new(),
            },
        );
        let nested = Diff::new(&block);

        assert_eq!(
            verify_rewards_import(
                &config,
                &nested,
                &memory,
                &RewardsImportTx {
                    ins: inputs(&[&reward]),
                },
            ),
            Err(ExecError::ImportedInputsMismatch)
        );
        assert_eq!(
            verify_import(&config, &nested, &memory, &import),
            Err(ExecError::ImportedInputsMismatch)
        );
    }
}
