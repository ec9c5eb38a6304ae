//! End-to-end scenarios for the Lumen platform executor.
//!
//! Every test builds its own genesis state and drives a [`Ledger`] through
//! signed transactions and proposals, then inspects the resulting state.
//! No shared state, no test ordering dependencies.

use lumen_protocol::clock::FixedClock;
use lumen_protocol::config::{ExecutorConfig, PRIMARY_NETWORK_ID};
use lumen_protocol::crypto::Keypair;
use lumen_protocol::deposit::DepositOffer;
use lumen_protocol::executor::staking::expected_bond_release;
use lumen_protocol::executor::{ErrorCategory, ExecError};
use lumen_protocol::ids::{Address, Id, UtxoId};
use lumen_protocol::ledger::{Ledger, Vote};
use lumen_protocol::locked::{LockIds, LockState, THIS_TX_ID};
use lumen_protocol::logging::try_init_test_logging;
use lumen_protocol::shared_memory::AtomicUtxo;
use lumen_protocol::state::{
    AddressState, AddressStateBit, Chain, ChainMut, MemoryState, Staker, StakerSet,
};
use lumen_protocol::transaction::*;
use lumen_protocol::utxo::{
    Output, OutputOwners, TransferOutput, TransferableInput, TransferableOutput, Utxo,
};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const NOW: u64 = 1_000_000;
const FUNDS: u64 = 10_000;
const FEE: u64 = 10;

fn config() -> ExecutorConfig {
    ExecutorConfig {
        tx_fee: FEE,
        create_subnet_fee: 50,
        create_chain_fee: 50,
        min_validator_stake: 100,
        max_validator_stake: 10_000,
        min_stake_duration: 100,
        max_stake_duration: 100_000,
        max_future_start_time: 1_000,
        ..ExecutorConfig::default()
    }
}

fn lum() -> Id {
    config().fee_asset_id
}

struct Keys {
    alice: Keypair,
    bob: Keypair,
    node: Keypair,
    admin: Keypair,
    node2: Keypair,
}

fn keys() -> Keys {
    Keys {
        alice: Keypair::from_seed(&[1; 32]),
        bob: Keypair::from_seed(&[2; 32]),
        node: Keypair::from_seed(&[3; 32]),
        admin: Keypair::from_seed(&[4; 32]),
        node2: Keypair::from_seed(&[5; 32]),
    }
}

fn genesis_utxo() -> UtxoId {
    UtxoId::new(Id::from_label("genesis"), 0)
}

fn unlocked(amount: u64, owner: Address) -> TransferableOutput {
    locked(LockIds::UNLOCKED, amount, owner)
}

fn locked(ids: LockIds, amount: u64, owner: Address) -> TransferableOutput {
    TransferableOutput::new(
        lum(),
        Output::with_locks(ids, TransferOutput::new(amount, OutputOwners::single(owner))),
    )
}

fn fund(state: &mut MemoryState, label: &str, asset: Id, amount: u64, owner: Address) -> UtxoId {
    let id = UtxoId::new(Id::from_label(label), 0);
    state.add_utxo(Utxo::new(
        id,
        asset,
        Output::Transfer(TransferOutput::new(amount, OutputOwners::single(owner))),
    ));
    id
}

fn deposit_offer() -> DepositOffer {
    DepositOffer {
        id: Id::from_label("offer/10pct"),
        interest_rate_nominator: 100_000,
        start: 0,
        end: NOW * 2,
        min_amount: 100,
        min_duration: 1_000,
        max_duration: 100_000,
        unlock_period_duration: 1_000,
        no_rewards_period_duration: 0,
        memo: Vec::new(),
        flags: 0,
    }
}

/// Alice holds `FUNDS` of the fee asset, is a consortium member and has
/// `node` registered. `admin` is an admin. `extra` customizes further.
fn ledger_with(
    config: ExecutorConfig,
    clock: u64,
    extra: impl FnOnce(&mut MemoryState),
) -> Ledger {
    try_init_test_logging();
    let k = keys();
    let mut state = MemoryState::new(NOW);
    fund(&mut state, "genesis", lum(), FUNDS, k.alice.address());
    state.set_address_state(
        k.alice.address(),
        AddressState::EMPTY.with(AddressStateBit::Consortium),
    );
    state.link_node(k.node.node_id(), k.alice.address());
    state.set_address_state(
        k.admin.address(),
        AddressState::EMPTY.with(AddressStateBit::Admin),
    );
    state.add_deposit_offer(deposit_offer()).unwrap();
    extra(&mut state);
    Ledger::new(config, Box::new(FixedClock(clock)), state).unwrap()
}

fn ledger() -> Ledger {
    ledger_with(config(), NOW, |_| {})
}

fn spend(ledger: &Ledger, id: UtxoId) -> TransferableInput {
    let utxo = ledger
        .read(|s| s.utxo(&id))
        .unwrap_or_else(|| panic!("utxo {id} missing"));
    TransferableInput::spending(&utxo).unwrap()
}

fn base(ins: Vec<TransferableInput>, outs: Vec<TransferableOutput>) -> BaseTx {
    BaseTx {
        ins,
        outs,
        memo: Vec::new(),
    }
}

fn advance_time(ledger: &Ledger, time: u64) {
    let tx = Tx::unsigned(UnsignedTx::AdvanceTime(AdvanceTimeTx { time })).unwrap();
    ledger.apply_proposal(&tx, Vote::Commit).unwrap();
}

fn add_validator_tx(ledger: &Ledger, start: u64) -> Tx {
    let k = keys();
    let body = UnsignedTx::AddValidator(AddValidatorTx {
        base: base(
            vec![spend(ledger, genesis_utxo())],
            vec![
                locked(LockIds::bonded(THIS_TX_ID), 1_000, k.alice.address()),
                unlocked(FUNDS - 1_000 - FEE, k.alice.address()),
            ],
        ),
        validator: Validator {
            node_id: k.node.node_id(),
            start,
            end: start + 10_000,
            weight: 1_000,
        },
    });
    Tx::sign(body, &[vec![&k.alice], vec![&k.node]]).unwrap()
}

fn deposit_tx(ledger: &Ledger, amount: u64) -> Tx {
    let k = keys();
    let body = UnsignedTx::Deposit(DepositTx {
        base: base(
            vec![spend(ledger, genesis_utxo())],
            vec![
                locked(LockIds::deposited(THIS_TX_ID), amount, k.alice.address()),
                unlocked(FUNDS - amount - FEE, k.alice.address()),
            ],
        ),
        deposit_offer_id: deposit_offer().id,
        deposit_duration: 2_000,
        rewards_owner: OutputOwners::single(k.alice.address()),
    });
    Tx::sign(body, &[vec![&k.alice]]).unwrap()
}

/// Deposit 1000 for 2000s at NOW, then advance to NOW + 1500: halfway
/// through the 1000s unlock tail.
fn ledger_mid_unlock() -> (Ledger, Id) {
    let ledger = ledger_with(config(), NOW + 10_000, |_| {});
    let deposit = deposit_tx(&ledger, 1_000);
    ledger.apply_standard(&deposit).unwrap();
    advance_time(&ledger, NOW + 1_500);
    (ledger, deposit.id())
}

// ---------------------------------------------------------------------------
// Staking
// ---------------------------------------------------------------------------

#[test]
fn add_validator_bonds_and_schedules() {
    let ledger = ledger();
    let tx = add_validator_tx(&ledger, NOW + 1);
    ledger.apply_standard(&tx).unwrap();

    let k = keys();
    ledger.read(|s| {
        let staker = s
            .staker(StakerSet::Pending, &PRIMARY_NETWORK_ID, &k.node.node_id())
            .expect("pending staker");
        assert_eq!(staker.tx_id, tx.id());
        assert_eq!(staker.weight, 1_000);

        let bonded = s.locked_utxos(&tx.id(), LockState::BONDED);
        assert_eq!(bonded.len(), 1);
        assert_eq!(bonded[0].out.amount(), 1_000);
        assert!(s.utxo(&genesis_utxo()).is_none());
        assert_eq!(s.total_value(&lum()), u128::from(FUNDS - FEE));
    });
}

#[test]
fn validator_start_must_follow_chain_time() {
    let ledger = ledger();
    // One second before the earliest allowed start.
    let tx = add_validator_tx(&ledger, NOW);
    match ledger.apply_standard(&tx) {
        Err(ExecError::ChainTimeNotBeforeStart { start, chain_time }) => {
            assert_eq!(start, NOW);
            assert_eq!(chain_time, NOW);
        }
        other => panic!("expected ChainTimeNotBeforeStart, got {:?}", other),
    }
    assert!(ledger.read(|s| s.utxo(&genesis_utxo()).is_some()));
}

#[test]
fn validator_needs_node_signature() {
    let ledger = ledger();
    let k = keys();
    let body = add_validator_tx(&ledger, NOW + 1).body().clone();
    let tx = Tx::sign(body, &[vec![&k.alice], vec![&k.alice]]).unwrap();
    match ledger.apply_standard(&tx) {
        Err(ExecError::NodeSignatureMissing) => {}
        other => panic!("expected NodeSignatureMissing, got {:?}", other),
    }
}

#[test]
fn subnet_validator_must_fit_primary_window() {
    let k = keys();
    let subnet = Id::from_label("subnet");
    let ledger = ledger_with(config(), NOW, |state| {
        state.put_subnet(subnet, OutputOwners::single(k.bob.address()));
        state.put_staker(
            StakerSet::Current,
            Staker {
                tx_id: Id::from_label("primary"),
                node_id: k.node.node_id(),
                subnet_id: PRIMARY_NETWORK_ID,
                start: NOW - 10,
                end: NOW + 5_000,
                weight: 1_000,
            },
        );
    });

    let tx_for = |end: u64| {
        let body = UnsignedTx::AddSubnetValidator(AddSubnetValidatorTx {
            base: base(
                vec![spend(&ledger, genesis_utxo())],
                vec![unlocked(FUNDS - FEE, k.alice.address())],
            ),
            validator: Validator {
                node_id: k.node.node_id(),
                start: NOW + 1,
                end,
                weight: 1,
            },
            subnet_id: subnet,
        });
        Tx::sign(body, &[vec![&k.alice], vec![&k.bob]]).unwrap()
    };

    let overhanging = tx_for(NOW + 5_001);
    match ledger.apply_standard(&overhanging) {
        Err(err @ ExecError::ValidatorWindowNotSubset) => {
            assert_eq!(err.category(), ErrorCategory::Temporal);
        }
        other => panic!("expected ValidatorWindowNotSubset, got {:?}", other),
    }

    ledger.apply_standard(&tx_for(NOW + 5_000)).unwrap();
    assert!(ledger.read(|s| s
        .staker(StakerSet::Pending, &subnet, &k.node.node_id())
        .is_some()));
}

// ---------------------------------------------------------------------------
// Deposits
// ---------------------------------------------------------------------------

#[test]
fn deposit_below_offer_minimum_is_rejected() {
    let ledger = ledger();
    match ledger.apply_standard(&deposit_tx(&ledger, 99)) {
        Err(ExecError::DepositTooSmall) => {}
        other => panic!("expected DepositTooSmall, got {:?}", other),
    }
}

#[test]
fn deposit_reserves_reward_in_supply() {
    let ledger = ledger();
    let tx = deposit_tx(&ledger, 1_000);
    let before = ledger.read(|s| s.current_supply());
    ledger.apply_standard(&tx).unwrap();

    ledger.read(|s| {
        let deposit = s.deposit(&tx.id()).expect("deposit recorded");
        assert_eq!(deposit.amount, 1_000);
        assert_eq!(deposit.start, NOW);
        // 10% of 1000 over the whole duration.
        assert_eq!(s.current_supply(), before + 100);
        assert_eq!(s.locked_utxos(&tx.id(), LockState::DEPOSITED).len(), 1);
    });
}

#[test]
fn deposit_reward_cannot_exceed_supply_cap() {
    let config = config();
    let cap = config.max_supply;
    // The 1000 deposit reserves a reward of 100.
    let ledger = ledger_with(config.clone(), NOW, |state| state.set_current_supply(cap - 99));
    let tx = deposit_tx(&ledger, 1_000);

    match ledger.apply_standard(&tx) {
        Err(ExecError::SupplyOverflow) => {}
        other => panic!("expected SupplyOverflow, got {:?}", other),
    }
    ledger.read(|s| {
        assert_eq!(s.current_supply(), cap - 99);
        assert!(s.deposit(&tx.id()).is_none());
        assert!(s.utxo(&genesis_utxo()).is_some());
        assert!(s.locked_utxos(&tx.id(), LockState::DEPOSITED).is_empty());
    });

    // Exactly reaching the cap is allowed.
    let ledger = ledger_with(config, NOW, |state| state.set_current_supply(cap - 100));
    ledger.apply_standard(&deposit_tx(&ledger, 1_000)).unwrap();
    assert_eq!(ledger.read(|s| s.current_supply()), cap);
}

#[test]
fn lock_mode_off_rejects_deposits() {
    let config = ExecutorConfig {
        lock_mode_bond_deposit: false,
        ..config()
    };
    let ledger = ledger_with(config, NOW, |_| {});
    match ledger.apply_standard(&deposit_tx(&ledger, 1_000)) {
        Err(ExecError::WrongLockMode) => {}
        other => panic!("expected WrongLockMode, got {:?}", other),
    }
}

#[test]
fn unlock_at_half_tail_requires_exact_split() {
    let (ledger, deposit_id) = ledger_mid_unlock();
    let k = keys();
    let alice = k.alice.address();

    let unlock_tx = |released: u64| {
        let body = UnsignedTx::UnlockDeposit(UnlockDepositTx {
            base: base(
                vec![
                    spend(&ledger, UtxoId::new(deposit_id, 0)),
                    spend(&ledger, UtxoId::new(deposit_id, 1)),
                ],
                vec![
                    unlocked(released, alice),
                    locked(LockIds::deposited(deposit_id), 1_000 - released, alice),
                    unlocked(FUNDS - 1_000 - 2 * FEE, alice),
                ],
            ),
        });
        Tx::sign(body, &[vec![&k.alice], vec![&k.alice]]).unwrap()
    };

    match ledger.apply_standard(&unlock_tx(501)) {
        Err(ExecError::UnlockAmountMismatch {
            released,
            unlockable,
        }) => {
            assert_eq!(released, 501);
            assert_eq!(unlockable, 500);
        }
        other => panic!("expected UnlockAmountMismatch, got {:?}", other),
    }
    match ledger.apply_standard(&unlock_tx(499)) {
        Err(ExecError::UnlockAmountMismatch { .. }) => {}
        other => panic!("expected UnlockAmountMismatch, got {:?}", other),
    }

    let good = unlock_tx(500);
    ledger.apply_standard(&good).unwrap();
    ledger.read(|s| {
        assert_eq!(s.deposit(&deposit_id).unwrap().unlocked_amount, 500);
        let still_locked = s.locked_utxos(&deposit_id, LockState::DEPOSITED);
        assert_eq!(still_locked.len(), 1);
        assert_eq!(still_locked[0].out.amount(), 500);
        assert_eq!(s.utxo(&UtxoId::new(good.id(), 0)).unwrap().out.amount(), 500);
    });
}

#[test]
fn claim_requires_rewards_owner_credential() {
    let (ledger, deposit_id) = ledger_mid_unlock();
    let k = keys();

    let claim_tx = |amount: u64, claimer: &Keypair| {
        let body = UnsignedTx::Claim(ClaimTx {
            base: base(
                vec![spend(&ledger, UtxoId::new(deposit_id, 1))],
                vec![unlocked(FUNDS - 1_000 - 2 * FEE, k.alice.address())],
            ),
            claimables: vec![ClaimAmount {
                kind: ClaimKind::ActiveDepositReward(deposit_id),
                amount,
            }],
            claim_to: OutputOwners::single(k.bob.address()),
        });
        Tx::sign(body, &[vec![&k.alice], vec![claimer]]).unwrap()
    };

    match ledger.apply_standard(&claim_tx(50, &k.bob)) {
        Err(err @ ExecError::DepositCredentialMismatch) => {
            assert_eq!(err.category(), ErrorCategory::Authorization);
        }
        other => panic!("expected DepositCredentialMismatch, got {:?}", other),
    }
    // 75 accrued over the first 1500 of 2000 seconds.
    match ledger.apply_standard(&claim_tx(76, &k.alice)) {
        Err(ExecError::ClaimAmountExceeded {
            requested,
            available,
        }) => {
            assert_eq!(requested, 76);
            assert_eq!(available, 75);
        }
        other => panic!("expected ClaimAmountExceeded, got {:?}", other),
    }

    let good = claim_tx(50, &k.alice);
    ledger.apply_standard(&good).unwrap();
    ledger.read(|s| {
        assert_eq!(s.deposit(&deposit_id).unwrap().claimed_reward, 50);
        let payout = s.utxo(&UtxoId::new(good.id(), 1)).expect("payout utxo");
        assert_eq!(payout.out.amount(), 50);
        assert!(payout.out.owners().contains(&k.bob.address()));
    });
}

// ---------------------------------------------------------------------------
// Idempotence and conservation
// ---------------------------------------------------------------------------

#[test]
fn validation_is_repeatable_and_spends_once() {
    let ledger = ledger();
    let k = keys();
    let body = UnsignedTx::Base(base(
        vec![spend(&ledger, genesis_utxo())],
        vec![unlocked(FUNDS - FEE, k.bob.address())],
    ));
    let tx = Tx::sign(body, &[vec![&k.alice]]).unwrap();

    let first = ledger.validate_standard(&tx).unwrap();
    let second = ledger.validate_standard(&tx).unwrap();
    assert_eq!(first, second);

    ledger.apply_standard(&tx).unwrap();
    match ledger.apply_standard(&tx) {
        Err(ExecError::FlowCheckFailed) => {}
        other => panic!("expected FlowCheckFailed, got {:?}", other),
    }
}

#[test]
fn value_is_conserved_per_asset() {
    let k = keys();
    let gold = Id::from_label("asset/GOLD");
    let mut gold_utxo = UtxoId::new(Id::EMPTY, 0);
    let ledger = ledger_with(config(), NOW, |state| {
        gold_utxo = fund(state, "gold", gold, 100, k.alice.address());
    });

    let transfer = |gold_out: u64| {
        let mut ins = vec![spend(&ledger, genesis_utxo()), spend(&ledger, gold_utxo)];
        ins.sort_by_key(|i| i.utxo_id);
        let body = UnsignedTx::Base(base(
            ins,
            vec![
                TransferableOutput::new(
                    gold,
                    Output::Transfer(TransferOutput::new(
                        gold_out,
                        OutputOwners::single(k.bob.address()),
                    )),
                ),
                unlocked(FUNDS - FEE, k.alice.address()),
            ],
        ));
        Tx::sign(body, &[vec![&k.alice], vec![&k.alice]]).unwrap()
    };

    match ledger.apply_standard(&transfer(101)) {
        Err(ExecError::FlowCheckFailed) => {}
        other => panic!("expected FlowCheckFailed, got {:?}", other),
    }
    ledger.apply_standard(&transfer(100)).unwrap();
    ledger.read(|s| {
        assert_eq!(s.total_value(&gold), 100);
        assert_eq!(s.total_value(&lum()), u128::from(FUNDS - FEE));
    });
}

#[test]
fn failing_block_applies_nothing() {
    let ledger = ledger();
    let k = keys();
    let pay_bob = Tx::sign(
        UnsignedTx::Base(base(
            vec![spend(&ledger, genesis_utxo())],
            vec![unlocked(FUNDS - FEE, k.bob.address())],
        )),
        &[vec![&k.alice]],
    )
    .unwrap();
    // Spends the same genesis output again.
    let double_spend = Tx::sign(
        UnsignedTx::Base(base(
            vec![spend(&ledger, genesis_utxo())],
            vec![unlocked(FUNDS - FEE, k.alice.address())],
        )),
        &[vec![&k.alice]],
    )
    .unwrap();

    match ledger.apply_block(&[pay_bob.clone(), double_spend]) {
        Err(ExecError::FlowCheckFailed) => {}
        other => panic!("expected FlowCheckFailed, got {:?}", other),
    }
    assert!(ledger.read(|s| s.utxo(&genesis_utxo()).is_some()));

    ledger.apply_block(&[pay_bob]).unwrap();
    assert!(ledger.read(|s| s.utxo(&genesis_utxo()).is_none()));
}

fn x_chain_record(label: &str, owner: Address) -> AtomicUtxo {
    AtomicUtxo {
        utxo: Utxo::new(
            UtxoId::new(Id::from_label(label), 0),
            lum(),
            Output::Transfer(TransferOutput::new(1_000, OutputOwners::single(owner))),
        ),
        timestamp: None,
        traits: vec![owner],
    }
}

fn import_tx(record: &AtomicUtxo, imported: usize, to: Address) -> Tx {
    let k = keys();
    let imported_ins = vec![TransferableInput::spending(&record.utxo).unwrap(); imported];
    let total = 1_000 * imported as u64;
    let body = UnsignedTx::Import(ImportTx {
        base: base(Vec::new(), vec![unlocked(total - FEE, to)]),
        source_chain: Id::from_label("x-chain"),
        imported_ins,
    });
    Tx::sign(body, &vec![vec![&k.alice]; imported]).unwrap()
}

#[test]
fn block_cannot_import_one_record_twice() {
    let k = keys();
    let x_chain = Id::from_label("x-chain");
    let record = x_chain_record("inbound-1", k.alice.address());
    let ledger = ledger();
    ledger.with_shared_memory_mut(|m| m.insert_inbound(x_chain, record.clone()));

    let to_alice = import_tx(&record, 1, k.alice.address());
    let to_bob = import_tx(&record, 1, k.bob.address());
    match ledger.apply_block(&[to_alice.clone(), to_bob]) {
        Err(ExecError::ImportedInputsMismatch) => {}
        other => panic!("expected ImportedInputsMismatch, got {:?}", other),
    }
    assert_eq!(ledger.read(|s| s.total_value(&lum())), u128::from(FUNDS));
    assert_eq!(ledger.read_shared_memory(|m| m.inbound_len(&x_chain)), 1);

    ledger.apply_block(&[to_alice.clone()]).unwrap();
    assert_eq!(
        ledger.read(|s| s.utxo(&UtxoId::new(to_alice.id(), 0)).map(|u| u.out.amount())),
        Some(1_000 - FEE)
    );
    assert_eq!(ledger.read_shared_memory(|m| m.inbound_len(&x_chain)), 0);
}

#[test]
fn import_listing_a_record_twice_is_malformed() {
    let k = keys();
    let x_chain = Id::from_label("x-chain");
    let record = x_chain_record("inbound-1", k.alice.address());
    let ledger = ledger();
    ledger.with_shared_memory_mut(|m| m.insert_inbound(x_chain, record.clone()));

    match ledger.apply_standard(&import_tx(&record, 2, k.alice.address())) {
        Err(ExecError::Malformed(TxError::InputsNotSortedUnique)) => {}
        other => panic!("expected InputsNotSortedUnique, got {:?}", other),
    }
    assert_eq!(ledger.read_shared_memory(|m| m.inbound_len(&x_chain)), 1);
}

// ---------------------------------------------------------------------------
// Proposals
// ---------------------------------------------------------------------------

fn ledger_with_finished_staker(end: u64) -> (Ledger, Staker) {
    let k = keys();
    let stake_tx = Id::from_label("stake");
    let staker = Staker {
        tx_id: stake_tx,
        node_id: k.node.node_id(),
        subnet_id: PRIMARY_NETWORK_ID,
        start: NOW - 2_000,
        end,
        weight: 1_000,
    };
    let genesis_staker = staker.clone();
    let ledger = ledger_with(config(), NOW, move |state| {
        state.add_utxo(Utxo::new(
            UtxoId::new(stake_tx, 0),
            lum(),
            Output::with_locks(
                LockIds::bonded(stake_tx),
                TransferOutput::new(1_000, OutputOwners::single(k.alice.address())),
            ),
        ));
        state.put_staker(StakerSet::Current, genesis_staker);
    });
    (ledger, staker)
}

fn reward_tx(ledger: &Ledger, staker: &Staker) -> Tx {
    let (ins, outs) = ledger.read(|s| expected_bond_release(s, staker)).unwrap();
    Tx::unsigned(UnsignedTx::RewardValidator(RewardValidatorTx {
        staker_tx_id: staker.tx_id,
        ins,
        outs,
    }))
    .unwrap()
}

#[test]
fn reward_validator_commit_and_abort() {
    let k = keys();
    for vote in [Vote::Commit, Vote::Abort] {
        let (ledger, staker) = ledger_with_finished_staker(NOW);
        let tx = reward_tx(&ledger, &staker);
        ledger.apply_proposal(&tx, vote).unwrap();

        ledger.read(|s| {
            assert!(s
                .staker(StakerSet::Current, &PRIMARY_NETWORK_ID, &staker.node_id)
                .is_none());
            let released = s.utxo(&UtxoId::new(tx.id(), 0)).expect("released bond");
            assert_eq!(released.out.amount(), 1_000);
            assert!(!released.out.lock_ids().unwrap().is_locked());
            assert!(s.locked_utxos(&staker.tx_id, LockState::BONDED).is_empty());

            let deferred = s
                .address_state(&k.alice.address())
                .has(AddressStateBit::NodeDeferred);
            assert_eq!(deferred, vote == Vote::Abort);
        });
    }
}

#[test]
fn reward_validator_rejects_tampered_body() {
    let (ledger, staker) = ledger_with_finished_staker(NOW);
    let honest = reward_tx(&ledger, &staker);
    let UnsignedTx::RewardValidator(mut body) = honest.body().clone() else {
        panic!("expected a reward body");
    };
    body.outs[0] = unlocked(1_000, keys().bob.address());
    let tampered = Tx::unsigned(UnsignedTx::RewardValidator(body)).unwrap();
    match ledger.apply_proposal(&tampered, Vote::Commit) {
        Err(ExecError::InvalidSystemTxBody) => {}
        other => panic!("expected InvalidSystemTxBody, got {:?}", other),
    }
}

#[test]
fn reward_validator_waits_for_end_time() {
    let (ledger, staker) = ledger_with_finished_staker(NOW + 1);
    let tx = Tx::unsigned(UnsignedTx::RewardValidator(RewardValidatorTx {
        staker_tx_id: staker.tx_id,
        ins: Vec::new(),
        outs: Vec::new(),
    }))
    .unwrap();
    match ledger.apply_proposal(&tx, Vote::Commit) {
        Err(ExecError::RemoveStakerTooEarly { end, chain_time }) => {
            assert_eq!(end, NOW + 1);
            assert_eq!(chain_time, NOW);
        }
        other => panic!("expected RemoveStakerTooEarly, got {:?}", other),
    }

    // Time cannot skip past the staker's end either.
    let skip = Tx::unsigned(UnsignedTx::AdvanceTime(AdvanceTimeTx { time: NOW + 2 })).unwrap();
    match ledger.apply_proposal(&skip, Vote::Commit) {
        Err(ExecError::TimestampBeyondStakerChange { next_change, .. }) => {
            assert_eq!(next_change, NOW + 1);
        }
        other => panic!("expected TimestampBeyondStakerChange, got {:?}", other),
    }
}

#[test]
fn advance_time_promotes_pending_stakers() {
    let ledger = ledger_with(config(), NOW + 10_000, |_| {});
    let tx = add_validator_tx(&ledger, NOW + 100);
    ledger.apply_standard(&tx).unwrap();

    let early = Tx::unsigned(UnsignedTx::AdvanceTime(AdvanceTimeTx { time: NOW })).unwrap();
    match ledger.apply_proposal(&early, Vote::Commit) {
        Err(ExecError::TimestampNotAfterCurrent { .. }) => {}
        other => panic!("expected TimestampNotAfterCurrent, got {:?}", other),
    }

    let abort = Tx::unsigned(UnsignedTx::AdvanceTime(AdvanceTimeTx { time: NOW + 100 })).unwrap();
    ledger.apply_proposal(&abort, Vote::Abort).unwrap();
    assert_eq!(ledger.read(|s| s.timestamp()), NOW);

    advance_time(&ledger, NOW + 100);
    let node = keys().node.node_id();
    ledger.read(|s| {
        assert_eq!(s.timestamp(), NOW + 100);
        assert!(s.staker(StakerSet::Pending, &PRIMARY_NETWORK_ID, &node).is_none());
        assert!(s.staker(StakerSet::Current, &PRIMARY_NETWORK_ID, &node).is_some());
    });
}

#[test]
fn advance_time_respects_wall_clock() {
    let ledger = ledger();
    let tx = Tx::unsigned(UnsignedTx::AdvanceTime(AdvanceTimeTx {
        time: NOW + config().max_future_block_time + 1,
    }))
    .unwrap();
    match ledger.apply_proposal(&tx, Vote::Commit) {
        Err(ExecError::TimestampTooFarInFuture { .. }) => {}
        other => panic!("expected TimestampTooFarInFuture, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Cross-chain
// ---------------------------------------------------------------------------

#[test]
fn rewards_import_splits_across_eligible_members() {
    let config = config();
    let m1 = Address::from_label("member-1");
    let m2 = Address::from_label("member-2");
    let ledger = ledger_with(config.clone(), NOW, |state| {
        for (n, member) in [(1u8, m1), (2u8, m2)] {
            let node = lumen_protocol::ids::NodeId::new([n; 20]);
            state.link_node(node, member);
            state.put_staker(
                StakerSet::Current,
                Staker {
                    tx_id: Id::from_label(&format!("validator-{n}")),
                    node_id: node,
                    subnet_id: PRIMARY_NETWORK_ID,
                    start: NOW - 100,
                    end: NOW + 100,
                    weight: 1_000,
                },
            );
        }
    });

    let record = AtomicUtxo {
        utxo: Utxo::new(
            UtxoId::new(Id::from_label("reward-1"), 0),
            lum(),
            Output::Transfer(TransferOutput::new(
                101,
                OutputOwners::single(config.treasury_address),
            )),
        ),
        timestamp: Some(NOW - config.cross_chain_sync_bound),
        traits: vec![config.treasury_address],
    };
    ledger.with_shared_memory_mut(|m| m.insert_inbound(config.reward_import_chain_id, record.clone()));

    let tx = Tx::unsigned(UnsignedTx::RewardsImport(RewardsImportTx {
        ins: vec![TransferableInput::spending(&record.utxo).unwrap()],
    }))
    .unwrap();
    ledger.apply_standard(&tx).unwrap();

    ledger.read(|s| {
        for member in [m1, m2] {
            let claimable = s
                .claimable(&OutputOwners::single(member).owner_id())
                .expect("claimable credited");
            assert_eq!(claimable.validator_reward, 50);
        }
        assert_eq!(s.not_distributed_validator_reward(), 1);
    });
    assert_eq!(
        ledger.read_shared_memory(|m| m.inbound_len(&config.reward_import_chain_id)),
        0
    );

    // The record is gone; importing it again cannot match.
    match ledger.apply_standard(&tx) {
        Err(ExecError::ImportedInputsMismatch) => {}
        other => panic!("expected ImportedInputsMismatch, got {:?}", other),
    }
}

#[test]
fn block_cannot_import_one_reward_twice() {
    let config = config();
    let member = Address::from_label("member-1");
    let ledger = ledger_with(config.clone(), NOW, |state| {
        let node = lumen_protocol::ids::NodeId::new([1; 20]);
        state.link_node(node, member);
        state.put_staker(
            StakerSet::Current,
            Staker {
                tx_id: Id::from_label("validator-1"),
                node_id: node,
                subnet_id: PRIMARY_NETWORK_ID,
                start: NOW - 100,
                end: NOW + 100,
                weight: 1_000,
            },
        );
    });
    let record = AtomicUtxo {
        utxo: Utxo::new(
            UtxoId::new(Id::from_label("reward-1"), 0),
            lum(),
            Output::Transfer(TransferOutput::new(
                100,
                OutputOwners::single(config.treasury_address),
            )),
        ),
        timestamp: Some(NOW - config.cross_chain_sync_bound),
        traits: vec![config.treasury_address],
    };
    let source = config.reward_import_chain_id;
    ledger.with_shared_memory_mut(|m| m.insert_inbound(source, record.clone()));

    let tx = Tx::unsigned(UnsignedTx::RewardsImport(RewardsImportTx {
        ins: vec![TransferableInput::spending(&record.utxo).unwrap()],
    }))
    .unwrap();
    match ledger.apply_block(&[tx.clone(), tx.clone()]) {
        Err(ExecError::ImportedInputsMismatch) => {}
        other => panic!("expected ImportedInputsMismatch, got {:?}", other),
    }
    let owner = OutputOwners::single(member).owner_id();
    assert!(ledger.read(|s| s.claimable(&owner)).is_none());
    assert_eq!(ledger.read_shared_memory(|m| m.inbound_len(&source)), 1);

    ledger.apply_block(&[tx]).unwrap();
    let claimable = ledger.read(|s| s.claimable(&owner)).expect("claimable credited");
    assert_eq!(claimable.validator_reward, 100);
}

#[test]
fn export_publishes_to_destination() {
    let ledger = ledger();
    let k = keys();
    let x_chain = Id::from_label("x-chain");
    let export_to = |destination_chain: Id| {
        let body = UnsignedTx::Export(ExportTx {
            base: base(
                vec![spend(&ledger, genesis_utxo())],
                vec![unlocked(FUNDS - 100 - FEE, k.alice.address())],
            ),
            destination_chain,
            exported_outs: vec![unlocked(100, k.bob.address())],
        });
        Tx::sign(body, &[vec![&k.alice]]).unwrap()
    };

    match ledger.apply_standard(&export_to(config().chain_id)) {
        Err(ExecError::InvalidDestinationChain) => {}
        other => panic!("expected InvalidDestinationChain, got {:?}", other),
    }

    let tx = export_to(x_chain);
    ledger.apply_standard(&tx).unwrap();
    let outbound = ledger.read_shared_memory(|m| m.outbound(&x_chain));
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].utxo.id, UtxoId::new(tx.id(), 1));
    assert_eq!(outbound[0].timestamp, Some(NOW));
    assert_eq!(outbound[0].traits, vec![k.bob.address()]);
    assert_eq!(ledger.read(|s| s.total_value(&lum())), u128::from(FUNDS - 100 - FEE));
}

// ---------------------------------------------------------------------------
// Consortium
// ---------------------------------------------------------------------------

#[test]
fn consortium_membership_and_node_registration() {
    let k = keys();
    let mut admin_funds = UtxoId::new(Id::EMPTY, 0);
    let mut bob_funds = UtxoId::new(Id::EMPTY, 0);
    let ledger = ledger_with(config(), NOW, |state| {
        admin_funds = fund(state, "admin-funds", lum(), 1_000, k.admin.address());
        bob_funds = fund(state, "bob-funds", lum(), 1_000, k.bob.address());
    });

    let set_consortium = |funds: UtxoId, remove: bool| {
        let body = UnsignedTx::AddressState(AddressStateTx {
            base: base(
                vec![spend(&ledger, funds)],
                vec![unlocked(
                    ledger.read(|s| s.utxo(&funds)).unwrap().out.amount() - FEE,
                    k.admin.address(),
                )],
            ),
            address: k.bob.address(),
            bit: AddressStateBit::Consortium,
            remove,
            executor: k.admin.address(),
        });
        Tx::sign(body, &[vec![&k.admin], vec![&k.admin]]).unwrap()
    };

    // Bob is not an admin and holds no KYC role.
    let kyc = UnsignedTx::AddressState(AddressStateTx {
        base: base(
            vec![spend(&ledger, bob_funds)],
            vec![unlocked(1_000 - FEE, k.bob.address())],
        ),
        address: k.alice.address(),
        bit: AddressStateBit::KycVerified,
        remove: false,
        executor: k.bob.address(),
    });
    match ledger.apply_standard(&Tx::sign(kyc, &[vec![&k.bob], vec![&k.bob]]).unwrap()) {
        Err(ExecError::AddressStateNotPermitted) => {}
        other => panic!("expected AddressStateNotPermitted, got {:?}", other),
    }

    let grant = set_consortium(admin_funds, false);
    ledger.apply_standard(&grant).unwrap();
    assert!(ledger.read(|s| s
        .address_state(&k.bob.address())
        .has(AddressStateBit::Consortium)));

    let register = |new_node: &Keypair| {
        let body = UnsignedTx::RegisterNode(RegisterNodeTx {
            base: base(
                vec![spend(&ledger, bob_funds)],
                vec![unlocked(1_000 - FEE, k.bob.address())],
            ),
            old_node_id: None,
            new_node_id: Some(new_node.node_id()),
            consortium_member: k.bob.address(),
        });
        Tx::sign(body, &[vec![&k.bob], vec![&k.bob], vec![new_node]]).unwrap()
    };
    // Alice already owns `node`.
    match ledger.apply_standard(&register(&k.node)) {
        Err(ExecError::NodeAlreadyRegistered) => {}
        other => panic!("expected NodeAlreadyRegistered, got {:?}", other),
    }
    ledger.apply_standard(&register(&k.node2)).unwrap();
    ledger.read(|s| {
        assert_eq!(s.node_owner(&k.node2.node_id()), Some(k.bob.address()));
        assert_eq!(s.registered_node(&k.bob.address()), Some(k.node2.node_id()));
    });

    let revoke = set_consortium(UtxoId::new(grant.id(), 0), true);
    match ledger.apply_standard(&revoke) {
        Err(ExecError::MemberHasRegisteredNode) => {}
        other => panic!("expected MemberHasRegisteredNode, got {:?}", other),
    }
}
