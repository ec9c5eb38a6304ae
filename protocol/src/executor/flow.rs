//! # Flow Checker
//!
//! Value conservation across one transaction, per asset and lock class.
//!
//! Every consumed and produced amount is put in a bucket keyed by
//!
//! ```text
//! (asset, normalized lock ids, owner)
//! ```
//!
//! where normalization clears the slots the transaction is allowed to
//! change: kinds in `remove` on both sides, and [`THIS_TX_ID`] slots on
//! outputs (which must be kinds in `apply`). Locked buckets carry the owner
//! id, so locked value never changes hands; the unlocked bucket is
//! owner-free and also absorbs the burn. The transaction balances iff the
//! consumed and produced buckets are identical.
//!
//! Removing a lock kind must not mint locked value: for every lock id of a
//! removed kind, outputs still carrying it may not exceed inputs carrying
//! it. The difference is what the transaction released; see
//! [`FlowSummary::released`].
//!
//! Failures are classified internally ([`FlowViolation`]) for the debug
//! log, but callers only ever see [`ExecError::FlowCheckFailed`], apart from
//! the structural `WrongType` and `WrongLockMode`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use super::auth::owners_satisfied;
use super::ExecError;
use crate::ids::{Address, Id, UtxoId};
use crate::locked::{LockIds, LockState, THIS_TX_ID};
use crate::state::Chain;
use crate::utxo::{TransferableInput, TransferableOutput, Utxo};

/// What a transaction kind is allowed to do to locks, and what it burns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowRules {
    pub burn: BTreeMap<Id, u64>,
    /// Kinds outputs may newly lock with the [`THIS_TX_ID`] placeholder.
    pub apply: LockState,
    /// Kinds whose existing locks may be released.
    pub remove: LockState,
    pub lock_mode_bond_deposit: bool,
}

impl FlowRules {
    /// Burn `fee` of `asset`, no lock changes.
    pub fn fee(asset: Id, fee: u64, lock_mode_bond_deposit: bool) -> Self {
        let mut burn = BTreeMap::new();
        if fee > 0 {
            burn.insert(asset, fee);
        }
        Self {
            burn,
            apply: LockState::UNLOCKED,
            remove: LockState::UNLOCKED,
            lock_mode_bond_deposit,
        }
    }

    pub fn applying(mut self, kinds: LockState) -> Self {
        self.apply = self.apply.union(kinds);
        self
    }

    pub fn removing(mut self, kinds: LockState) -> Self {
        self.remove = self.remove.union(kinds);
        self
    }
}

/// What a balanced transaction did to locks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowSummary {
    /// Value newly locked per (asset, single kind).
    pub newly_locked: BTreeMap<(Id, LockState), u64>,
    /// Value released per (removed kind, lock id), for every lock id of a
    /// removed kind that the inputs carried. Zero entries are kept.
    pub released: BTreeMap<(LockState, Id), u64>,
}

impl FlowSummary {
    pub fn newly_locked(&self, asset: &Id, kind: LockState) -> u64 {
        self.newly_locked.get(&(*asset, kind)).copied().unwrap_or(0)
    }

    /// Total value newly locked with `kind`, any asset.
    pub fn total_newly_locked(&self, kind: LockState) -> u128 {
        self.newly_locked
            .iter()
            .filter(|((_, k), _)| *k == kind)
            .map(|(_, amount)| u128::from(*amount))
            .sum()
    }

    /// Released amounts for one kind, by lock id.
    pub fn released(&self, kind: LockState) -> impl Iterator<Item = (Id, u64)> + '_ {
        self.released
            .iter()
            .filter(move |((k, _), _)| *k == kind)
            .map(|((_, id), amount)| (*id, *amount))
    }
}

/// Why a flow check failed. Logged, never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowViolation {
    ArityMismatch { ins: usize, utxos: usize, creds: usize },
    MissingUtxo(UtxoId),
    InputMismatch { index: usize },
    Unauthorized { index: usize },
    PlaceholderInInput { index: usize },
    UndeclaredLock { index: usize, kinds: LockState },
    ZeroOutput { index: usize },
    Unbalanced,
    LockOverProduced { kind: LockState, lock_id: Id },
}

impl fmt::Display for FlowViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArityMismatch { ins, utxos, creds } => {
                write!(f, "{ins} inputs, {utxos} utxos, {creds} credentials")
            }
            Self::MissingUtxo(id) => write!(f, "utxo {id} does not exist"),
            Self::InputMismatch { index } => write!(f, "input {index} does not match its utxo"),
            Self::Unauthorized { index } => write!(f, "input {index} owners not satisfied"),
            Self::PlaceholderInInput { index } => {
                write!(f, "input {index} carries the this-tx placeholder")
            }
            Self::UndeclaredLock { index, kinds } => {
                write!(f, "output {index} newly locks {kinds}, not allowed here")
            }
            Self::ZeroOutput { index } => write!(f, "output {index} has zero amount"),
            Self::Unbalanced => write!(f, "consumed and produced value differ"),
            Self::LockOverProduced { kind, lock_id } => {
                write!(f, "more value {kind} by {lock_id} produced than consumed")
            }
        }
    }
}

/// Ownership dimension of a bucket: only value that stays locked keeps it.
type Bucket = (Id, LockIds, Option<Id>);

fn bucket(asset: Id, norm: LockIds, owner_id: impl FnOnce() -> Id) -> Bucket {
    let owner = norm.is_locked().then(owner_id);
    (asset, norm, owner)
}

fn add(map: &mut BTreeMap<Bucket, u128>, key: Bucket, amount: u64) {
    *map.entry(key).or_default() += u128::from(amount);
}

fn reject(violation: FlowViolation) -> ExecError {
    debug!(%violation, "flow check failed");
    ExecError::FlowCheckFailed
}

/// Look up the UTXO behind every input.
pub fn fetch_consumed(chain: &dyn Chain, ins: &[TransferableInput]) -> Result<Vec<Utxo>, ExecError> {
    ins.iter()
        .map(|input| {
            chain
                .utxo(&input.utxo_id)
                .ok_or_else(|| reject(FlowViolation::MissingUtxo(input.utxo_id)))
        })
        .collect()
}

/// Check that `ins` (backed by `consumed`, authorized by `signers`) pay for
/// `outs` under `rules` at chain time `now`.
pub fn verify_flow(
    chain: &dyn Chain,
    now: u64,
    ins: &[TransferableInput],
    consumed: &[Utxo],
    signers: &[BTreeSet<Address>],
    outs: &[TransferableOutput],
    rules: &FlowRules,
) -> Result<FlowSummary, ExecError> {
    if ins.len() != consumed.len() || ins.len() != signers.len() {
        return Err(reject(FlowViolation::ArityMismatch {
            ins: ins.len(),
            utxos: consumed.len(),
            creds: signers.len(),
        }));
    }

    let mut consumed_buckets: BTreeMap<Bucket, u128> = BTreeMap::new();
    let mut produced_buckets: BTreeMap<Bucket, u128> = BTreeMap::new();
    let mut consumed_locks: BTreeMap<(LockState, Id), u128> = BTreeMap::new();
    let mut produced_locks: BTreeMap<(LockState, Id), u128> = BTreeMap::new();
    let mut summary = FlowSummary::default();

    for (index, ((input, utxo), signers)) in ins.iter().zip(consumed).zip(signers).enumerate() {
        let in_ids = input.input.lock_ids().map_err(|_| ExecError::WrongType)?;
        utxo.out.lock_ids().map_err(|_| ExecError::WrongType)?;
        if in_ids.is_locked() && !rules.lock_mode_bond_deposit {
            return Err(ExecError::WrongLockMode);
        }
        if !utxo.matches(input).map_err(|_| ExecError::WrongType)? {
            return Err(reject(FlowViolation::InputMismatch { index }));
        }
        if !in_ids.new_lock_state().is_unlocked() {
            return Err(reject(FlowViolation::PlaceholderInInput { index }));
        }
        if !owners_satisfied(chain, utxo.out.owners(), signers, now) {
            return Err(reject(FlowViolation::Unauthorized { index }));
        }

        let amount = input.input.amount();
        let norm = in_ids.unlock(rules.remove);
        add(
            &mut consumed_buckets,
            bucket(input.asset_id, norm, || utxo.out.owners().owner_id()),
            amount,
        );
        for kind in rules.remove.kinds() {
            if let Some(lock_id) = in_ids.id_for(kind) {
                *consumed_locks.entry((kind, lock_id)).or_default() += u128::from(amount);
            }
        }
    }

    for (index, out) in outs.iter().enumerate() {
        let ids = out.out.lock_ids().map_err(|_| ExecError::WrongType)?;
        if ids.is_locked() && !rules.lock_mode_bond_deposit {
            return Err(ExecError::WrongLockMode);
        }
        let amount = out.out.amount();
        if amount == 0 {
            return Err(reject(FlowViolation::ZeroOutput { index }));
        }
        let new_kinds = ids.new_lock_state();
        if !rules.apply.contains(new_kinds) {
            return Err(reject(FlowViolation::UndeclaredLock {
                index,
                kinds: new_kinds,
            }));
        }

        let norm = ids.unlock(new_kinds).unlock(rules.remove);
        add(
            &mut produced_buckets,
            bucket(out.asset_id, norm, || out.out.owners().owner_id()),
            amount,
        );
        for kind in new_kinds.kinds() {
            let entry = summary.newly_locked.entry((out.asset_id, kind)).or_default();
            *entry = entry.saturating_add(amount);
        }
        for kind in rules.remove.kinds() {
            if let Some(lock_id) = ids.id_for(kind).filter(|id| *id != THIS_TX_ID) {
                *produced_locks.entry((kind, lock_id)).or_default() += u128::from(amount);
            }
        }
    }

    for (asset, amount) in &rules.burn {
        add(
            &mut produced_buckets,
            (*asset, LockIds::UNLOCKED, None),
            *amount,
        );
    }

    consumed_buckets.retain(|_, v| *v > 0);
    produced_buckets.retain(|_, v| *v > 0);
    if consumed_buckets != produced_buckets {
        return Err(reject(FlowViolation::Unbalanced));
    }

    for ((kind, lock_id), produced) in &produced_locks {
        let consumed = consumed_locks.get(&(*kind, *lock_id)).copied().unwrap_or(0);
        if *produced > consumed {
            return Err(reject(FlowViolation::LockOverProduced {
                kind: *kind,
                lock_id: *lock_id,
            }));
        }
    }
    for (key, consumed) in consumed_locks {
        let produced = produced_locks.get(&key).copied().unwrap_or(0);
        let released = u64::try_from(consumed - produced).unwrap_or(u64::MAX);
        summary.released.insert(key, released);
    }

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
