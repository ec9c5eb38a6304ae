//! # Ledger
//!
//! An in-memory platform chain: [`MemoryState`] plus this chain's view of
//! shared memory, behind one lock, with the executor in front.
//!
//! Writers take the lock exclusively for the whole validate-and-apply step,
//! so a transaction is always judged against the state it is applied to.
//! Readers see either all of a transaction's effects or none.

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::{ConfigError, ExecutorConfig};
use crate::executor::{execute_proposal, execute_standard, Backend, ExecError};
use crate::ids::Id;
use crate::shared_memory::MemorySharedMemory;
use crate::state::{Chain, Diff, MemoryState, StateChanges};
use crate::transaction::Tx;

/// Consensus decision on a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Commit,
    Abort,
}

struct LedgerState {
    chain: MemoryState,
    shared_memory: MemorySharedMemory,
}

impl LedgerState {
    fn apply(&mut self, changes: StateChanges) {
        self.chain.apply(changes);
        let requests = self.chain.take_atomic_requests();
        if !requests.is_empty() {
            self.shared_memory.apply_requests(requests);
        }
    }
}

pub struct Ledger {
    config: ExecutorConfig,
    clock: Box<dyn Clock>,
    state: RwLock<LedgerState>,
}

impl Ledger {
    pub fn new(
        config: ExecutorConfig,
        clock: Box<dyn Clock>,
        genesis: MemoryState,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            chain_id = %config.chain_id,
            time = genesis.timestamp(),
            lock_mode_bond_deposit = config.lock_mode_bond_deposit,
            "ledger started"
        );
        Ok(Self {
            config,
            clock,
            state: RwLock::new(LedgerState {
                chain: genesis,
                shared_memory: MemorySharedMemory::new(),
            }),
        })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Validate `tx` without applying it.
    pub fn validate_standard(&self, tx: &Tx) -> Result<StateChanges, ExecError> {
        let state = self.state.read();
        let backend = self.backend(&state.shared_memory);
        execute_standard(&backend, &state.chain, tx)
    }

    /// Validate and apply one standard transaction.
    pub fn apply_standard(&self, tx: &Tx) -> Result<Id, ExecError> {
        let mut state = self.state.write();
        let changes = {
            let backend = self.backend(&state.shared_memory);
            execute_standard(&backend, &state.chain, tx)
        };
        let changes = changes.map_err(|err| {
            warn!(tx_id = %tx.id(), kind = %tx.body().kind(), category = %err.category(), %err, "transaction rejected");
            err
        })?;
        state.apply(changes);
        Ok(tx.id())
    }

    /// Validate and apply a block of standard transactions in order. Each
    /// transaction sees the effects of the ones before it; if any fails,
    /// nothing is applied.
    pub fn apply_block(&self, txs: &[Tx]) -> Result<(), ExecError> {
        let mut state = self.state.write();
        let changes = {
            let backend = self.backend(&state.shared_memory);
            let mut block = Diff::new(&state.chain);
            for (index, tx) in txs.iter().enumerate() {
                match execute_standard(&backend, &block, tx) {
                    Ok(changes) => block.absorb(changes),
                    Err(err) => {
                        warn!(index, tx_id = %tx.id(), %err, "block rejected");
                        return Err(err);
                    }
                }
            }
            block.into_changes()
        };
        state.apply(changes);
        info!(txs = txs.len(), "block applied");
        Ok(())
    }

    /// Validate a proposal and apply the outcome consensus voted for.
    pub fn apply_proposal(&self, tx: &Tx, vote: Vote) -> Result<(), ExecError> {
        let mut state = self.state.write();
        let outcome = {
            let backend = self.backend(&state.shared_memory);
            execute_proposal(&backend, &state.chain, tx)?
        };
        let changes = match vote {
            Vote::Commit => outcome.on_commit,
            Vote::Abort => outcome.on_abort,
        };
        state.apply(changes);
        info!(tx_id = %tx.id(), kind = %tx.body().kind(), ?vote, "proposal decided");
        Ok(())
    }

    /// Run `f` against a consistent snapshot of the chain state.
    pub fn read<R>(&self, f: impl FnOnce(&MemoryState) -> R) -> R {
        f(&self.state.read().chain)
    }

    pub fn read_shared_memory<R>(&self, f: impl FnOnce(&MemorySharedMemory) -> R) -> R {
        f(&self.state.read().shared_memory)
    }

    /// Mutate shared memory directly, standing in for peer chains.
    pub fn with_shared_memory_mut<R>(&self, f: impl FnOnce(&mut MemorySharedMemory) -> R) -> R {
        f(&mut self.state.write().shared_memory)
    }

    fn backend<'a>(&'a self, shared_memory: &'a MemorySharedMemory) -> Backend<'a> {
        Backend {
            config: &self.config,
            clock: self.clock.as_ref(),
            shared_memory,
        }
    }
}
