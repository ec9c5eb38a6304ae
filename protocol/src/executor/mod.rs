//! # Transaction Executor
//!
//! Applies Lumen platform transactions to chain state.
//!
//! Standard transactions either produce one [`StateChanges`] or fail with an
//! [`ExecError`] and change nothing. Proposals ([`crate::transaction::AdvanceTimeTx`],
//! [`crate::transaction::RewardValidatorTx`]) produce a commit and an abort
//! change set; see [`ProposalOutcome`].
//!
//! The executor only reads the parent state. Callers apply the returned
//! changes themselves, usually through [`crate::ledger::Ledger`].

pub mod atomic;
pub mod auth;
pub mod error;
pub mod flow;
pub mod proposal;
pub mod staking;
pub mod standard;

pub use error::{ErrorCategory, ExecError};
pub use proposal::ProposalOutcome;
pub use standard::recover_signers;

use crate::clock::Clock;
use crate::config::ExecutorConfig;
use crate::shared_memory::SharedMemory;
use crate::state::{Chain, Diff, StateChanges};
use crate::transaction::Tx;

/// Everything execution depends on besides chain state.
#[derive(Clone, Copy)]
pub struct Backend<'a> {
    pub config: &'a ExecutorConfig,
    pub clock: &'a dyn Clock,
    pub shared_memory: &'a dyn SharedMemory,
}

/// Validate a standard transaction against `parent` and return its changes.
pub fn execute_standard(
    backend: &Backend<'_>,
    parent: &dyn Chain,
    tx: &Tx,
) -> Result<StateChanges, ExecError> {
    let mut diff = Diff::new(parent);
    standard::execute(backend, &mut diff, tx)?;
    Ok(diff.into_changes())
}

/// Validate a proposal against `parent` and return both outcomes.
pub fn execute_proposal(
    backend: &Backend<'_>,
    parent: &dyn Chain,
    tx: &Tx,
) -> Result<ProposalOutcome, ExecError> {
    proposal::execute(backend, parent, tx)
}
