//! The executor's closed set of rejection reasons.
//!
//! Every error is terminal for the transaction and leaves state untouched.
//! Callers that only care about the broad class use
//! [`ExecError::category`].

use std::fmt;
use thiserror::Error;

use crate::deposit::EligibilityError;
use crate::shared_memory::SharedMemoryError;
use crate::transaction::{TxError, TxKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Structural,
    Temporal,
    Economic,
    Authorization,
    Lookup,
    CrossChain,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Structural => "structural",
            Self::Temporal => "temporal",
            Self::Economic => "economic",
            Self::Authorization => "authorization",
            Self::Lookup => "lookup",
            Self::CrossChain => "cross-chain",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecError {
    // -- Structural ----------------------------------------------------------
    #[error("malformed transaction: {0}")]
    Malformed(#[from] TxError),

    #[error("expected {expected} credentials, got {got}")]
    WrongCredentialCount { expected: usize, got: usize },

    #[error("credential {index} carries an invalid signature")]
    InvalidSignature { index: usize },

    #[error("wrong input or output type")]
    WrongType,

    #[error("locked value or bond/deposit transaction while bond/deposit lock mode is off")]
    WrongLockMode,

    #[error("{0} transactions are not accepted here")]
    WrongTxType(TxKind),

    #[error("system transaction body differs from the expected one")]
    InvalidSystemTxBody,

    #[error("invalid export destination chain")]
    InvalidDestinationChain,

    // -- Temporal ------------------------------------------------------------
    #[error("staker start time {start} is not after chain time {chain_time}")]
    ChainTimeNotBeforeStart { start: u64, chain_time: u64 },

    #[error("staker start time {start} is beyond {max_start}")]
    FutureStakeTime { start: u64, max_start: u64 },

    #[error("staking duration {duration}s below minimum")]
    StakeTooShort { duration: u64 },

    #[error("staking duration {duration}s above maximum")]
    StakeTooLong { duration: u64 },

    #[error("subnet validator window is not within its primary validator window")]
    ValidatorWindowNotSubset,

    #[error("deposit offer is not active yet")]
    OfferNotYetActive,

    #[error("deposit offer has expired")]
    OfferExpired,

    #[error("deposit offer is disabled")]
    OfferDisabled,

    #[error("deposit duration below offer minimum")]
    DepositDurationTooShort,

    #[error("deposit duration above offer maximum")]
    DepositDurationTooLong,

    #[error("staker ends at {end}, chain time is {chain_time}")]
    RemoveStakerTooEarly { end: u64, chain_time: u64 },

    #[error("proposed time {proposed} is not after chain time {chain_time}")]
    TimestampNotAfterCurrent { proposed: u64, chain_time: u64 },

    #[error("proposed time {proposed} is beyond wall clock bound {max}")]
    TimestampTooFarInFuture { proposed: u64, max: u64 },

    #[error("proposed time {proposed} is beyond the next staker change at {next_change}")]
    TimestampBeyondStakerChange { proposed: u64, next_change: u64 },

    // -- Economic ------------------------------------------------------------
    #[error("flow check failed")]
    FlowCheckFailed,

    #[error("deposit amount below offer minimum")]
    DepositTooSmall,

    #[error("supply would exceed the maximum")]
    SupplyOverflow,

    #[error("validator weight {weight} below minimum stake")]
    WeightTooSmall { weight: u64 },

    #[error("validator weight {weight} above maximum stake")]
    WeightTooLarge { weight: u64 },

    #[error("unlocked {released} of a deposit, {unlockable} is unlockable")]
    UnlockAmountMismatch { released: u64, unlockable: u64 },

    #[error("claim of {requested} exceeds claimable {available}")]
    ClaimAmountExceeded { requested: u64, available: u64 },

    // -- Authorization -------------------------------------------------------
    #[error("consortium member signature missing")]
    ConsortiumSignatureMissing,

    #[error("node signature missing")]
    NodeSignatureMissing,

    #[error("address is not a consortium member")]
    NotConsortiumMember,

    #[error("node is not registered to this consortium member")]
    NodeNotRegistered,

    #[error("node or member already has a registration")]
    NodeAlreadyRegistered,

    #[error("node is still a validator")]
    NodeStillValidating,

    #[error("consortium member's node is deferred")]
    MemberNodeDeferred,

    #[error("consortium member still has a registered node")]
    MemberHasRegisteredNode,

    #[error("unauthorized subnet modification")]
    UnauthorizedSubnetModification,

    #[error("address state bit conflicts with an existing role or status")]
    InvalidRoleTransition,

    #[error("executor may not change this address state bit")]
    AddressStateNotPermitted,

    #[error("target address is empty")]
    EmptyAddress,

    #[error("credential does not satisfy the deposit rewards owner")]
    DepositCredentialMismatch,

    #[error("credential does not satisfy the claimable owner")]
    ClaimableCredentialMismatch,

    #[error("credential does not satisfy the alias owners")]
    UnauthorizedAliasUpdate,

    // -- Lookup --------------------------------------------------------------
    #[error("staker not found")]
    StakerNotFound,

    #[error("deposit not found")]
    DepositNotFound,

    #[error("deposit offer not found")]
    DepositOfferNotFound,

    #[error("subnet not found")]
    SubnetNotFound,

    #[error("multisig alias not found")]
    AliasNotFound,

    #[error("claimable record not found")]
    ClaimableNotFound,

    #[error("node is already a validator of this subnet")]
    DuplicateValidator,

    #[error("node is not a primary network validator")]
    NotValidator,

    // -- Cross-chain ---------------------------------------------------------
    #[error("imported inputs differ from the eligible shared memory records")]
    ImportedInputsMismatch,

    #[error("imported input amount differs from its shared memory record")]
    InputAmountMismatch,

    #[error("shared memory record is younger than the sync bound")]
    AtomicUtxoNotFinal,

    #[error("shared memory: {0}")]
    SharedMemory(#[from] SharedMemoryError),
}

impl ExecError {
    pub fn category(&self) -> ErrorCategory {
        use ExecError::*;
        match self {
            Malformed(_)
            | WrongCredentialCount { .. }
            | InvalidSignature { .. }
            | WrongType
            | WrongLockMode
            | WrongTxType(_)
            | InvalidSystemTxBody
            | InvalidDestinationChain => ErrorCategory::Structural,

            ChainTimeNotBeforeStart { .. }
            | FutureStakeTime { .. }
            | StakeTooShort { .. }
            | StakeTooLong { .. }
            | ValidatorWindowNotSubset
            | OfferNotYetActive
            | OfferExpired
            | OfferDisabled
            | DepositDurationTooShort
            | DepositDurationTooLong
            | RemoveStakerTooEarly { .. }
            | TimestampNotAfterCurrent { .. }
            | TimestampTooFarInFuture { .. }
            | TimestampBeyondStakerChange { .. } => ErrorCategory::Temporal,

            FlowCheckFailed
            | DepositTooSmall
            | SupplyOverflow
            | WeightTooSmall { .. }
            | WeightTooLarge { .. }
            | UnlockAmountMismatch { .. }
            | ClaimAmountExceeded { .. } => ErrorCategory::Economic,

            ConsortiumSignatureMissing
            | NodeSignatureMissing
            | NotConsortiumMember
            | NodeNotRegistered
            | NodeAlreadyRegistered
            | NodeStillValidating
            | MemberNodeDeferred
            | MemberHasRegisteredNode
            | UnauthorizedSubnetModification
            | InvalidRoleTransition
            | AddressStateNotPermitted
            | EmptyAddress
            | DepositCredentialMismatch
            | ClaimableCredentialMismatch
            | UnauthorizedAliasUpdate => ErrorCategory::Authorization,

            StakerNotFound
            | DepositNotFound
            | DepositOfferNotFound
            | SubnetNotFound
            | AliasNotFound
            | ClaimableNotFound
            | DuplicateValidator
            | NotValidator => ErrorCategory::Lookup,

            ImportedInputsMismatch
            | InputAmountMismatch
            | AtomicUtxoNotFinal
            | SharedMemory(_) => ErrorCategory::CrossChain,
        }
    }
}

impl From<EligibilityError> for ExecError {
    fn from(err: EligibilityError) -> Self {
        match err {
            EligibilityError::NotYetActive { .. } => ExecError::OfferNotYetActive,
            EligibilityError::Expired { .. } => ExecError::OfferExpired,
            EligibilityError::Disabled => ExecError::OfferDisabled,
            EligibilityError::DurationTooShort { .. } => ExecError::DepositDurationTooShort,
            EligibilityError::DurationTooLong { .. } => ExecError::DepositDurationTooLong,
            EligibilityError::TooSmall { .. } => ExecError::DepositTooSmall,
        }
    }
}
