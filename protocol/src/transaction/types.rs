//! Core type definitions for Lumen platform transactions.
//!
//! Every transaction kind the executor accepts is a variant of
//! [`UnsignedTx`]. Most kinds embed a [`BaseTx`] carrying the ordinary
//! inputs and outputs that pay the fee and move value; the three system
//! kinds ([`RewardsImportTx`], [`RewardValidatorTx`], [`AdvanceTimeTx`]) are
//! built by block producers and carry no credentials.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{MAX_CHAIN_NAME_LENGTH, MAX_MEMO_LENGTH};
use crate::ids::{Address, Id, NodeId};
use crate::state::AddressStateBit;
use crate::utxo::{OutputOwners, OwnersError, TransferableInput, TransferableOutput};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Problems detectable from the transaction bytes alone, without state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TxError {
    #[error("memo is {len} bytes, limit is {MAX_MEMO_LENGTH}")]
    MemoTooLong { len: usize },

    #[error("invalid owners: {0}")]
    InvalidOwners(#[from] OwnersError),

    #[error("invalid chain name {0:?}")]
    InvalidChainName(String),

    #[error("inputs are not sorted and unique")]
    InputsNotSortedUnique,

    #[error("transaction has no inputs")]
    NoInputs,

    #[error("node registration changes nothing")]
    NoNodeChange,

    #[error("codec error: {0}")]
    Codec(String),
}

// ---------------------------------------------------------------------------
// TxKind
// ---------------------------------------------------------------------------

/// Discriminant of an [`UnsignedTx`], for logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxKind {
    Base,
    AddValidator,
    AddSubnetValidator,
    RemoveSubnetValidator,
    Deposit,
    UnlockDeposit,
    Claim,
    RegisterNode,
    AddressState,
    MultisigAlias,
    RewardsImport,
    Import,
    Export,
    CreateSubnet,
    CreateChain,
    TransformSubnet,
    RewardValidator,
    AdvanceTime,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Base => "Base",
            Self::AddValidator => "AddValidator",
            Self::AddSubnetValidator => "AddSubnetValidator",
            Self::RemoveSubnetValidator => "RemoveSubnetValidator",
            Self::Deposit => "Deposit",
            Self::UnlockDeposit => "UnlockDeposit",
            Self::Claim => "Claim",
            Self::RegisterNode => "RegisterNode",
            Self::AddressState => "AddressState",
            Self::MultisigAlias => "MultisigAlias",
            Self::RewardsImport => "RewardsImport",
            Self::Import => "Import",
            Self::Export => "Export",
            Self::CreateSubnet => "CreateSubnet",
            Self::CreateChain => "CreateChain",
            Self::TransformSubnet => "TransformSubnet",
            Self::RewardValidator => "RewardValidator",
            Self::AdvanceTime => "AdvanceTime",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// Inputs and outputs shared by user transactions. The difference between
/// consumed and produced unlocked value is the burned fee.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseTx {
    pub ins: Vec<TransferableInput>,
    pub outs: Vec<TransferableOutput>,
    pub memo: Vec<u8>,
}

/// A staking window on some subnet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub node_id: NodeId,
    /// Unix seconds, inclusive.
    pub start: u64,
    /// Unix seconds, exclusive.
    pub end: u64,
    pub weight: u64,
}

impl Validator {
    pub fn duration(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// `[self.start, self.end)` lies within `[outer.start, outer.end)`.
    pub fn within(&self, outer_start: u64, outer_end: u64) -> bool {
        self.start >= outer_start && self.end <= outer_end
    }
}

/// Bond `validator.weight` of the fee asset and schedule a primary-network
/// validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddSubnetValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub subnet_id: Id,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveSubnetValidatorTx {
    pub base: BaseTx,
    pub node_id: NodeId,
    pub subnet_id: Id,
}

/// Lock value under a deposit offer. The deposited amount is whatever the
/// outputs lock with the [`crate::locked::THIS_TX_ID`] deposit placeholder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositTx {
    pub base: BaseTx,
    pub deposit_offer_id: Id,
    /// Seconds.
    pub deposit_duration: u32,
    pub rewards_owner: OutputOwners,
}

/// Release the currently unlockable part of one or more deposits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockDepositTx {
    pub base: BaseTx,
}

/// What a claim draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClaimKind {
    /// Accrued interest of a live deposit, keyed by deposit tx id.
    ActiveDepositReward(Id),
    /// Leftover interest of fully unlocked deposits, keyed by owner id.
    ExpiredDepositReward(Id),
    /// Imported validator rewards, keyed by owner id.
    ValidatorReward(Id),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAmount {
    pub kind: ClaimKind,
    pub amount: u64,
}

/// Claim rewards. Each claimable entry is authorized by its own credential
/// and the total is paid as one unlocked output to `claim_to`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTx {
    pub base: BaseTx,
    pub claimables: Vec<ClaimAmount>,
    pub claim_to: OutputOwners,
}

/// Link, relink or unlink a node to a consortium member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterNodeTx {
    pub base: BaseTx,
    pub old_node_id: Option<NodeId>,
    pub new_node_id: Option<NodeId>,
    pub consortium_member: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressStateTx {
    pub base: BaseTx,
    pub address: Address,
    pub bit: AddressStateBit,
    pub remove: bool,
    /// Address whose roles authorize the change; signs the extra credential.
    pub executor: Address,
}

/// Create (`alias: None`) or update a multisig alias.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigAliasTx {
    pub base: BaseTx,
    pub alias: Option<Address>,
    pub owners: OutputOwners,
    pub memo: Vec<u8>,
}

/// System transaction importing escrowed validator rewards from the reward
/// chain's shared memory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsImportTx {
    pub ins: Vec<TransferableInput>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportTx {
    pub base: BaseTx,
    pub source_chain: Id,
    pub imported_ins: Vec<TransferableInput>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTx {
    pub base: BaseTx,
    pub destination_chain: Id,
    pub exported_outs: Vec<TransferableOutput>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubnetTx {
    pub base: BaseTx,
    pub owner: OutputOwners,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateChainTx {
    pub base: BaseTx,
    pub subnet_id: Id,
    pub chain_name: String,
    pub vm_id: Id,
    pub genesis_data: Vec<u8>,
}

/// Elastic subnet conversion. Never accepted here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSubnetTx {
    pub base: BaseTx,
    pub subnet_id: Id,
    pub asset_id: Id,
}

/// Proposal removing a finished primary validator and releasing its bond.
/// `ins` and `outs` must be exactly the bond release the chain expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardValidatorTx {
    pub staker_tx_id: Id,
    pub ins: Vec<TransferableInput>,
    pub outs: Vec<TransferableOutput>,
}

/// Proposal moving chain time forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceTimeTx {
    pub time: u64,
}

// ---------------------------------------------------------------------------
// UnsignedTx
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnsignedTx {
    Base(BaseTx),
    AddValidator(AddValidatorTx),
    AddSubnetValidator(AddSubnetValidatorTx),
    RemoveSubnetValidator(RemoveSubnetValidatorTx),
    Deposit(DepositTx),
    UnlockDeposit(UnlockDepositTx),
    Claim(ClaimTx),
    RegisterNode(RegisterNodeTx),
    AddressState(AddressStateTx),
    MultisigAlias(MultisigAliasTx),
    RewardsImport(RewardsImportTx),
    Import(ImportTx),
    Export(ExportTx),
    CreateSubnet(CreateSubnetTx),
    CreateChain(CreateChainTx),
    TransformSubnet(TransformSubnetTx),
    RewardValidator(RewardValidatorTx),
    AdvanceTime(AdvanceTimeTx),
}

impl UnsignedTx {
    pub fn kind(&self) -> TxKind {
        match self {
            Self::Base(_) => TxKind::Base,
            Self::AddValidator(_) => TxKind::AddValidator,
            Self::AddSubnetValidator(_) => TxKind::AddSubnetValidator,
            Self::RemoveSubnetValidator(_) => TxKind::RemoveSubnetValidator,
            Self::Deposit(_) => TxKind::Deposit,
            Self::UnlockDeposit(_) => TxKind::UnlockDeposit,
            Self::Claim(_) => TxKind::Claim,
            Self::RegisterNode(_) => TxKind::RegisterNode,
            Self::AddressState(_) => TxKind::AddressState,
            Self::MultisigAlias(_) => TxKind::MultisigAlias,
            Self::RewardsImport(_) => TxKind::RewardsImport,
            Self::Import(_) => TxKind::Import,
            Self::Export(_) => TxKind::Export,
            Self::CreateSubnet(_) => TxKind::CreateSubnet,
            Self::CreateChain(_) => TxKind::CreateChain,
            Self::TransformSubnet(_) => TxKind::TransformSubnet,
            Self::RewardValidator(_) => TxKind::RewardValidator,
            Self::AdvanceTime(_) => TxKind::AdvanceTime,
        }
    }

    /// Proposals yield a commit and an abort outcome instead of one delta.
    pub fn is_proposal(&self) -> bool {
        matches!(self, Self::RewardValidator(_) | Self::AdvanceTime(_))
    }

    /// Built by block producers; carries no credentials at all.
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            Self::RewardsImport(_) | Self::RewardValidator(_) | Self::AdvanceTime(_)
        )
    }

    /// The embedded base transaction, if this kind has one.
    pub fn base(&self) -> Option<&BaseTx> {
        match self {
            Self::Base(tx) => Some(tx),
            Self::AddValidator(tx) => Some(&tx.base),
            Self::AddSubnetValidator(tx) => Some(&tx.base),
            Self::RemoveSubnetValidator(tx) => Some(&tx.base),
            Self::Deposit(tx) => Some(&tx.base),
            Self::UnlockDeposit(tx) => Some(&tx.base),
            Self::Claim(tx) => Some(&tx.base),
            Self::RegisterNode(tx) => Some(&tx.base),
            Self::AddressState(tx) => Some(&tx.base),
            Self::MultisigAlias(tx) => Some(&tx.base),
            Self::Import(tx) => Some(&tx.base),
            Self::Export(tx) => Some(&tx.base),
            Self::CreateSubnet(tx) => Some(&tx.base),
            Self::CreateChain(tx) => Some(&tx.base),
            Self::TransformSubnet(tx) => Some(&tx.base),
            Self::RewardsImport(_) | Self::RewardValidator(_) | Self::AdvanceTime(_) => None,
        }
    }

    /// Number of inputs that each need an ownership credential: base inputs,
    /// then imported inputs.
    pub fn spent_input_count(&self) -> usize {
        let base = self.base().map_or(0, |b| b.ins.len());
        match self {
            Self::Import(tx) => base + tx.imported_ins.len(),
            _ => base,
        }
    }

    /// Credentials expected after the per-input ones.
    pub fn extra_credential_count(&self) -> usize {
        match self {
            Self::AddValidator(_)
            | Self::AddSubnetValidator(_)
            | Self::RemoveSubnetValidator(_)
            | Self::AddressState(_)
            | Self::CreateChain(_) => 1,
            Self::Claim(tx) => tx.claimables.len(),
            Self::RegisterNode(tx) => 1 + usize::from(tx.new_node_id.is_some()),
            Self::MultisigAlias(tx) => usize::from(tx.alias.is_some()),
            _ => 0,
        }
    }

    /// Total credentials a well-formed [`super::Tx`] of this body carries.
    pub fn expected_credential_count(&self) -> usize {
        if self.is_system() {
            return 0;
        }
        self.spent_input_count() + self.extra_credential_count()
    }

    /// State-free checks: memo and name limits, owner shapes, input order.
    pub fn syntactic_verify(&self) -> Result<(), TxError> {
        if let Some(base) = self.base() {
            verify_base(base)?;
        }
        match self {
            Self::Deposit(tx) => tx.rewards_owner.verify()?,
            Self::Claim(tx) => tx.claim_to.verify()?,
            Self::RegisterNode(tx) => {
                if tx.old_node_id.is_none() && tx.new_node_id.is_none() {
                    return Err(TxError::NoNodeChange);
                }
            }
            Self::MultisigAlias(tx) => {
                verify_memo(&tx.memo)?;
                tx.owners.verify()?;
                if tx.owners.addrs.is_empty() {
                    return Err(TxError::InvalidOwners(OwnersError::NoAddresses));
                }
            }
            Self::RewardsImport(tx) => {
                if tx.ins.is_empty() {
                    return Err(TxError::NoInputs);
                }
                verify_sorted_unique(&tx.ins)?;
            }
            Self::Import(tx) => {
                if tx.imported_ins.is_empty() {
                    return Err(TxError::NoInputs);
                }
                verify_sorted_unique(&tx.imported_ins)?;
            }
            Self::Export(tx) => {
                for out in &tx.exported_outs {
                    out.out.owners().verify()?;
                }
            }
            Self::CreateSubnet(tx) => tx.owner.verify()?,
            Self::CreateChain(tx) => verify_chain_name(&tx.chain_name)?,
            Self::RewardValidator(tx) => verify_sorted_unique(&tx.ins)?,
            _ => {}
        }
        Ok(())
    }
}

fn verify_base(base: &BaseTx) -> Result<(), TxError> {
    verify_memo(&base.memo)?;
    verify_sorted_unique(&base.ins)?;
    for out in &base.outs {
        out.out.owners().verify()?;
    }
    Ok(())
}

fn verify_memo(memo: &[u8]) -> Result<(), TxError> {
    if memo.len() > MAX_MEMO_LENGTH {
        return Err(TxError::MemoTooLong { len: memo.len() });
    }
    Ok(())
}

fn verify_sorted_unique(ins: &[TransferableInput]) -> Result<(), TxError> {
    if ins.windows(2).any(|pair| pair[0].utxo_id >= pair[1].utxo_id) {
        return Err(TxError::InputsNotSortedUnique);
    }
    Ok(())
}

/// Printable ASCII, no leading or trailing space, bounded length.
fn verify_chain_name(name: &str) -> Result<(), TxError> {
    let well_formed = !name.is_empty()
        && name.len() <= MAX_CHAIN_NAME_LENGTH
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b' ' || b == b'-')
        && name.trim() == name;
    if well_formed {
        Ok(())
    } else {
        Err(TxError::InvalidChainName(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
