//! # Transactions
//!
//! ```text
//! types.rs   — every transaction body, UnsignedTx, syntactic checks
//! signing.rs — credentials, Tx (body + credentials + id)
//! ```

pub mod signing;
pub mod types;

pub use signing::{Credential, SignedBy, Tx};
pub use types::{
    AddSubnetValidatorTx, AddValidatorTx, AddressStateTx, AdvanceTimeTx, BaseTx, ClaimAmount,
    ClaimKind, ClaimTx, CreateChainTx, CreateSubnetTx, DepositTx, ExportTx, ImportTx,
    MultisigAliasTx, RegisterNodeTx, RemoveSubnetValidatorTx, RewardValidatorTx, RewardsImportTx,
    TransformSubnetTx, TxError, TxKind, UnlockDepositTx, UnsignedTx, Validator,
};
