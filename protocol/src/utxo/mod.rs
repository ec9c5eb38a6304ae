//! # UTXO Value Containers
//!
//! ```text
//! owners.rs — OutputOwners: threshold-of-addresses ownership predicate
//! output.rs — Output/Input kinds (transfer, bond/deposit locked, time-locked),
//!             TransferableOutput/Input, Utxo
//! ```
//!
//! A UTXO is created when a transaction produces it and consumed exactly
//! once as some later transaction's input. Existence is the state's
//! business; this module only describes what a UTXO holds.

pub mod output;
pub mod owners;

pub use output::{
    Input, LockError, Output, TransferOutput, TransferableInput, TransferableOutput, Utxo,
};
pub use owners::{OutputOwners, OwnersError};
