// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Lumen Protocol — Platform Chain Executor
//!
//! The transaction executor of the Lumen platform chain: a UTXO ledger
//! where value can be bonded to a validator, deposited under an interest
//! offer, or both at once, and where validators are consortium members'
//! registered nodes.
//!
//! ## Architecture
//!
//! - **utxo** / **locked** — outputs, owner sets, and the dual bond/deposit
//!   lock ids every output carries.
//! - **deposit** — deposit offers and the unlock and reward arithmetic.
//! - **state** — the `Chain`/`ChainMut` view, the in-memory base state and
//!   the copy-on-write `Diff` overlay.
//! - **executor** — flow checking, authorization, staking rules, and the
//!   standard and proposal transaction executors.
//! - **shared_memory** — cross-chain UTXO exchange.
//! - **ledger** — state, shared memory and executor behind one lock.
//! - **config** / **clock** / **logging** — network parameters, time and
//!   tracing setup.
//!
//! ## Design Philosophy
//!
//! 1. A transaction either applies completely or not at all.
//! 2. Locked value never changes owner, and never appears from nowhere.
//! 3. Amount arithmetic is checked or widened; rounding never favors the
//!    spender.
//! 4. If it touches money, it has tests. Plural.

pub mod clock;
pub mod config;
pub mod crypto;
pub mod deposit;
pub mod executor;
pub mod ids;
pub mod ledger;
pub mod locked;
pub mod logging;
pub mod shared_memory;
pub mod state;
pub mod transaction;
pub mod utxo;
