//! # Deposit Accounting
//!
//! ```text
//! offer.rs  — DepositOffer terms, validation, eligibility
//! record.rs — Deposit records: unlockable principal, accrued reward
//! ```

pub mod offer;
pub mod record;

pub use offer::{DepositOffer, EligibilityError, OfferError, OFFER_FLAG_LOCKED};
pub use record::Deposit;
