//! Deposit offers: published terms under which value may be deposited.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::INTEREST_RATE_DENOMINATOR;
use crate::ids::Id;

/// Offer flag: no new deposits accepted.
pub const OFFER_FLAG_LOCKED: u64 = 0b1;

/// Malformed offer terms.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OfferError {
    #[error("offer window is empty: start {start} >= end {end}")]
    EmptyWindow { start: u64, end: u64 },

    #[error("offer duration bounds invalid: min {min}s, max {max}s")]
    DurationBounds { min: u32, max: u32 },

    #[error("unlock period {unlock_period}s exceeds min duration {min_duration}s")]
    UnlockPeriodTooLong { unlock_period: u32, min_duration: u32 },

    #[error("no-rewards period {no_rewards}s exceeds min duration {min_duration}s")]
    NoRewardsPeriodTooLong { no_rewards: u32, min_duration: u32 },

    #[error("interest rate {rate} exceeds 100% ({INTEREST_RATE_DENOMINATOR})")]
    InterestRateTooHigh { rate: u64 },
}

/// Why a deposit does not qualify for an offer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("offer starts at {start}, now is {now}")]
    NotYetActive { start: u64, now: u64 },

    #[error("offer ended at {end}, now is {now}")]
    Expired { end: u64, now: u64 },

    #[error("offer is disabled")]
    Disabled,

    #[error("duration {duration}s below offer minimum {min}s")]
    DurationTooShort { duration: u32, min: u32 },

    #[error("duration {duration}s above offer maximum {max}s")]
    DurationTooLong { duration: u32, max: u32 },

    #[error("deposit {amount} below offer minimum {min}")]
    TooSmall { amount: u64, min: u64 },
}

/// Terms of a deposit offer. Immutable once published.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositOffer {
    pub id: Id,
    /// Annual-independent interest over the whole deposit duration, as a
    /// numerator over [`INTEREST_RATE_DENOMINATOR`].
    pub interest_rate_nominator: u64,
    /// Activation window `[start, end)`, unix seconds.
    pub start: u64,
    pub end: u64,
    pub min_amount: u64,
    pub min_duration: u32,
    pub max_duration: u32,
    /// Length of the tail window in which the principal unlocks linearly.
    pub unlock_period_duration: u32,
    /// Length of the head window that earns nothing.
    pub no_rewards_period_duration: u32,
    pub memo: Vec<u8>,
    pub flags: u64,
}

impl DepositOffer {
    pub fn validate(&self) -> Result<(), OfferError> {
        if self.start >= self.end {
            return Err(OfferError::EmptyWindow {
                start: self.start,
                end: self.end,
            });
        }
        if self.min_duration == 0 || self.min_duration > self.max_duration {
            return Err(OfferError::DurationBounds {
                min: self.min_duration,
                max: self.max_duration,
            });
        }
        if self.unlock_period_duration > self.min_duration {
            return Err(OfferError::UnlockPeriodTooLong {
                unlock_period: self.unlock_period_duration,
                min_duration: self.min_duration,
            });
        }
        if self.no_rewards_period_duration > self.min_duration {
            return Err(OfferError::NoRewardsPeriodTooLong {
                no_rewards: self.no_rewards_period_duration,
                min_duration: self.min_duration,
            });
        }
        if self.interest_rate_nominator > INTEREST_RATE_DENOMINATOR {
            return Err(OfferError::InterestRateTooHigh {
                rate: self.interest_rate_nominator,
            });
        }
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.flags & OFFER_FLAG_LOCKED != 0
    }

    /// Whether a deposit of `amount` for `duration` seconds may be made at
    /// `now`. Checks run window, flags, duration, then amount.
    pub fn check_eligibility(
        &self,
        now: u64,
        duration: u32,
        amount: u64,
    ) -> Result<(), EligibilityError> {
        if now < self.start {
            return Err(EligibilityError::NotYetActive {
                start: self.start,
                now,
            });
        }
        if now >= self.end {
            return Err(EligibilityError::Expired { end: self.end, now });
        }
        if self.is_locked() {
            return Err(EligibilityError::Disabled);
        }
        if duration < self.min_duration {
            return Err(EligibilityError::DurationTooShort {
                duration,
                min: self.min_duration,
            });
        }
        if duration > self.max_duration {
            return Err(EligibilityError::DurationTooLong {
                duration,
                max: self.max_duration,
            });
        }
        if amount == 0 || amount < self.min_amount {
            return Err(EligibilityError::TooSmall {
                amount,
                min: self.min_amount,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_offer() -> DepositOffer {
    DepositOffer {
        id: Id::from_label("offer"),
        interest_rate_nominator: 100_000, // 10%
        start: 1_000,
        end: 1_000_000,
        min_amount: 100,
        min_duration: 1_000,
        max_duration: 100_000,
        unlock_period_duration: 1_000,
        no_rewards_period_duration: 0,
        memo: Vec::new(),
        flags: 0,
    }
}
