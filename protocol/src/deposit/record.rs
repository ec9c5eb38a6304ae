//! Deposit records and their time arithmetic.
//!
//! ```text
//!  start        start+noRewards                 end-unlockPeriod      end
//!    |---- no reward ----|------------ reward accrues ----------------|
//!    |---------------- fully locked -----------------|--- linear ----|
//! ```
//!
//! All products run in `u128`; results are floored, so neither the unlockable
//! principal nor the reward ever exceeds its exact proportional share.

use serde::{Deserialize, Serialize};

use super::offer::DepositOffer;
use crate::config::INTEREST_RATE_DENOMINATOR;
use crate::ids::Id;
use crate::utxo::OutputOwners;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub offer_id: Id,
    /// Chain time the deposit was accepted.
    pub start: u64,
    /// Seconds.
    pub duration: u32,
    /// Principal. Immutable.
    pub amount: u64,
    /// Principal already released by unlock transactions.
    pub unlocked_amount: u64,
    /// Reward already paid out by claim transactions.
    pub claimed_reward: u64,
    pub rewards_owner: OutputOwners,
}

impl Deposit {
    pub fn end(&self) -> u64 {
        self.start.saturating_add(u64::from(self.duration))
    }

    pub fn is_fully_unlocked(&self) -> bool {
        self.unlocked_amount >= self.amount
    }

    /// Principal that may be released at `time` beyond what already was.
    ///
    /// Zero before the tail window, the whole remainder from `end()` on, and
    /// `floor(amount * elapsed / unlock_period)` minus the released part in
    /// between.
    pub fn unlockable_amount(&self, offer: &DepositOffer, time: u64) -> u64 {
        let end = self.end();
        let unlock_period = u64::from(offer.unlock_period_duration.min(self.duration));
        let unlock_start = end - unlock_period;

        if time >= end {
            return self.amount.saturating_sub(self.unlocked_amount);
        }
        if time < unlock_start || unlock_period == 0 {
            return 0;
        }

        let elapsed = u128::from(time - unlock_start);
        let share = u128::from(self.amount) * elapsed / u128::from(unlock_period);
        // share < amount because elapsed < unlock_period.
        (share as u64).saturating_sub(self.unlocked_amount)
    }

    /// Reward accrued by `time`, ignoring what was claimed.
    pub fn reward_at(&self, offer: &DepositOffer, time: u64) -> u64 {
        if self.duration == 0 {
            return 0;
        }
        let rewards_start = self
            .start
            .saturating_add(u64::from(offer.no_rewards_period_duration));
        let until = time.min(self.end());
        if until <= rewards_start {
            return 0;
        }
        let elapsed = u128::from(until - rewards_start);
        let numerator =
            u128::from(self.amount) * u128::from(offer.interest_rate_nominator) * elapsed;
        let denominator = u128::from(INTEREST_RATE_DENOMINATOR) * u128::from(self.duration);
        u64::try_from(numerator / denominator).unwrap_or(u64::MAX)
    }

    /// Reward the deposit earns over its whole life.
    pub fn total_reward(&self, offer: &DepositOffer) -> u64 {
        self.reward_at(offer, self.end())
    }

    /// Accrued and not yet claimed at `time`.
    pub fn claimable_reward(&self, offer: &DepositOffer, time: u64) -> u64 {
        self.reward_at(offer, time)
            .saturating_sub(self.claimed_reward)
    }

    /// Reward never claimed, as of the deposit's end.
    pub fn remaining_reward(&self, offer: &DepositOffer) -> u64 {
        self.total_reward(offer).saturating_sub(self.claimed_reward)
    }
}
