//! Staker records and set ordering.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::ids::{Id, NodeId};

/// Which set a staker is in. A staker is in exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StakerSet {
    /// Scheduled, ordered by start time.
    Pending,
    /// Validating, ordered by end time.
    Current,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staker {
    /// The add-validator transaction that created this staker.
    pub tx_id: Id,
    pub node_id: NodeId,
    /// [`crate::config::PRIMARY_NETWORK_ID`] for primary validators.
    pub subnet_id: Id,
    pub start: u64,
    pub end: u64,
    pub weight: u64,
}

impl Staker {
    /// The time this staker next changes sets: promotion while pending,
    /// removal while current.
    pub fn next_time(&self, set: StakerSet) -> u64 {
        match set {
            StakerSet::Pending => self.start,
            StakerSet::Current => self.end,
        }
    }

    /// Set order: by [`Staker::next_time`], ties broken by tx id.
    pub fn cmp_in(&self, other: &Staker, set: StakerSet) -> Ordering {
        self.next_time(set)
            .cmp(&other.next_time(set))
            .then_with(|| self.tx_id.cmp(&other.tx_id))
    }
}

/// Sort stakers into the canonical order of `set`.
pub fn sort_stakers(stakers: &mut [Staker], set: StakerSet) {
    stakers.sort_by(|a, b| a.cmp_in(b, set));
}
