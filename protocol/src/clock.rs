//! Wall clock access for the executor.
//!
//! Only advance-time proposals consult the wall clock, to keep a proposer
//! from racing chain time into the future. Everything else runs on chain
//! time read from state.

use chrono::Utc;

/// Source of "now", in unix seconds.
pub trait Clock: Send + Sync {
    fn unix_now(&self) -> u64;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> u64 {
        // Pre-1970 system clocks read as zero.
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn unix_now(&self) -> u64 {
        self.0
    }
}
