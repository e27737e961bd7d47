//! Workforce pool, economy-score track and salary track.
//!
//! The pool is the only shared worker counter of a game. Every assignment
//! goes through [`WorkforcePool::allocate`] and every return through
//! [`WorkforcePool::release`], so `allocated + available == total` holds
//! after each call.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default number of workers in a game.
pub const DEFAULT_TOTAL_WORKERS: u32 = 40;

/// Economy score by number of allocated workers; index 40 is the rightmost space.
const ECONOMY_SCORE_TRACK: [u32; 41] = [
    10, 10, 11, 11, 12, 12, 13, 13, 14, 14, 15, 15, 16, 16, 17, 17, 18, 18, 19, 19, 20, 20, 21,
    21, 22, 22, 23, 23, 24, 24, 25, 25, 26, 26, 27, 27, 28, 28, 29, 29, 30,
];

/// Salary per worker once at least `threshold` workers are allocated.
const SALARY_TRACK: [(u32, i64); 4] = [(0, 10), (10, 15), (20, 20), (30, 30)];

/// Economy score for the rightmost allocated worker position.
pub fn economy_score_for(allocated_workers: u32) -> u32 {
    let idx = (allocated_workers as usize).min(ECONOMY_SCORE_TRACK.len() - 1);
    ECONOMY_SCORE_TRACK[idx]
}

/// Salary paid per factory worker at the given allocation level.
pub fn salary_for(allocated_workers: u32) -> Decimal {
    let salary = SALARY_TRACK
        .iter()
        .rev()
        .find(|(threshold, _)| allocated_workers >= *threshold)
        .map(|(_, salary)| *salary)
        .unwrap_or(SALARY_TRACK[0].1);
    Decimal::from(salary)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkforceError {
    /// Business rule: not enough free workers for an action.
    #[error("insufficient workers: need {need}, have {have}")]
    Insufficient { need: u32, have: u32 },
    /// Consistency bug: more workers returned than were ever allocated.
    #[error("workforce over-release: returning {returned}, only {allocated} allocated")]
    OverRelease { returned: u32, allocated: u32 },
}

/// Per-game pool of workers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkforcePool {
    total: u32,
    available: u32,
}

impl Default for WorkforcePool {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_WORKERS)
    }
}

impl WorkforcePool {
    pub fn new(total: u32) -> Self {
        Self { total, available: total }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    /// Zero when a malformed snapshot reports more available than total.
    pub fn allocated(&self) -> u32 {
        self.total.saturating_sub(self.available)
    }

    pub fn economy_score(&self) -> u32 {
        economy_score_for(self.allocated())
    }

    pub fn salary(&self) -> Decimal {
        salary_for(self.allocated())
    }

    /// Check without mutating.
    pub fn ensure_available(&self, need: u32) -> Result<(), WorkforceError> {
        if need > self.available {
            return Err(WorkforceError::Insufficient { need, have: self.available });
        }
        Ok(())
    }

    /// Take `n` workers from the pool.
    pub fn allocate(&mut self, n: u32) -> Result<(), WorkforceError> {
        self.ensure_available(n)?;
        self.available -= n;
        debug!(n, available = self.available, "workers allocated");
        Ok(())
    }

    /// Return `n` workers to the pool.
    pub fn release(&mut self, n: u32) -> Result<(), WorkforceError> {
        let allocated = self.allocated();
        if n > allocated {
            return Err(WorkforceError::OverRelease { returned: n, allocated });
        }
        self.available += n;
        debug!(n, available = self.available, "workers released");
        Ok(())
    }

    /// `allocated + available == total` and `available <= total`.
    pub fn is_consistent(&self) -> bool {
        self.available <= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn economy_track_is_monotonic_and_clamped() {
        for w in ECONOMY_SCORE_TRACK.windows(2) {
            assert!(w[0] <= w[1]);
        }
        assert_eq!(economy_score_for(0), 10);
        assert_eq!(economy_score_for(40), 30);
        assert_eq!(economy_score_for(500), 30);
    }

    #[test]
    fn malformed_snapshot_reads_without_underflow() {
        let pool: WorkforcePool = serde_json::from_str(r#"{"total":10,"available":12}"#).unwrap();
        assert!(!pool.is_consistent());
        assert_eq!(pool.allocated(), 0);
        assert_eq!(pool.economy_score(), economy_score_for(0));
        assert_eq!(pool.salary(), salary_for(0));
    }

    #[test]
    fn salary_steps_up() {
        assert_eq!(salary_for(0), Decimal::from(10));
        assert_eq!(salary_for(10), Decimal::from(15));
        assert_eq!(salary_for(29), Decimal::from(20));
        assert_eq!(salary_for(40), Decimal::from(30));
    }

    #[test]
    fn allocate_rejects_without_mutation() {
        let mut pool = WorkforcePool::new(3);
        pool.allocate(2).unwrap();
        assert_eq!(
            pool.allocate(2),
            Err(WorkforceError::Insufficient { need: 2, have: 1 })
        );
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn over_release_is_reported() {
        let mut pool = WorkforcePool::new(5);
        pool.allocate(1).unwrap();
        assert!(matches!(pool.release(2), Err(WorkforceError::OverRelease { .. })));
        assert_eq!(pool.allocated(), 1);
    }

    proptest! {
        #[test]
        fn allocated_plus_available_is_total(ops in proptest::collection::vec((any::<bool>(), 0u32..6), 0..60)) {
            let mut pool = WorkforcePool::new(DEFAULT_TOTAL_WORKERS);
            for (take, n) in ops {
                let _ = if take { pool.allocate(n) } else { pool.release(n) };
                prop_assert!(pool.is_consistent());
                prop_assert_eq!(pool.allocated() + pool.available(), pool.total());
            }
        }
    }
}
