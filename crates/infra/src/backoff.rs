//! Randomized exponential backoff ("full jitter").

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Computes how long to wait before retrying a failed transfer.
///
/// The wait for attempt `n` (0-indexed) is drawn uniformly from
/// `[0, min(cap, base * 2^n)]`. Drawing from zero rather than adding a small
/// jitter on top of the exponential keeps many workers that failed together
/// from retrying together.
///
/// The policy only computes durations; the caller decides how to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay ceiling for attempt 0.
    pub base: Duration,
    /// Upper bound for any single delay.
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            cap: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// A policy that never waits. Useful in tests.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Upper bound of the delay for `attempt`: `min(cap, base * 2^attempt)`.
    ///
    /// Saturates at `cap` instead of overflowing for large attempts.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u128.checked_shl(attempt).unwrap_or(u128::MAX);
        let nanos = self
            .base
            .as_nanos()
            .saturating_mul(factor)
            .min(self.cap.as_nanos());
        u64::try_from(nanos).map_or(self.cap, Duration::from_nanos)
    }

    /// Draw a delay for `attempt` using the thread-local RNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    /// Draw a delay for `attempt` from the given RNG.
    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let ceiling = self.ceiling(attempt).as_nanos().min(u64::MAX as u128) as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rng.gen_range(0..=ceiling))
    }
}
