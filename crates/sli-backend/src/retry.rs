use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Jittered exponential backoff.
///
/// `max_attempts` counts every attempt including the first; `None` retries
/// until the caller cancels. The jittered delay never exceeds `max_delay_ms`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_pct: f64,
    pub max_attempts: Option<u32>,
}

impl BackoffPolicy {
    pub fn new(
        base_delay_ms: u64,
        max_delay_ms: u64,
        jitter_pct: f64,
        max_attempts: Option<u32>,
    ) -> Self {
        let base_delay_ms = base_delay_ms.max(1);
        Self {
            base_delay_ms,
            max_delay_ms: max_delay_ms.max(base_delay_ms),
            jitter_pct: jitter_pct.clamp(0.0, 1.0),
            max_attempts: max_attempts.map(|n| n.max(1)),
        }
    }

    /// Waiting for the frontier to close a ledger: 1s doubling to 15s, forever.
    pub fn frontier() -> Self {
        Self::new(1_000, 15_000, 0.2, None)
    }

    /// Transient network failures: 250ms doubling to 5s, five attempts.
    pub fn network() -> Self {
        Self::new(250, 5_000, 0.2, Some(5))
    }

    /// Whether another attempt may follow `attempts_made` failed ones.
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts_made < max)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.base_delay_ms.max(1)))
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms.max(1);
        let cap = self.max_delay_ms.max(base);
        let exp = 2_u64.saturating_pow(attempt);
        let delay = base.saturating_mul(exp).min(cap);

        let jitter_pct = self.jitter_pct.clamp(0.0, 1.0);
        let jittered = if jitter_pct > 0.0 {
            let spread = (delay as f64 * jitter_pct) as i64;
            let delta = rand::thread_rng().gen_range(-spread..=spread);
            delay.saturating_add_signed(delta).min(cap)
        } else {
            delay
        };
        Duration::from_millis(jittered.max(1))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::network()
    }
}
