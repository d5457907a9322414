use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::BackoffPolicy;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backoff while a requested ledger is past the source frontier.
    pub frontier_backoff: BackoffPolicy,
    /// Backoff for transient source failures.
    pub unavailable_backoff: BackoffPolicy,
    /// Upper bound on a single source call.
    pub attempt_timeout_ms: u64,
}

impl BackendConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms.max(1))
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            frontier_backoff: BackoffPolicy::frontier(),
            unavailable_backoff: BackoffPolicy::network(),
            attempt_timeout_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = BackendConfig::default();
        assert_eq!(c.frontier_backoff.base_delay_ms, 1_000);
        assert_eq!(c.frontier_backoff.max_delay_ms, 15_000);
        assert!(c.frontier_backoff.max_attempts.is_none());
        assert_eq!(c.unavailable_backoff.max_attempts, Some(5));
        assert_eq!(c.attempt_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let c: BackendConfig = serde_json::from_str(
            r#"{ "attempt_timeout_ms": 500, "unavailable_backoff": { "max_attempts": 2 } }"#,
        )
        .unwrap();
        assert_eq!(c.attempt_timeout(), Duration::from_millis(500));
        assert_eq!(c.unavailable_backoff.max_attempts, Some(2));
        assert_eq!(c.unavailable_backoff.base_delay_ms, 250);
        assert_eq!(c.frontier_backoff, BackoffPolicy::frontier());
    }
}
