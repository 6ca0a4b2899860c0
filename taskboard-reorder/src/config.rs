//! Engine configuration

use crate::error::{BoardError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use taskboard_common::retry::duration_ms;
use taskboard_common::{RetryConfig, ValidatedConfig};

/// Tunables for the reconciliation path.
///
/// ```yaml
/// request_timeout_ms: 5000
/// event_capacity: 32
/// resync:
///   max_retries: 2
///   initial_delay_ms: 100
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Upper bound for any single API call
    #[serde(rename = "request_timeout_ms", with = "duration_ms")]
    pub request_timeout: Duration,
    /// Backoff policy for the full resync fetch
    pub resync: RetryConfig,
    /// Buffered events per subscriber before it starts lagging
    pub event_capacity: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            resync: RetryConfig::default(),
            event_capacity: 64,
        }
    }
}

impl BoardConfig {
    /// Parse and validate a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_resync(mut self, resync: RetryConfig) -> Self {
        self.resync = resync;
        self
    }
}

impl ValidatedConfig for BoardConfig {
    type Error = BoardError;

    fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(BoardError::config("request_timeout_ms must be greater than 0"));
        }
        if self.event_capacity == 0 {
            return Err(BoardError::config("event_capacity must be greater than 0"));
        }
        if self.resync.backoff_multiplier < 1.0 {
            return Err(BoardError::config(format!(
                "resync.backoff_multiplier must be at least 1.0, got {}",
                self.resync.backoff_multiplier
            )));
        }
        if self.resync.initial_delay > self.resync.max_delay {
            return Err(BoardError::config(
                "resync.initial_delay_ms must not exceed resync.max_delay_ms",
            ));
        }
        Ok(())
    }

    fn description() -> &'static str {
        "Board reconciliation timeouts, resync backoff and event buffering"
    }
}
