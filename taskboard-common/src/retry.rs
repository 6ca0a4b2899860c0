//! Retry with exponential backoff.
//!
//! Only errors that report themselves as retriable are tried again; anything
//! else is returned after the first attempt.

use crate::error::CategorizedError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff policy. In YAML, delays are integer milliseconds:
///
/// ```yaml
/// max_retries: 3
/// initial_delay_ms: 250
/// backoff_multiplier: 2.0
/// max_delay_ms: 5000
/// use_jitter: true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts after the first one; `0` disables retrying
    pub max_retries: u32,
    #[serde(rename = "initial_delay_ms", with = "duration_ms")]
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    /// Cap applied after jitter
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    pub max_delay: Duration,
    /// Add up to a quarter of the delay at random
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            use_jitter: true,
        }
    }
}

/// Decides whether a failed attempt is worth repeating
pub trait RetryableError: std::error::Error + Send + Sync {
    fn is_retriable(&self) -> bool;
}

impl<T: CategorizedError> RetryableError for T {
    fn is_retriable(&self) -> bool {
        CategorizedError::is_retriable(self)
    }
}

/// Sleeps between attempts: `initial_delay`, then multiplied each time,
/// never above `max_delay`.
#[derive(Debug, Clone)]
struct Backoff<'a> {
    config: &'a RetryConfig,
    next: Duration,
}

impl<'a> Backoff<'a> {
    fn new(config: &'a RetryConfig) -> Self {
        Self {
            config,
            next: config.initial_delay,
        }
    }
}

impl Iterator for Backoff<'_> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let base = self.next;
        self.next = base
            .mul_f64(self.config.backoff_multiplier.max(1.0))
            .min(self.config.max_delay);

        let jitter = if self.config.use_jitter {
            base.mul_f64(0.25 * jitter_fraction())
        } else {
            Duration::ZERO
        };
        Some((base + jitter).min(self.config.max_delay))
    }
}

/// Runs async operations under a [`RetryConfig`]
#[derive(Debug, Clone, Default)]
pub struct RetryManager {
    config: RetryConfig,
}

impl RetryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Call `operation` until it succeeds, fails with a non-retriable error,
    /// or `max_retries` extra attempts have been spent. The last error is
    /// returned.
    pub async fn retry<F, Fut, T, E>(&self, operation_name: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + std::fmt::Display,
    {
        let mut delays = Backoff::new(&self.config);
        let mut attempt: u32 = 1;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !error.is_retriable() {
                warn!(operation = operation_name, attempt, %error, "not retriable, giving up");
                return Err(error);
            }
            if attempt > self.config.max_retries {
                warn!(operation = operation_name, attempt, %error, "out of retries");
                return Err(error);
            }

            let delay = delays.next().unwrap_or(self.config.max_delay);
            warn!(operation = operation_name, attempt, %error, ?delay, "attempt failed, backing off");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Cheap pseudo-random value in `[0, 1)` for jitter; not for anything that
/// needs real randomness.
fn jitter_fraction() -> f64 {
    use std::sync::atomic::{AtomicU64, Ordering};

    static STATE: AtomicU64 = AtomicU64::new(0x9E37_79B9_7F4A_7C15);

    // xorshift64
    let mut x = STATE.load(Ordering::Relaxed);
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    STATE.store(x, Ordering::Relaxed);

    (x >> 11) as f64 / (1u64 << 53) as f64
}

/// Serde adapter storing a `Duration` as integer milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
