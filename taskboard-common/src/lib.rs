//! # Taskboard Common
//!
//! Plumbing shared by the taskboard crates: error categories, retry with
//! backoff, request timeouts, validated configuration and YAML log
//! formatting.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

// Re-export main traits for convenience
pub use async_utils::{with_timeout, TimeoutError};
pub use config::ValidatedConfig;
pub use error::{CategorizedError, ErrorCategory};
pub use logging::Pretty;
pub use retry::{RetryConfig, RetryManager, RetryableError};
