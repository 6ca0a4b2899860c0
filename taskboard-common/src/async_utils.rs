//! Deadlines for calls that may hang.

use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Error from an operation wrapped in [`with_timeout`]
#[derive(Debug, Error)]
pub enum TimeoutError<E> {
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },
    #[error(transparent)]
    Operation(E),
}

impl<E> TimeoutError<E> {
    /// Check if the operation itself never completed
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Await `operation`, giving up once `limit` has elapsed. The operation's
/// own error is kept as [`TimeoutError::Operation`].
pub async fn with_timeout<T, E, F>(operation: F, limit: Duration) -> Result<T, TimeoutError<E>>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    timeout(limit, operation)
        .await
        .map_err(|_| TimeoutError::Timeout { duration: limit })?
        .map_err(TimeoutError::Operation)
}
