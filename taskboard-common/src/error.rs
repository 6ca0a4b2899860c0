//! Error categories.
//!
//! Every error enum in the workspace reports where it came from. The retry
//! manager only retries [`ErrorCategory::External`] and
//! [`ErrorCategory::System`]; everything else fails fast.

use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The request itself was wrong: unknown id, rejected input, bad config
    User,
    /// Local environment trouble that may clear up
    System,
    /// A broken invariant in our own code
    Internal,
    /// The server or the network between us
    External,
}

impl ErrorCategory {
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorCategory::System | ErrorCategory::External)
    }
}

pub trait CategorizedError: std::error::Error + Send + Sync + Debug {
    fn category(&self) -> ErrorCategory;

    /// Stable, machine-readable code, e.g. `BOARD_TIMEOUT`
    fn error_code(&self) -> &'static str;

    fn is_user_error(&self) -> bool {
        self.category() == ErrorCategory::User
    }

    /// Whether trying the same request again could succeed
    fn is_retriable(&self) -> bool {
        self.category().is_transient()
    }

    /// One-line text for a transient notice shown to the user
    fn user_friendly_message(&self) -> String {
        let prefix = match self.category() {
            ErrorCategory::User => "Change rejected",
            ErrorCategory::System => "Local error",
            ErrorCategory::External => "Server unavailable",
            ErrorCategory::Internal => "Unexpected error",
        };
        format!("{}: {}", prefix, self)
    }
}
