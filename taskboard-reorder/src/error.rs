//! Error types for the board engine

use crate::types::{ColumnId, TaskId};
use taskboard_common::{CategorizedError, ErrorCategory, TimeoutError};
use thiserror::Error;

/// Result type for board operations
pub type Result<T> = std::result::Result<T, BoardError>;

/// Errors that can occur while loading, reconciling or resyncing a board
#[derive(Debug, Error)]
pub enum BoardError {
    /// No project has been loaded into the controller
    #[error("no project loaded")]
    NoProjectLoaded,

    /// Task not found
    #[error("task not found: {id}")]
    TaskNotFound { id: TaskId },

    /// Column not found
    #[error("column not found: {id}")]
    ColumnNotFound { id: ColumnId },

    /// The request never reached the server or the connection dropped
    #[error("{operation} failed: {message}")]
    Transport { operation: String, message: String },

    /// The server answered with an error status
    #[error("{operation} rejected with status {status}: {message}")]
    Rejected {
        operation: String,
        status: u16,
        message: String,
    },

    /// The request did not complete within the configured timeout
    #[error("{operation} timed out after {elapsed_ms}ms")]
    Timeout { operation: String, elapsed_ms: u64 },

    /// At least one call of an all-or-nothing column batch failed
    #[error("column batch failed ({failed} of {total} updates): {first}")]
    BatchFailed {
        failed: usize,
        total: usize,
        first: Box<BoardError>,
    },

    /// The board model no longer satisfies its invariants
    #[error("board invariant violated: {message}")]
    InvariantViolation { message: String },

    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// YAML configuration could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl BoardError {
    /// Create a transport error
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a server rejection error
    pub fn rejected(operation: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Create an invariant violation error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Flatten a timed-out API call into a board error
    pub fn from_timeout(operation: impl Into<String>, error: TimeoutError<BoardError>) -> Self {
        match error {
            TimeoutError::Timeout { duration } => Self::Timeout {
                operation: operation.into(),
                elapsed_ms: duration.as_millis() as u64,
            },
            TimeoutError::Operation(inner) => inner,
        }
    }
}

impl CategorizedError for BoardError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => ErrorCategory::External,
            Self::Rejected { status, .. } if *status >= 500 => ErrorCategory::External,
            Self::Rejected { .. } => ErrorCategory::User,
            Self::BatchFailed { first, .. } => first.category(),
            Self::NoProjectLoaded
            | Self::TaskNotFound { .. }
            | Self::ColumnNotFound { .. }
            | Self::Config { .. }
            | Self::Yaml(_) => ErrorCategory::User,
            Self::InvariantViolation { .. } => ErrorCategory::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NoProjectLoaded => "BOARD_NO_PROJECT",
            Self::TaskNotFound { .. } => "BOARD_TASK_NOT_FOUND",
            Self::ColumnNotFound { .. } => "BOARD_COLUMN_NOT_FOUND",
            Self::Transport { .. } => "BOARD_TRANSPORT",
            Self::Rejected { .. } => "BOARD_REJECTED",
            Self::Timeout { .. } => "BOARD_TIMEOUT",
            Self::BatchFailed { .. } => "BOARD_BATCH_FAILED",
            Self::InvariantViolation { .. } => "BOARD_INVARIANT",
            Self::Config { .. } => "BOARD_CONFIG",
            Self::Yaml(_) => "BOARD_YAML",
        }
    }
}
