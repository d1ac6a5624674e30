//! Error types for covpool
//!
//! This module defines the error hierarchy for the coordination core:
//! - Configuration and validation errors
//! - Worker thread lifecycle errors
//! - Task execution errors (what task bodies return)
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include context about what to do
//! - Preserve error chains for debugging

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type surfaced by the pool
#[derive(Error, Debug)]
pub enum PoolError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker thread lifecycle errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// A task body returned an error
    #[error("Task failed on worker {worker}: {source}")]
    TaskFailed {
        worker: usize,
        #[source]
        source: TaskError,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Scratch parent directory does not exist or is not a directory
    #[error("Scratch root '{path}' is not an existing directory")]
    InvalidScratchRoot { path: PathBuf },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker thread could not be spawned
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Worker could not create its scratch directory
    #[error("Failed to create scratch directory for worker {id}: {source}")]
    ScratchFailed {
        id: usize,
        #[source]
        source: std::io::Error,
    },

    /// A task body panicked; the panic was contained on the worker
    #[error("Worker {id} caught a panic: {message}")]
    Panicked { id: usize, message: String },

    /// Task queue closed while the pool still expected to use it
    #[error("Task queue closed unexpectedly")]
    QueueClosed,
}

/// Errors returned by task bodies
///
/// Task bodies typically shell out to an external tool and parse its
/// output; anything that goes wrong ends up here. The pool captures the
/// first of these and replays it from [`WorkerPool::wait`].
///
/// [`WorkerPool::wait`]: crate::WorkerPool::wait
#[derive(Error, Debug)]
pub enum TaskError {
    /// I/O error (file operations, spawning the external tool, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Free-form failure description
    #[error("{0}")]
    Message(String),

    /// Any other error source a task wants to propagate
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    /// Build a [`TaskError::Message`] from anything displayable
    pub fn msg(message: impl Into<String>) -> Self {
        TaskError::Message(message.into())
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        TaskError::Message(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        TaskError::Message(message.to_string())
    }
}

/// Result type alias for PoolError
pub type Result<T> = std::result::Result<T, PoolError>;

/// Result type returned by task bodies
pub type TaskResult = std::result::Result<(), TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let config_err = ConfigError::InvalidWorkerCount { count: 0, max: 512 };
        let pool_err: PoolError = config_err.into();
        assert!(matches!(pool_err, PoolError::Config(_)));
    }

    #[test]
    fn test_task_error_from_str() {
        let err: TaskError = "gcov exited with status 1".into();
        assert_eq!(err.to_string(), "gcov exited with status 1");
    }

    #[test]
    fn test_task_failure_preserves_source() {
        use std::error::Error;

        let failure = PoolError::TaskFailed {
            worker: 3,
            source: TaskError::msg("parse error"),
        };
        assert!(failure.source().is_some());
        assert!(failure.to_string().contains("worker 3"));
    }
}
