//! Error types for blobsize
//!
//! This module defines the error hierarchy for the size engine:
//! - Storage listing errors (transient vs. fatal classification)
//! - Configuration errors
//! - Worker/concurrency errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include context about what to do
//! - A fatal error in one worker surfaces as a single error from the
//!   coordinator; nothing calls a process-terminating primitive

use thiserror::Error;

/// Top-level error type for the size engine
#[derive(Error, Debug)]
pub enum SizerError {
    /// Storage listing errors
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (catalog files, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Computation cancelled before completion
    #[error("size computation interrupted before completion")]
    Interrupted,
}

/// Errors from the storage listing API
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Transient failure (network, timeout) - eligible for retry
    #[error("transient storage failure during {operation}: {reason}")]
    Transient { operation: String, reason: String },

    /// The named container does not exist
    #[error("container not found: '{name}'")]
    ContainerNotFound { name: String },

    /// The provider returned a cursor it no longer recognizes
    #[error("invalid listing cursor '{cursor}' for {operation}")]
    InvalidCursor { operation: String, cursor: String },

    /// Retry budget exhausted for a single page fetch
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },
}

impl StorageError {
    /// Check if this error may succeed on retry
    ///
    /// Only transient failures are retried; a missing container or a bad
    /// cursor will not heal itself and fails the computation immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient { .. })
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid retry budget
    #[error("invalid retry attempts {attempts}: must be between 1 and {max}")]
    InvalidRetryAttempts { attempts: u32, max: u32 },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker thread could not be spawned
    #[error("failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Worker panicked
    #[error("worker {id} panicked")]
    Panicked { id: usize },

    /// Work queue rejected a submission
    #[error("failed to submit work item: queue closed")]
    QueueClosed,

    /// Event channel closed while workers were still owed signals
    #[error("event channel closed with {missing} worker exit signals outstanding")]
    EventChannelClosed { missing: usize },
}

/// Result type alias for SizerError
pub type Result<T> = std::result::Result<T, SizerError>;

/// Result type alias for StorageError
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let transient = StorageError::Transient {
            operation: "list_blobs".into(),
            reason: "connection reset".into(),
        };
        assert!(transient.is_transient());

        let not_found = StorageError::ContainerNotFound {
            name: "missing".into(),
        };
        assert!(!not_found.is_transient());

        let exhausted = StorageError::RetriesExhausted {
            operation: "list_containers".into(),
            attempts: 3,
            last_error: "timeout".into(),
        };
        assert!(!exhausted.is_transient());
    }

    #[test]
    fn test_error_conversion() {
        let storage = StorageError::ContainerNotFound {
            name: "vault".into(),
        };
        let sizer: SizerError = storage.into();
        assert!(matches!(sizer, SizerError::Storage(_)));
    }
}
