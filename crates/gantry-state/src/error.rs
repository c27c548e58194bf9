//! Error types for the Gantry state store.

use thiserror::Error;

use crate::types::JobPhase;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The record changed since it was observed.
    #[error(
        "conflict on {key}: expected {expected_phase} at version {expected_version}, \
         found {actual_phase} at version {actual_version}"
    )]
    Conflict {
        key: String,
        expected_phase: JobPhase,
        expected_version: u64,
        actual_phase: JobPhase,
        actual_version: u64,
    },
}

impl StateError {
    /// True for optimistic-concurrency rejections.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StateError::Conflict { .. })
    }
}
