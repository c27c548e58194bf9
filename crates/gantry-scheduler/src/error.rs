//! Scheduler error types.

use thiserror::Error;

/// Errors that abort a scheduling pass or reject a configuration.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid scheduler config: {0}")]
    InvalidConfig(String),

    #[error("snapshot of cluster {cluster} failed: {source}")]
    ClusterCapacity {
        cluster: String,
        #[source]
        source: gantry_state::StateError,
    },

    #[error("state store error: {0}")]
    State(#[from] gantry_state::StateError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
