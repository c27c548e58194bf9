//! The snapshot provider contract consumed by the scheduling engine.

use gantry_core::ResourceVector;
use serde::{Deserialize, Serialize};

use crate::error::StateResult;
use crate::types::{ComputeCluster, Job, JobKey, JobPhase, QueueConfig};

/// A conditional phase change for one job.
///
/// Applied only if the job is still in `from` at `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub job: JobKey,
    pub from: JobPhase,
    pub to: JobPhase,
    pub expected_version: u64,
    /// Cluster to bind the job to (set on admission).
    pub cluster: Option<String>,
}

impl Transition {
    /// `Pending → Queued`, binding the job to `cluster`.
    pub fn admit(job: &Job, cluster: &str) -> Self {
        Self {
            job: job.table_key(),
            from: job.phase,
            to: JobPhase::Queued,
            expected_version: job.version,
            cluster: Some(cluster.to_string()),
        }
    }

    /// `Running → Preempted`.
    pub fn preempt(job: &Job) -> Self {
        Self {
            job: job.table_key(),
            from: JobPhase::Running,
            to: JobPhase::Preempted,
            expected_version: job.version,
            cluster: None,
        }
    }
}

/// Source of cluster state for a scheduling pass, and sink for its decisions.
///
/// Reads may race with writes from the reconciliation layer; commits must be
/// conditional on the version observed at snapshot time.
pub trait SnapshotProvider: Send + Sync {
    /// Jobs in phase `Pending` (including the empty phase).
    fn list_pending_jobs(&self) -> StateResult<Vec<Job>>;

    /// Jobs in phase `Running`.
    fn list_running_jobs(&self) -> StateResult<Vec<Job>>;

    /// Jobs in phase `Queued` (admitted, not yet started).
    fn list_queued_jobs(&self) -> StateResult<Vec<Job>>;

    fn list_queues(&self) -> StateResult<Vec<QueueConfig>>;

    fn list_clusters(&self) -> StateResult<Vec<ComputeCluster>>;

    /// Capacity currently available on a cluster.
    fn cluster_capacity(&self, cluster: &str) -> StateResult<ResourceVector>;

    /// Apply one transition. Returns `StateError::Conflict` if the job moved.
    fn commit_transition(&self, transition: &Transition) -> StateResult<()>;

    /// Apply several transitions atomically: all of them or none.
    fn commit_batch(&self, transitions: &[Transition]) -> StateResult<()>;
}
