//! Domain types for the Gantry state store.
//!
//! These types represent the persisted state of jobs, queue policy and
//! compute clusters. All types are serializable to/from JSON for storage in
//! redb tables and for manifests.

use std::fmt;

use gantry_core::ResourceVector;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// `{namespace}/{name}` identity of a job.
pub type JobKey = String;

/// Queue used by jobs that do not name one.
pub const DEFAULT_QUEUE: &str = "default";

// ── Job ──────────────────────────────────────────────────────────

/// A unit of requested work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub namespace: String,
    pub name: String,
    /// Priority class name (`critical`, `high`, `medium`, `low`, or a
    /// queue-defined class). Anything that is not a string reads as empty.
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: String,
    /// Queue whose limits apply to this job.
    #[serde(default)]
    pub queue: Option<String>,
    /// Submitting user, for per-user concurrency caps.
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub gang: Option<GangSpec>,
    /// Resources required by each replica. A malformed map reads as empty.
    #[serde(default, deserialize_with = "lenient_demand")]
    pub demand: ResourceVector,
    #[serde(default)]
    pub preemptible: bool,
    /// Accelerator type the job must run on.
    #[serde(default)]
    pub cluster_selector: Option<String>,
    /// Resubmissions allowed after failure.
    #[serde(default)]
    pub retries: u32,
    /// Execution timeout enforced by the reconciler.
    #[serde(default)]
    pub timeout_secs: u64,
    /// Unix timestamp (seconds) when the job was submitted.
    #[serde(default)]
    pub created_at: u64,

    // Status
    #[serde(default)]
    pub phase: JobPhase,
    /// Executions started so far, maintained by the reconciler. Includes
    /// executions that ended in preemption.
    #[serde(default)]
    pub attempts: u32,
    /// Executions that ended in `Failed`, maintained by the reconciler.
    #[serde(default)]
    pub failures: u32,
    /// Cluster holding this job's reservation while Queued or Running.
    #[serde(default)]
    pub cluster: Option<String>,
    /// Unix timestamp (seconds) when the current execution started.
    #[serde(default)]
    pub started_at: Option<u64>,
    /// Optimistic-concurrency version, bumped by the store on every write.
    #[serde(default)]
    pub version: u64,
}

/// All-or-nothing replica requirement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GangSpec {
    pub enabled: bool,
    #[serde(default)]
    pub min_members: u32,
}

/// Lifecycle phase of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JobPhase {
    #[default]
    #[serde(alias = "")]
    Pending,
    Queued,
    Running,
    Preempted,
    Failed,
    Succeeded,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobPhase::Pending => "Pending",
            JobPhase::Queued => "Queued",
            JobPhase::Running => "Running",
            JobPhase::Preempted => "Preempted",
            JobPhase::Failed => "Failed",
            JobPhase::Succeeded => "Succeeded",
        };
        f.write_str(s)
    }
}

impl JobPhase {
    /// Phases that hold a capacity reservation.
    pub fn holds_reservation(self) -> bool {
        matches!(self, JobPhase::Queued | JobPhase::Running)
    }
}

impl Job {
    /// Build the composite key for the jobs table.
    pub fn table_key(&self) -> JobKey {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Replicas that must be admitted together. Gangs with `min_members = 0`
    /// degrade to a single replica.
    pub fn replicas(&self) -> u32 {
        match &self.gang {
            Some(gang) if gang.enabled => gang.min_members.max(1),
            _ => 1,
        }
    }

    /// Full demand across all replicas.
    pub fn total_demand(&self) -> ResourceVector {
        self.demand.scaled(self.replicas())
    }

    /// True when the job has failed more often than its retries allow.
    /// Preemption is not a failure and never counts here.
    pub fn is_exhausted(&self) -> bool {
        self.failures > self.retries
    }

    pub fn queue_name(&self) -> &str {
        self.queue.as_deref().unwrap_or(DEFAULT_QUEUE)
    }
}

fn lenient_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_demand<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<ResourceVector, D::Error> {
    Ok(demand_from_value(&Value::deserialize(deserializer)?))
}

/// Read a demand map, or nothing if any entry is not a non-negative integer.
pub(crate) fn demand_from_value(value: &Value) -> ResourceVector {
    let Value::Object(map) = value else {
        return ResourceVector::new();
    };
    let mut demand = ResourceVector::new();
    for (dim, qty) in map {
        match qty.as_u64() {
            Some(qty) => demand.set(dim, qty),
            None => return ResourceVector::new(),
        }
    }
    demand
}

// ── Queue ────────────────────────────────────────────────────────

/// Cluster-wide admission policy. Read-only to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct QueueConfig {
    pub name: String,
    #[serde(default)]
    pub priority_classes: Vec<PriorityClass>,
    /// Queued + Running jobs allowed at once (0 = unlimited).
    #[serde(default)]
    pub max_concurrent_jobs: u32,
    #[serde(default)]
    pub max_concurrent_per_user: u32,
    #[serde(default)]
    pub max_concurrent_per_namespace: u32,
    /// Cap on the aggregate demand of Queued + Running jobs.
    #[serde(default)]
    pub resource_quota: ResourceVector,
    #[serde(default)]
    pub preemption: PreemptionPolicy,
}

/// A named priority class with a relative weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriorityClass {
    pub name: String,
    pub weight: u32,
}

/// Whether jobs in a queue may preempt running work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PreemptionPolicy {
    #[default]
    Enabled,
    Disabled,
}

// ── Cluster ──────────────────────────────────────────────────────

/// A capacity source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ComputeCluster {
    pub name: String,
    /// Accelerator type offered by this cluster's nodes.
    #[serde(default)]
    pub accelerator: Option<String>,
    /// Total capacity per dimension.
    #[serde(default)]
    pub capacity: ResourceVector,
    /// Autoscaling bounds, consumed by an external autoscaler.
    #[serde(default)]
    pub min_nodes: u32,
    #[serde(default)]
    pub max_nodes: u32,
}

impl ComputeCluster {
    /// True when a job with the given accelerator selector may run here.
    pub fn matches_selector(&self, selector: Option<&str>) -> bool {
        match selector {
            None => true,
            Some(wanted) => self.accelerator.as_deref() == Some(wanted),
        }
    }
}
