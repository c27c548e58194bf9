//! Declarative manifests loaded into the state store by `gantryd apply`.
//!
//! ```toml
//! [[cluster]]
//! name = "a100-pool"
//! accelerator = "nvidia-a100"
//! capacity = { gpu = 64, cpu_millis = 512000 }
//!
//! [[queue]]
//! name = "research"
//! max_concurrent_per_user = 4
//!
//! [[job]]
//! namespace = "ml"
//! name = "pretrain"
//! priority = "high"
//! queue = "research"
//! demand = { gpu = 8 }
//! gang = { enabled = true, min_members = 4 }
//! ```

use std::path::Path;

use anyhow::Context;
use gantry_state::{ComputeCluster, Job, QueueConfig, StateStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    #[serde(rename = "cluster")]
    pub clusters: Vec<ComputeCluster>,
    #[serde(rename = "queue")]
    pub queues: Vec<QueueConfig>,
    #[serde(rename = "job")]
    pub jobs: Vec<Job>,
}

/// What an apply wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub clusters: usize,
    pub queues: usize,
    pub jobs_created: usize,
    pub jobs_updated: usize,
}

impl Manifest {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Upsert everything into `store`.
    ///
    /// Existing jobs keep their lifecycle state and submission time; only
    /// their definition is replaced. New jobs without a `created_at` are stamped
    /// with `now`.
    pub fn apply(&self, store: &StateStore, now: u64) -> anyhow::Result<ApplySummary> {
        let mut summary = ApplySummary::default();

        for cluster in &self.clusters {
            store.put_cluster(cluster)?;
            debug!(cluster = %cluster.name, capacity = %cluster.capacity, "cluster applied");
            summary.clusters += 1;
        }

        for queue in &self.queues {
            store.put_queue(queue)?;
            debug!(queue = %queue.name, "queue applied");
            summary.queues += 1;
        }

        for job in &self.jobs {
            let key = job.table_key();
            let mut next = job.clone();
            match store.get_job(&key)? {
                Some(existing) => {
                    next.phase = existing.phase;
                    next.attempts = existing.attempts;
                    next.failures = existing.failures;
                    next.cluster = existing.cluster;
                    next.started_at = existing.started_at;
                    next.created_at = existing.created_at;
                    next.version = existing.version;
                    summary.jobs_updated += 1;
                }
                None => {
                    if next.created_at == 0 {
                        next.created_at = now;
                    }
                    summary.jobs_created += 1;
                }
            }
            let version = store.put_job(&next)?;
            debug!(job = %key, version, "job applied");
        }

        info!(
            clusters = summary.clusters,
            queues = summary.queues,
            jobs_created = summary.jobs_created,
            jobs_updated = summary.jobs_updated,
            "manifest applied"
        );
        Ok(summary)
    }
}
