//! Priority ordering.
//!
//! Pending jobs are totally ordered by:
//! 1. Priority weight, highest first
//! 2. Creation time, oldest first (FIFO within a class)
//! 3. `namespace/name`, so the order never depends on input order

use std::cmp::Ordering;
use std::collections::HashMap;

use gantry_state::{Job, QueueConfig};
use tracing::debug;

pub const WEIGHT_CRITICAL: u32 = 3;
pub const WEIGHT_HIGH: u32 = 3;
pub const WEIGHT_MEDIUM: u32 = 2;
pub const WEIGHT_LOW: u32 = 1;

/// Weight of a builtin class, if `name` is exactly one.
pub fn builtin_weight(name: &str) -> Option<u32> {
    match name {
        "critical" => Some(WEIGHT_CRITICAL),
        "high" => Some(WEIGHT_HIGH),
        "medium" => Some(WEIGHT_MEDIUM),
        "low" => Some(WEIGHT_LOW),
        _ => None,
    }
}

/// Resolves priority class names to weights.
///
/// Builtin classes always resolve to their fixed weights. Queues may define
/// additional classes; unknown or empty names resolve to `low`.
#[derive(Debug, Clone, Default)]
pub struct PriorityTable {
    custom: HashMap<String, u32>,
}

impl PriorityTable {
    /// Table with only the builtin classes.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Collect custom classes from queue configs, visiting queues by name.
    /// The first queue to define a class wins.
    pub fn from_queues(queues: &[QueueConfig]) -> Self {
        let mut sorted: Vec<&QueueConfig> = queues.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut custom = HashMap::new();
        for queue in sorted {
            for class in &queue.priority_classes {
                if builtin_weight(&class.name).is_some() {
                    debug!(queue = %queue.name, class = %class.name, "ignoring override of builtin priority class");
                    continue;
                }
                custom.entry(class.name.clone()).or_insert(class.weight.max(WEIGHT_LOW));
            }
        }
        Self { custom }
    }

    pub fn weight(&self, name: &str) -> u32 {
        builtin_weight(name)
            .or_else(|| self.custom.get(name).copied())
            .unwrap_or(WEIGHT_LOW)
    }

    pub fn job_weight(&self, job: &Job) -> u32 {
        self.weight(&job.priority)
    }
}

/// Scheduling order between two jobs.
pub fn compare_jobs(a: &Job, b: &Job, table: &PriorityTable) -> Ordering {
    table
        .job_weight(b)
        .cmp(&table.job_weight(a))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.namespace.cmp(&b.namespace))
        .then_with(|| a.name.cmp(&b.name))
}

/// Return `jobs` in scheduling order.
pub fn order_jobs(mut jobs: Vec<Job>, table: &PriorityTable) -> Vec<Job> {
    jobs.sort_by(|a, b| compare_jobs(a, b, table));
    jobs
}
