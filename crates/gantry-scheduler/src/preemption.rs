//! Preemption planning.
//!
//! When a high-priority job cannot be admitted, look for running,
//! preemptible, strictly lower-priority jobs on the same cluster whose
//! release would cover the deficit. Victims are taken lowest weight first,
//! then most recently started, then by key.
//!
//! A plan is all-or-nothing: if the candidates cannot cover the full
//! deficit no plan is returned and nothing is touched.

use std::cmp::Ordering;
use std::collections::HashSet;

use gantry_core::ResourceVector;
use gantry_state::{ComputeCluster, Job, JobKey, PreemptionPolicy, QueueConfig};
use tracing::debug;

use crate::admission::eligible_clusters;
use crate::config::SchedulerConfig;
use crate::ledger::CapacityLedger;
use crate::priority::PriorityTable;

/// Victims whose release lets a blocked job fit on `cluster`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreemptionPlan {
    pub cluster: String,
    /// In selection order.
    pub victims: Vec<Job>,
    /// Total capacity the victims give back.
    pub released: ResourceVector,
}

/// Whether a blocked job may preempt at all.
pub fn may_preempt(
    job: &Job,
    table: &PriorityTable,
    queue: Option<&QueueConfig>,
    config: &SchedulerConfig,
) -> bool {
    if !config.preemption_enabled {
        return false;
    }
    if queue.is_some_and(|q| q.preemption == PreemptionPolicy::Disabled) {
        return false;
    }
    table.job_weight(job) >= config.preemption_min_weight
}

/// Victim order: lowest weight, then newest start, then key.
fn compare_victims(a: &Job, b: &Job, table: &PriorityTable) -> Ordering {
    table
        .job_weight(a)
        .cmp(&table.job_weight(b))
        .then_with(|| b.started_at.unwrap_or(0).cmp(&a.started_at.unwrap_or(0)))
        .then_with(|| a.table_key().cmp(&b.table_key()))
}

/// Running jobs on `cluster` that a job of `weight` may preempt, in the
/// order they would be chosen.
pub fn candidates<'a>(
    weight: u32,
    cluster: &str,
    running: &'a [Job],
    excluded: &HashSet<JobKey>,
    table: &PriorityTable,
) -> Vec<&'a Job> {
    let mut found: Vec<&Job> = running
        .iter()
        .filter(|r| r.preemptible)
        .filter(|r| r.cluster.as_deref() == Some(cluster))
        .filter(|r| table.job_weight(r) < weight)
        .filter(|r| !excluded.contains(&r.table_key()))
        .collect();
    found.sort_by(|a, b| compare_victims(a, b, table));
    found
}

/// Pick victims on one cluster until `deficit` is covered on every
/// dimension.
///
/// Candidates that free nothing on a dimension still short are skipped.
pub fn plan_preemption(
    job: &Job,
    cluster: &str,
    deficit: &ResourceVector,
    running: &[Job],
    excluded: &HashSet<JobKey>,
    table: &PriorityTable,
) -> Option<PreemptionPlan> {
    if deficit.is_zero() {
        return None;
    }

    let weight = table.job_weight(job);
    let mut remaining = deficit.clone();
    let mut released = ResourceVector::new();
    let mut victims = Vec::new();

    for candidate in candidates(weight, cluster, running, excluded, table) {
        let frees = candidate.total_demand();
        let helps = remaining
            .iter()
            .any(|(dimension, short)| short > 0 && frees.get(dimension) > 0);
        if !helps {
            continue;
        }

        remaining.saturating_sub_assign(&frees);
        released.add_assign(&frees);
        victims.push(candidate.clone());

        if remaining.is_zero() {
            debug!(
                job = %job.table_key(),
                cluster = %cluster,
                victims = victims.len(),
                %released,
                "preemption covers deficit"
            );
            return Some(PreemptionPlan {
                cluster: cluster.to_string(),
                victims,
                released,
            });
        }
    }

    debug!(
        job = %job.table_key(),
        cluster = %cluster,
        still_short = %remaining,
        "preemption cannot cover deficit"
    );
    None
}

/// Try each eligible cluster in order and return the first covering plan.
///
/// The deficit on each cluster is recomputed from `ledger`, so reservations
/// made earlier in the pass are respected.
pub fn plan_across(
    job: &Job,
    clusters: &[ComputeCluster],
    ledger: &CapacityLedger,
    running: &[Job],
    excluded: &HashSet<JobKey>,
    table: &PriorityTable,
) -> Option<PreemptionPlan> {
    let required = job.total_demand();
    eligible_clusters(job, clusters).find_map(|cluster| {
        let deficit = ledger.deficit(&cluster.name, &required);
        plan_preemption(job, &cluster.name, &deficit, running, excluded, table)
    })
}
