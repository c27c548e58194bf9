//! The recurring scheduling loop.
//!
//! Each pass:
//! 1. Snapshots pending, queued and running jobs, queues and clusters
//! 2. Builds a fresh capacity ledger from each cluster's available capacity
//! 3. Orders pending jobs by priority
//! 4. For each job: checks queue limits, tries gang admission, and on a
//!    capacity deficit may plan a preemption
//! 5. Commits each decision through the provider, conditional on the
//!    version it observed
//!
//! Nothing is carried from one pass to the next.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use gantry_core::ResourceVector;
use gantry_state::{
    ComputeCluster, Job, JobKey, QueueConfig, SnapshotProvider, StateError, StateResult,
    Transition,
};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::admission::{AdmitOutcome, Admission, admit, admit_any};
use crate::config::SchedulerConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::ledger::CapacityLedger;
use crate::limits::QueueUsage;
use crate::preemption::{PreemptionPlan, may_preempt, plan_across};
use crate::priority::{PriorityTable, order_jobs};

/// Whether a pass writes its decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    Apply,
    /// Every commit is accepted without touching the provider.
    DryRun,
}

/// Why a pending job was left pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeferReason {
    QueueLimit { limit: String },
    NoEligibleCluster,
    /// Shortfall per eligible cluster.
    InsufficientCapacity {
        deficits: BTreeMap<String, ResourceVector>,
    },
    /// Preemption was allowed but no victim set covers the deficit.
    PreemptionUndershoot {
        deficits: BTreeMap<String, ResourceVector>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmittedJob {
    pub job: JobKey,
    pub cluster: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreemptedJob {
    pub victim: JobKey,
    pub preemptor: JobKey,
    pub cluster: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeferredJob {
    pub job: JobKey,
    pub reason: DeferReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedCommit {
    pub job: JobKey,
    /// True when the job changed since the snapshot.
    pub conflict: bool,
    pub error: String,
}

/// Outcome of one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub admitted: Vec<AdmittedJob>,
    pub preempted: Vec<PreemptedJob>,
    pub deferred: Vec<DeferredJob>,
    pub failed_commits: Vec<FailedCommit>,
    /// Jobs that used up their retries.
    pub ineligible: Vec<JobKey>,
    /// The pass stopped early because shutdown was requested.
    pub interrupted: bool,
}

impl PassReport {
    fn defer(&mut self, job: JobKey, reason: DeferReason) {
        debug!(job = %job, reason = ?reason, "job deferred");
        self.deferred.push(DeferredJob { job, reason });
    }

    fn commit_failed(&mut self, job: JobKey, err: StateError) {
        let conflict = err.is_conflict();
        if conflict {
            warn!(job = %job, error = %err, "commit conflict, job stays pending");
        } else {
            error!(job = %job, error = %err, "commit failed, job stays pending");
        }
        self.failed_commits.push(FailedCommit {
            job,
            conflict,
            error: err.to_string(),
        });
    }
}

/// Cluster state observed at the start of a pass.
struct Snapshot {
    pending: Vec<Job>,
    running: Vec<Job>,
    queued: Vec<Job>,
    queues: HashMap<String, QueueConfig>,
    /// Sorted by name.
    clusters: Vec<ComputeCluster>,
    ledger: CapacityLedger,
    table: PriorityTable,
}

/// Mutable state of one pass.
struct Pass<'a> {
    mode: CommitMode,
    shutdown: Option<&'a watch::Receiver<bool>>,
    ledger: CapacityLedger,
    usage: QueueUsage,
    preempted: HashSet<JobKey>,
    report: PassReport,
}

/// The scheduling engine.
///
/// Generic over its [`SnapshotProvider`] so the same engine runs against the
/// bundled redb store or any other source of cluster state.
pub struct Scheduler<P> {
    provider: P,
    config: SchedulerConfig,
}

impl<P: SnapshotProvider> Scheduler<P> {
    pub fn new(provider: P, config: SchedulerConfig) -> SchedulerResult<Self> {
        config.validate()?;
        Ok(Self { provider, config })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run one pass and commit its decisions.
    ///
    /// Stops committing as soon as `shutdown` reads `true`.
    pub fn run_pass(&self, shutdown: &watch::Receiver<bool>) -> SchedulerResult<PassReport> {
        self.pass(CommitMode::Apply, Some(shutdown))
    }

    /// Run one pass without writing anything.
    pub fn plan(&self) -> SchedulerResult<PassReport> {
        self.pass(CommitMode::DryRun, None)
    }

    /// Run passes every `config.interval` until `shutdown` fires.
    ///
    /// The first pass starts immediately. A pass that overruns the interval
    /// finishes and the missed ticks are skipped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            preemption = self.config.preemption_enabled,
            "scheduler started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    let started = Instant::now();
                    if let Err(e) = self.run_pass(&shutdown) {
                        error!(error = %e, "scheduling pass aborted");
                    }
                    let elapsed = started.elapsed();
                    if elapsed > self.config.interval {
                        warn!(
                            elapsed_ms = elapsed.as_millis() as u64,
                            interval_secs = self.config.interval.as_secs(),
                            "scheduling pass overran its interval"
                        );
                    }
                }
                _ = shutdown.changed() => {
                    break;
                }
            }
        }

        info!("scheduler shutting down");
    }

    fn snapshot(&self) -> SchedulerResult<Snapshot> {
        let pending = self.provider.list_pending_jobs()?;
        let running = self.provider.list_running_jobs()?;
        let queued = self.provider.list_queued_jobs()?;
        let queue_list = self.provider.list_queues()?;
        let mut clusters = self.provider.list_clusters()?;
        clusters.sort_by(|a, b| a.name.cmp(&b.name));

        let mut ledger = CapacityLedger::new();
        for cluster in &clusters {
            let available = self.provider.cluster_capacity(&cluster.name).map_err(|source| {
                SchedulerError::ClusterCapacity {
                    cluster: cluster.name.clone(),
                    source,
                }
            })?;
            ledger.insert_cluster(&cluster.name, available);
        }

        let table = PriorityTable::from_queues(&queue_list);
        let queues = queue_list.into_iter().map(|q| (q.name.clone(), q)).collect();

        Ok(Snapshot {
            pending,
            running,
            queued,
            queues,
            clusters,
            ledger,
            table,
        })
    }

    fn pass(
        &self,
        mode: CommitMode,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> SchedulerResult<PassReport> {
        let started = Instant::now();
        let snapshot = self.snapshot()?;
        let Snapshot {
            pending,
            running,
            queued,
            queues,
            clusters,
            ledger,
            table,
        } = snapshot;

        debug!(
            pending = pending.len(),
            running = running.len(),
            queued = queued.len(),
            clusters = clusters.len(),
            "snapshot taken"
        );

        let mut pass = Pass {
            mode,
            shutdown,
            ledger,
            usage: QueueUsage::from_jobs(queued.iter().chain(running.iter())),
            preempted: HashSet::new(),
            report: PassReport::default(),
        };

        for job in order_jobs(pending, &table) {
            if pass.shutdown.is_some_and(|rx| *rx.borrow()) {
                info!("shutdown requested, stopping pass");
                pass.report.interrupted = true;
                break;
            }
            self.schedule_job(&mut pass, &job, &clusters, &running, &queues, &table);
        }

        let report = pass.report;
        info!(
            admitted = report.admitted.len(),
            preempted = report.preempted.len(),
            deferred = report.deferred.len(),
            failed = report.failed_commits.len(),
            dry_run = mode == CommitMode::DryRun,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scheduling pass complete"
        );
        Ok(report)
    }

    fn schedule_job(
        &self,
        pass: &mut Pass<'_>,
        job: &Job,
        clusters: &[ComputeCluster],
        running: &[Job],
        queues: &HashMap<String, QueueConfig>,
        table: &PriorityTable,
    ) {
        let key = job.table_key();

        if job.is_exhausted() {
            warn!(job = %key, failures = job.failures, retries = job.retries, "job exhausted its retries");
            pass.report.ineligible.push(key);
            return;
        }

        let queue = queues.get(job.queue_name());
        if let Err(violation) = pass.usage.check(job, queue) {
            pass.report.defer(
                key,
                DeferReason::QueueLimit {
                    limit: violation.to_string(),
                },
            );
            return;
        }

        let deficits = match admit_any(job, clusters, &mut pass.ledger) {
            AdmitOutcome::Admitted { cluster, reserved } => {
                let transition = Transition::admit(job, &cluster);
                match self.commit(pass.mode, std::slice::from_ref(&transition)) {
                    Ok(()) => self.record_admission(pass, job, cluster),
                    Err(e) => {
                        pass.ledger.release(&cluster, &reserved);
                        pass.report.commit_failed(key, e);
                    }
                }
                return;
            }
            AdmitOutcome::NoEligibleCluster => {
                pass.report.defer(key, DeferReason::NoEligibleCluster);
                return;
            }
            AdmitOutcome::Blocked { deficits } => deficits.into_iter().collect::<BTreeMap<_, _>>(),
        };

        if !may_preempt(job, table, queue, &self.config) {
            pass.report
                .defer(key, DeferReason::InsufficientCapacity { deficits });
            return;
        }

        match plan_across(job, clusters, &pass.ledger, running, &pass.preempted, table) {
            Some(plan) => self.apply_preemption(pass, job, plan, deficits),
            None => pass
                .report
                .defer(key, DeferReason::PreemptionUndershoot { deficits }),
        }
    }

    /// Credit the victims back, re-admit the job and commit everything as
    /// one batch. Any failure restores the ledger.
    fn apply_preemption(
        &self,
        pass: &mut Pass<'_>,
        job: &Job,
        plan: PreemptionPlan,
        deficits: BTreeMap<String, ResourceVector>,
    ) {
        let key = job.table_key();
        let saved = pass.ledger.clone();

        pass.ledger.release(&plan.cluster, &plan.released);
        if let Admission::Deficit(still_short) = admit(job, &plan.cluster, &mut pass.ledger) {
            debug!(job = %key, cluster = %plan.cluster, %still_short, "re-admission after preemption failed");
            pass.ledger = saved;
            pass.report
                .defer(key, DeferReason::PreemptionUndershoot { deficits });
            return;
        }

        let mut batch: Vec<Transition> = plan.victims.iter().map(Transition::preempt).collect();
        batch.push(Transition::admit(job, &plan.cluster));

        if let Err(e) = self.commit(pass.mode, &batch) {
            pass.ledger = saved;
            pass.report.commit_failed(key, e);
            return;
        }

        for victim in &plan.victims {
            let victim_key = victim.table_key();
            info!(
                victim = %victim_key,
                preemptor = %key,
                cluster = %plan.cluster,
                "preempted lower-priority job"
            );
            pass.usage.forget(victim);
            pass.preempted.insert(victim_key.clone());
            pass.report.preempted.push(PreemptedJob {
                victim: victim_key,
                preemptor: key.clone(),
                cluster: plan.cluster.clone(),
            });
        }
        self.record_admission(pass, job, plan.cluster);
    }

    fn record_admission(&self, pass: &mut Pass<'_>, job: &Job, cluster: String) {
        let key = job.table_key();
        info!(
            job = %key,
            cluster = %cluster,
            replicas = job.replicas(),
            demand = %job.total_demand(),
            "job admitted"
        );
        pass.usage.record(job);
        pass.report.admitted.push(AdmittedJob { job: key, cluster });
    }

    fn commit(&self, mode: CommitMode, batch: &[Transition]) -> StateResult<()> {
        match (mode, batch) {
            (CommitMode::DryRun, _) => Ok(()),
            (CommitMode::Apply, [single]) => self.provider.commit_transition(single),
            (CommitMode::Apply, _) => self.provider.commit_batch(batch),
        }
    }
}
