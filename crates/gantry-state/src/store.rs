//! redb-backed state persistence for Gantry.
//!
//! Provides typed CRUD operations over jobs, queues and clusters, plus the
//! conditional transitions the scheduler commits. All values are
//! JSON-serialized into redb's `&[u8]` value columns. The store supports
//! both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use gantry_core::ResourceVector;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::provider::{SnapshotProvider, Transition};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(JOBS).map_err(map_err!(Table))?;
        txn.open_table(QUEUES).map_err(map_err!(Table))?;
        txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Generic helpers ────────────────────────────────────────────

    fn put_value<T: Serialize>(&self, table: JsonTable, key: &str, value: &T) -> StateResult<()> {
        let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get_value<T: DeserializeOwned>(&self, table: JsonTable, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// List every decodable record in a table.
    ///
    /// Records that fail to decode are logged and skipped so that one bad
    /// entry cannot hide the rest of the table from a scheduling pass.
    fn list_values<T: DeserializeOwned>(&self, table: JsonTable) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            match serde_json::from_slice(value.value()) {
                Ok(record) => results.push(record),
                Err(e) => warn!(key = %key.value(), error = %e, "skipping undecodable record"),
            }
        }
        Ok(results)
    }

    fn delete_value(&self, table: JsonTable, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    // ── Jobs ───────────────────────────────────────────────────────

    /// Insert or update a job. Returns the version assigned to the record.
    pub fn put_job(&self, job: &Job) -> StateResult<u64> {
        let key = job.table_key();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let version;
        {
            let mut table = txn.open_table(JOBS).map_err(map_err!(Table))?;
            let previous = match table.get(key.as_str()).map_err(map_err!(Read))? {
                Some(guard) => serde_json::from_slice::<Job>(guard.value())
                    .map(|j| j.version)
                    .unwrap_or(0),
                None => 0,
            };
            version = previous.max(job.version) + 1;

            let mut stored = job.clone();
            stored.version = version;
            let bytes = serde_json::to_vec(&stored).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, version, "job stored");
        Ok(version)
    }

    /// Get a job by `namespace/name` key.
    pub fn get_job(&self, key: &str) -> StateResult<Option<Job>> {
        self.get_value(JOBS, key)
    }

    /// List all jobs.
    pub fn list_jobs(&self) -> StateResult<Vec<Job>> {
        self.list_values(JOBS)
    }

    /// List jobs currently in `phase`.
    pub fn list_jobs_in_phase(&self, phase: JobPhase) -> StateResult<Vec<Job>> {
        let mut jobs = self.list_jobs()?;
        jobs.retain(|j| j.phase == phase);
        Ok(jobs)
    }

    /// Delete a job by key. Returns true if it existed.
    pub fn delete_job(&self, key: &str) -> StateResult<bool> {
        let existed = self.delete_value(JOBS, key)?;
        debug!(%key, existed, "job deleted");
        Ok(existed)
    }

    // ── Queues ─────────────────────────────────────────────────────

    pub fn put_queue(&self, queue: &QueueConfig) -> StateResult<()> {
        self.put_value(QUEUES, &queue.name, queue)
    }

    pub fn get_queue(&self, name: &str) -> StateResult<Option<QueueConfig>> {
        self.get_value(QUEUES, name)
    }

    pub fn list_queues(&self) -> StateResult<Vec<QueueConfig>> {
        self.list_values(QUEUES)
    }

    pub fn delete_queue(&self, name: &str) -> StateResult<bool> {
        self.delete_value(QUEUES, name)
    }

    // ── Clusters ───────────────────────────────────────────────────

    pub fn put_cluster(&self, cluster: &ComputeCluster) -> StateResult<()> {
        self.put_value(CLUSTERS, &cluster.name, cluster)
    }

    pub fn get_cluster(&self, name: &str) -> StateResult<Option<ComputeCluster>> {
        self.get_value(CLUSTERS, name)
    }

    pub fn list_clusters(&self) -> StateResult<Vec<ComputeCluster>> {
        self.list_values(CLUSTERS)
    }

    pub fn delete_cluster(&self, name: &str) -> StateResult<bool> {
        self.delete_value(CLUSTERS, name)
    }

    /// Capacity of `cluster` not reserved by its Queued or Running jobs.
    pub fn available_capacity(&self, cluster: &str) -> StateResult<ResourceVector> {
        let record = self
            .get_cluster(cluster)?
            .ok_or_else(|| StateError::NotFound(cluster.to_string()))?;

        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(JOBS).map_err(map_err!(Table))?;
        let mut reserved = ResourceVector::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let held = match serde_json::from_slice::<Job>(value.value()) {
                Ok(job) => (job.phase.holds_reservation() && job.cluster.as_deref() == Some(cluster))
                    .then(|| job.total_demand()),
                Err(e) => {
                    let raw: Value = serde_json::from_slice(value.value()).map_err(|_| {
                        StateError::Deserialize(format!("job record {} is not JSON: {e}", key.value()))
                    })?;
                    let held = raw_reservation(&raw, cluster);
                    if let Some(demand) = &held {
                        warn!(key = %key.value(), error = %e, %demand, "counting reservation of undecodable job");
                    }
                    held
                }
            };
            if let Some(demand) = held {
                reserved.add_assign(&demand);
            }
        }
        Ok(record.capacity.saturating_sub(&reserved))
    }

    // ── Transitions ────────────────────────────────────────────────

    /// Apply transitions in a single write transaction.
    ///
    /// Every transition is checked before anything is written; the first
    /// mismatch aborts the whole transaction.
    pub fn apply_transitions(&self, transitions: &[Transition]) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(JOBS).map_err(map_err!(Table))?;

            let mut updated = Vec::with_capacity(transitions.len());
            for t in transitions {
                let current: Job = match table.get(t.job.as_str()).map_err(map_err!(Read))? {
                    Some(guard) => {
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                    }
                    None => return Err(StateError::NotFound(t.job.clone())),
                };

                if current.phase != t.from || current.version != t.expected_version {
                    return Err(StateError::Conflict {
                        key: t.job.clone(),
                        expected_phase: t.from,
                        expected_version: t.expected_version,
                        actual_phase: current.phase,
                        actual_version: current.version,
                    });
                }

                let mut next = current;
                next.phase = t.to;
                if let Some(cluster) = &t.cluster {
                    next.cluster = Some(cluster.clone());
                }
                next.version += 1;
                updated.push(next);
            }

            for job in &updated {
                let bytes = serde_json::to_vec(job).map_err(map_err!(Serialize))?;
                table
                    .insert(job.table_key().as_str(), bytes.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(count = transitions.len(), "transitions committed");
        Ok(())
    }
}

/// Reservation a job record holds on `cluster`, read field by field.
///
/// Used for records that no longer decode as a [`Job`], so that their
/// capacity is never handed out twice.
fn raw_reservation(raw: &Value, cluster: &str) -> Option<ResourceVector> {
    let holds = matches!(raw.get("phase").and_then(Value::as_str), Some("Queued" | "Running"));
    if !holds || raw.get("cluster").and_then(Value::as_str) != Some(cluster) {
        return None;
    }
    let gang: Option<GangSpec> = raw
        .get("gang")
        .and_then(|g| serde_json::from_value(g.clone()).ok());
    let replicas = match gang {
        Some(gang) if gang.enabled => gang.min_members.max(1),
        _ => 1,
    };
    let demand = raw.get("demand").map(demand_from_value).unwrap_or_default();
    Some(demand.scaled(replicas))
}

impl SnapshotProvider for StateStore {
    fn list_pending_jobs(&self) -> StateResult<Vec<Job>> {
        self.list_jobs_in_phase(JobPhase::Pending)
    }

    fn list_running_jobs(&self) -> StateResult<Vec<Job>> {
        self.list_jobs_in_phase(JobPhase::Running)
    }

    fn list_queued_jobs(&self) -> StateResult<Vec<Job>> {
        self.list_jobs_in_phase(JobPhase::Queued)
    }

    fn list_queues(&self) -> StateResult<Vec<QueueConfig>> {
        StateStore::list_queues(self)
    }

    fn list_clusters(&self) -> StateResult<Vec<ComputeCluster>> {
        StateStore::list_clusters(self)
    }

    fn cluster_capacity(&self, cluster: &str) -> StateResult<ResourceVector> {
        self.available_capacity(cluster)
    }

    fn commit_transition(&self, transition: &Transition) -> StateResult<()> {
        self.apply_transitions(std::slice::from_ref(transition))
    }

    fn commit_batch(&self, transitions: &[Transition]) -> StateResult<()> {
        self.apply_transitions(transitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpus(n: u64) -> ResourceVector {
        ResourceVector::new().with("gpu", n)
    }

    fn test_job(namespace: &str, name: &str) -> Job {
        Job {
            namespace: namespace.to_string(),
            name: name.to_string(),
            priority: "medium".to_string(),
            queue: None,
            owner: Some("alice".to_string()),
            gang: None,
            demand: gpus(1),
            preemptible: true,
            cluster_selector: None,
            retries: 3,
            timeout_secs: 3600,
            created_at: 1000,
            phase: JobPhase::Pending,
            attempts: 0,
            failures: 0,
            cluster: None,
            started_at: None,
            version: 0,
        }
    }

    fn test_cluster(name: &str, gpu: u64) -> ComputeCluster {
        ComputeCluster {
            name: name.to_string(),
            accelerator: Some("nvidia-a100".to_string()),
            capacity: gpus(gpu),
            min_nodes: 1,
            max_nodes: 8,
        }
    }

    // ── Job CRUD ───────────────────────────────────────────────────

    #[test]
    fn job_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let job = test_job("ml", "train");

        let version = store.put_job(&job).unwrap();
        let retrieved = store.get_job("ml/train").unwrap().unwrap();

        assert_eq!(version, 1);
        assert_eq!(retrieved.version, 1);
        assert_eq!(retrieved.name, "train");
    }

    #[test]
    fn job_put_bumps_version() {
        let store = StateStore::open_in_memory().unwrap();
        let mut job = test_job("ml", "train");

        assert_eq!(store.put_job(&job).unwrap(), 1);
        job.priority = "high".to_string();
        assert_eq!(store.put_job(&job).unwrap(), 2);

        let retrieved = store.get_job("ml/train").unwrap().unwrap();
        assert_eq!(retrieved.priority, "high");
        assert_eq!(retrieved.version, 2);
    }

    #[test]
    fn job_list_by_phase() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_job(&test_job("ml", "a")).unwrap();
        let mut running = test_job("ml", "b");
        running.phase = JobPhase::Running;
        store.put_job(&running).unwrap();

        assert_eq!(store.list_jobs().unwrap().len(), 2);
        assert_eq!(store.list_pending_jobs().unwrap().len(), 1);
        assert_eq!(store.list_running_jobs().unwrap().len(), 1);
        assert!(store.list_queued_jobs().unwrap().is_empty());
    }

    #[test]
    fn job_delete() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_job(&test_job("ml", "a")).unwrap();

        assert!(store.delete_job("ml/a").unwrap());
        assert!(!store.delete_job("ml/a").unwrap());
        assert!(store.get_job("ml/a").unwrap().is_none());
    }

    #[test]
    fn undecodable_job_is_skipped_in_listing() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_job(&test_job("ml", "good")).unwrap();

        let txn = store.db.begin_write().unwrap();
        {
            let mut table = txn.open_table(JOBS).unwrap();
            table.insert("ml/bad", b"not json".as_slice()).unwrap();
        }
        txn.commit().unwrap();

        let jobs = store.list_jobs().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "good");
    }

    fn insert_raw_job(store: &StateStore, key: &str, raw: &[u8]) {
        let txn = store.db.begin_write().unwrap();
        {
            let mut table = txn.open_table(JOBS).unwrap();
            table.insert(key, raw).unwrap();
        }
        txn.commit().unwrap();
    }

    #[test]
    fn null_priority_job_is_still_listed() {
        let store = StateStore::open_in_memory().unwrap();
        insert_raw_job(
            &store,
            "ml/loose",
            br#"{"namespace":"ml","name":"loose","priority":null,"demand":{"gpu":"two"}}"#,
        );

        let pending = store.list_pending_jobs().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].priority, "");
        assert!(pending[0].demand.is_zero());
    }

    // ── Queue / cluster CRUD ───────────────────────────────────────

    #[test]
    fn queue_put_get_delete() {
        let store = StateStore::open_in_memory().unwrap();
        let queue = QueueConfig {
            name: "research".to_string(),
            max_concurrent_jobs: 10,
            resource_quota: gpus(64),
            ..Default::default()
        };

        store.put_queue(&queue).unwrap();
        assert_eq!(store.get_queue("research").unwrap(), Some(queue));
        assert_eq!(StateStore::list_queues(&store).unwrap().len(), 1);
        assert!(store.delete_queue("research").unwrap());
        assert!(store.get_queue("research").unwrap().is_none());
    }

    #[test]
    fn cluster_put_get_delete() {
        let store = StateStore::open_in_memory().unwrap();
        let cluster = test_cluster("a100-pool", 16);

        store.put_cluster(&cluster).unwrap();
        assert_eq!(store.get_cluster("a100-pool").unwrap(), Some(cluster));
        assert!(store.delete_cluster("a100-pool").unwrap());
        assert!(StateStore::list_clusters(&store).unwrap().is_empty());
    }

    // ── Capacity ───────────────────────────────────────────────────

    #[test]
    fn available_capacity_subtracts_reservations() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_cluster(&test_cluster("pool", 16)).unwrap();

        let mut running = test_job("ml", "running");
        running.phase = JobPhase::Running;
        running.cluster = Some("pool".to_string());
        running.demand = gpus(4);
        store.put_job(&running).unwrap();

        let mut queued = test_job("ml", "queued");
        queued.phase = JobPhase::Queued;
        queued.cluster = Some("pool".to_string());
        queued.gang = Some(GangSpec { enabled: true, min_members: 3 });
        store.put_job(&queued).unwrap();

        // Pending and finished jobs hold nothing.
        store.put_job(&test_job("ml", "pending")).unwrap();
        let mut done = test_job("ml", "done");
        done.phase = JobPhase::Succeeded;
        done.cluster = Some("pool".to_string());
        store.put_job(&done).unwrap();

        assert_eq!(store.cluster_capacity("pool").unwrap(), gpus(9));
    }

    #[test]
    fn malformed_running_job_keeps_its_reservation() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_cluster(&test_cluster("pool", 8)).unwrap();
        insert_raw_job(
            &store,
            "ml/held",
            br#"{"namespace":"ml","name":"held","priority":null,"phase":"Running","cluster":"pool","demand":{"gpu":8}}"#,
        );

        assert_eq!(store.cluster_capacity("pool").unwrap(), ResourceVector::new());
    }

    #[test]
    fn undecodable_reservation_is_counted_from_raw_fields() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_cluster(&test_cluster("pool", 16)).unwrap();
        // No name, so the record cannot decode as a job.
        insert_raw_job(
            &store,
            "ml/nameless",
            br#"{"namespace":"ml","phase":"Queued","cluster":"pool","demand":{"gpu":2},"gang":{"enabled":true,"min_members":3}}"#,
        );
        insert_raw_job(
            &store,
            "ml/elsewhere",
            br#"{"namespace":"ml","phase":"Running","cluster":"other","demand":{"gpu":4}}"#,
        );

        assert!(store.list_jobs().unwrap().is_empty());
        assert_eq!(store.cluster_capacity("pool").unwrap(), gpus(10));
    }

    #[test]
    fn non_json_job_record_fails_capacity() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_cluster(&test_cluster("pool", 8)).unwrap();
        insert_raw_job(&store, "ml/garbage", b"not json");

        assert!(matches!(
            store.cluster_capacity("pool"),
            Err(StateError::Deserialize(_))
        ));
    }

    #[test]
    fn capacity_of_unknown_cluster_is_not_found() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(matches!(
            store.cluster_capacity("nope"),
            Err(StateError::NotFound(_))
        ));
    }

    // ── Transitions ────────────────────────────────────────────────

    #[test]
    fn commit_admits_and_binds_cluster() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_job(&test_job("ml", "a")).unwrap();
        let job = store.get_job("ml/a").unwrap().unwrap();

        store
            .commit_transition(&Transition::admit(&job, "pool"))
            .unwrap();

        let after = store.get_job("ml/a").unwrap().unwrap();
        assert_eq!(after.phase, JobPhase::Queued);
        assert_eq!(after.cluster.as_deref(), Some("pool"));
        assert_eq!(after.version, job.version + 1);
    }

    #[test]
    fn stale_version_is_a_conflict() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_job(&test_job("ml", "a")).unwrap();
        let observed = store.get_job("ml/a").unwrap().unwrap();

        // Someone else writes after our snapshot.
        store.put_job(&observed).unwrap();

        let err = store
            .commit_transition(&Transition::admit(&observed, "pool"))
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            store.get_job("ml/a").unwrap().unwrap().phase,
            JobPhase::Pending
        );
    }

    #[test]
    fn wrong_phase_is_a_conflict() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_job(&test_job("ml", "a")).unwrap();
        let job = store.get_job("ml/a").unwrap().unwrap();

        let err = store.commit_transition(&Transition::preempt(&job)).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn missing_job_is_not_found() {
        let store = StateStore::open_in_memory().unwrap();
        let ghost = test_job("ml", "ghost");
        let err = store
            .commit_transition(&Transition::admit(&ghost, "pool"))
            .unwrap_err();
        assert!(matches!(err, StateError::NotFound(_)));
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let store = StateStore::open_in_memory().unwrap();
        let mut victim = test_job("ml", "victim");
        victim.phase = JobPhase::Running;
        victim.cluster = Some("pool".to_string());
        store.put_job(&victim).unwrap();
        store.put_job(&test_job("ml", "urgent")).unwrap();

        let victim = store.get_job("ml/victim").unwrap().unwrap();
        let mut urgent = store.get_job("ml/urgent").unwrap().unwrap();
        urgent.version += 10; // stale

        let err = store
            .commit_batch(&[Transition::preempt(&victim), Transition::admit(&urgent, "pool")])
            .unwrap_err();
        assert!(err.is_conflict());

        // The victim was not touched.
        let victim_after = store.get_job("ml/victim").unwrap().unwrap();
        assert_eq!(victim_after.phase, JobPhase::Running);
        assert_eq!(victim_after.version, victim.version);
    }

    #[test]
    fn batch_applies_every_transition() {
        let store = StateStore::open_in_memory().unwrap();
        let mut victim = test_job("ml", "victim");
        victim.phase = JobPhase::Running;
        store.put_job(&victim).unwrap();
        store.put_job(&test_job("ml", "urgent")).unwrap();

        let victim = store.get_job("ml/victim").unwrap().unwrap();
        let urgent = store.get_job("ml/urgent").unwrap().unwrap();
        store
            .commit_batch(&[Transition::preempt(&victim), Transition::admit(&urgent, "pool")])
            .unwrap();

        assert_eq!(
            store.get_job("ml/victim").unwrap().unwrap().phase,
            JobPhase::Preempted
        );
        assert_eq!(
            store.get_job("ml/urgent").unwrap().unwrap().phase,
            JobPhase::Queued
        );
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let store = StateStore::open(&db_path).unwrap();
            store.put_job(&test_job("prod", "train")).unwrap();
            store.put_cluster(&test_cluster("pool", 8)).unwrap();
        }

        let store = StateStore::open(&db_path).unwrap();
        let job = store.get_job("prod/train").unwrap();
        assert!(job.is_some());
        assert_eq!(job.unwrap().version, 1);
        assert!(store.get_cluster("pool").unwrap().is_some());
    }

    #[test]
    fn empty_store_operations() {
        let store = StateStore::open_in_memory().unwrap();

        assert!(store.list_jobs().unwrap().is_empty());
        assert!(StateStore::list_queues(&store).unwrap().is_empty());
        assert!(StateStore::list_clusters(&store).unwrap().is_empty());
        assert!(!store.delete_job("nope/nothing").unwrap());
        assert!(!store.delete_queue("nope").unwrap());
        assert!(!store.delete_cluster("nope").unwrap());
    }
}
