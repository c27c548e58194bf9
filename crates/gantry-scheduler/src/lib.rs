//! Gantry scheduling engine.
//!
//! Decides which pending jobs to admit onto which compute cluster, and which
//! running jobs to preempt to make room for more important work. Cluster
//! state is read through a [`gantry_state::SnapshotProvider`] and decisions
//! are written back through it as conditional phase transitions.
//!
//! # Architecture
//!
//! ```text
//! Scheduler (one pass per tick)
//!   ├── priority    order pending jobs by weight, then age
//!   ├── limits      per-queue concurrency caps and quotas
//!   ├── admission   all-or-nothing gang admission against
//!   │   └── ledger  remaining capacity per cluster for this pass
//!   └── preemption  victim selection when a high-priority job is blocked
//! ```

pub mod admission;
pub mod config;
pub mod error;
pub mod ledger;
pub mod limits;
pub mod preemption;
pub mod priority;
pub mod scheduler;

pub use admission::{AdmitOutcome, Admission, admit, admit_any};
pub use config::SchedulerConfig;
pub use error::{SchedulerError, SchedulerResult};
pub use ledger::CapacityLedger;
pub use limits::{LimitViolation, QueueUsage};
pub use preemption::{PreemptionPlan, plan_preemption};
pub use priority::{PriorityTable, compare_jobs, order_jobs};
pub use scheduler::{
    AdmittedJob, CommitMode, DeferReason, DeferredJob, FailedCommit, PassReport, PreemptedJob,
    Scheduler,
};
