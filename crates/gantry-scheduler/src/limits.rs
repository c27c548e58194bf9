//! Queue admission limits.
//!
//! Counts Queued + Running jobs per queue and checks a candidate against the
//! queue's concurrency caps and aggregate quota. The scheduler keeps the
//! counts current within a pass as it admits and preempts.

use std::collections::HashMap;

use gantry_core::ResourceVector;
use gantry_state::{Job, QueueConfig};
use thiserror::Error;

/// A queue limit that blocks a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitViolation {
    #[error("queue {queue} is at its limit of {limit} concurrent jobs")]
    MaxJobs { queue: String, limit: u32 },

    #[error("user {user} is at the limit of {limit} concurrent jobs in queue {queue}")]
    PerUser {
        queue: String,
        user: String,
        limit: u32,
    },

    #[error("namespace {namespace} is at the limit of {limit} concurrent jobs in queue {queue}")]
    PerNamespace {
        queue: String,
        namespace: String,
        limit: u32,
    },

    #[error("queue {queue} quota exceeded by {exceeded}")]
    Quota {
        queue: String,
        exceeded: ResourceVector,
    },
}

#[derive(Debug, Clone, Default)]
struct Usage {
    jobs: u32,
    per_user: HashMap<String, u32>,
    per_namespace: HashMap<String, u32>,
    demand: ResourceVector,
}

/// Live job counts and demand per queue.
#[derive(Debug, Clone, Default)]
pub struct QueueUsage {
    queues: HashMap<String, Usage>,
}

impl QueueUsage {
    /// Usage from jobs already holding reservations.
    pub fn from_jobs<'a, I>(jobs: I) -> Self
    where
        I: IntoIterator<Item = &'a Job>,
    {
        let mut usage = Self::default();
        for job in jobs {
            usage.record(job);
        }
        usage
    }

    /// Number of jobs counted against `queue`.
    pub fn jobs_in(&self, queue: &str) -> u32 {
        self.queues.get(queue).map_or(0, |u| u.jobs)
    }

    /// Check whether admitting `job` would break a limit of `queue`.
    ///
    /// Jobs whose queue has no config are unlimited.
    pub fn check(&self, job: &Job, queue: Option<&QueueConfig>) -> Result<(), LimitViolation> {
        let Some(queue) = queue else {
            return Ok(());
        };
        let empty = Usage::default();
        let usage = self.queues.get(&queue.name).unwrap_or(&empty);

        if queue.max_concurrent_jobs > 0 && usage.jobs >= queue.max_concurrent_jobs {
            return Err(LimitViolation::MaxJobs {
                queue: queue.name.clone(),
                limit: queue.max_concurrent_jobs,
            });
        }

        if queue.max_concurrent_per_user > 0 {
            if let Some(user) = job.owner.as_deref() {
                let current = usage.per_user.get(user).copied().unwrap_or(0);
                if current >= queue.max_concurrent_per_user {
                    return Err(LimitViolation::PerUser {
                        queue: queue.name.clone(),
                        user: user.to_string(),
                        limit: queue.max_concurrent_per_user,
                    });
                }
            }
        }

        if queue.max_concurrent_per_namespace > 0 {
            let current = usage.per_namespace.get(&job.namespace).copied().unwrap_or(0);
            if current >= queue.max_concurrent_per_namespace {
                return Err(LimitViolation::PerNamespace {
                    queue: queue.name.clone(),
                    namespace: job.namespace.clone(),
                    limit: queue.max_concurrent_per_namespace,
                });
            }
        }

        if !queue.resource_quota.is_zero() {
            let mut after = usage.demand.clone();
            after.add_assign(&job.total_demand());
            if !after.within_quota(&queue.resource_quota) {
                let exceeded = queue
                    .resource_quota
                    .iter()
                    .map(|(dim, cap)| (dim, after.get(dim).saturating_sub(cap)))
                    .collect();
                return Err(LimitViolation::Quota {
                    queue: queue.name.clone(),
                    exceeded,
                });
            }
        }

        Ok(())
    }

    /// Count `job` against its queue.
    pub fn record(&mut self, job: &Job) {
        let usage = self.queues.entry(job.queue_name().to_string()).or_default();
        usage.jobs += 1;
        if let Some(user) = &job.owner {
            *usage.per_user.entry(user.clone()).or_default() += 1;
        }
        *usage.per_namespace.entry(job.namespace.clone()).or_default() += 1;
        usage.demand.add_assign(&job.total_demand());
    }

    /// Stop counting `job`, e.g. after it was preempted.
    pub fn forget(&mut self, job: &Job) {
        let Some(usage) = self.queues.get_mut(job.queue_name()) else {
            return;
        };
        usage.jobs = usage.jobs.saturating_sub(1);
        if let Some(user) = &job.owner {
            if let Some(n) = usage.per_user.get_mut(user) {
                *n = n.saturating_sub(1);
            }
        }
        if let Some(n) = usage.per_namespace.get_mut(&job.namespace) {
            *n = n.saturating_sub(1);
        }
        usage.demand.saturating_sub_assign(&job.total_demand());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(namespace: &str, name: &str, owner: Option<&str>, gpu: u64) -> Job {
        let mut job: Job = serde_json::from_value(serde_json::json!({
            "namespace": namespace,
            "name": name,
            "queue": "research",
            "owner": owner,
        }))
        .unwrap();
        job.demand = ResourceVector::new().with("gpu", gpu);
        job
    }

    fn queue() -> QueueConfig {
        QueueConfig {
            name: "research".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn unconfigured_queue_is_unlimited() {
        let running = vec![job("ml", "a", None, 100)];
        let usage = QueueUsage::from_jobs(&running);
        assert!(usage.check(&job("ml", "b", None, 100), None).is_ok());
        assert!(usage.check(&job("ml", "b", None, 100), Some(&queue())).is_ok());
    }

    #[test]
    fn max_concurrent_jobs() {
        let q = QueueConfig { max_concurrent_jobs: 2, ..queue() };
        let mut usage = QueueUsage::from_jobs(&[job("ml", "a", None, 1)]);
        let next = job("ml", "b", None, 1);

        assert!(usage.check(&next, Some(&q)).is_ok());
        usage.record(&next);
        assert_eq!(usage.jobs_in("research"), 2);
        assert_eq!(
            usage.check(&job("ml", "c", None, 1), Some(&q)),
            Err(LimitViolation::MaxJobs { queue: "research".to_string(), limit: 2 })
        );
    }

    #[test]
    fn per_user_and_namespace_caps() {
        let q = QueueConfig {
            max_concurrent_per_user: 1,
            max_concurrent_per_namespace: 2,
            ..queue()
        };
        let usage = QueueUsage::from_jobs(&[
            job("ml", "a", Some("ada"), 1),
            job("ml", "b", Some("bob"), 1),
        ]);

        assert!(matches!(
            usage.check(&job("vision", "c", Some("ada"), 1), Some(&q)),
            Err(LimitViolation::PerUser { .. })
        ));
        assert!(matches!(
            usage.check(&job("ml", "c", Some("cy"), 1), Some(&q)),
            Err(LimitViolation::PerNamespace { .. })
        ));
        assert!(usage.check(&job("vision", "c", Some("cy"), 1), Some(&q)).is_ok());
    }

    #[test]
    fn quota_counts_aggregate_demand() {
        let q = QueueConfig {
            resource_quota: ResourceVector::new().with("gpu", 8),
            ..queue()
        };
        let usage = QueueUsage::from_jobs(&[job("ml", "a", None, 6)]);

        assert!(usage.check(&job("ml", "b", None, 2), Some(&q)).is_ok());
        assert_eq!(
            usage.check(&job("ml", "b", None, 5), Some(&q)),
            Err(LimitViolation::Quota {
                queue: "research".to_string(),
                exceeded: ResourceVector::new().with("gpu", 3),
            })
        );
    }

    #[test]
    fn forget_frees_the_slot() {
        let q = QueueConfig { max_concurrent_jobs: 1, ..queue() };
        let victim = job("ml", "a", Some("ada"), 4);
        let mut usage = QueueUsage::from_jobs([&victim]);
        assert!(usage.check(&job("ml", "b", None, 1), Some(&q)).is_err());

        usage.forget(&victim);
        assert_eq!(usage.jobs_in("research"), 0);
        assert!(usage.check(&job("ml", "b", None, 1), Some(&q)).is_ok());
    }

    #[test]
    fn violation_messages() {
        let v = LimitViolation::PerUser {
            queue: "research".to_string(),
            user: "ada".to_string(),
            limit: 1,
        };
        assert_eq!(
            v.to_string(),
            "user ada is at the limit of 1 concurrent jobs in queue research"
        );
    }
}
