//! Gang admission control.
//!
//! A job is admitted only when its full demand (`demand × replicas` for a
//! gang) can be reserved on a single cluster at once. Partial gangs are
//! never admitted.

use gantry_core::ResourceVector;
use gantry_state::{ComputeCluster, Job};
use tracing::debug;

use crate::ledger::CapacityLedger;

/// Result of trying a job against one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The full demand is now reserved on the cluster.
    Admitted { reserved: ResourceVector },
    /// Nothing was reserved; this is what the cluster is short by.
    Deficit(ResourceVector),
}

/// Result of trying a job against every eligible cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitOutcome {
    Admitted {
        cluster: String,
        reserved: ResourceVector,
    },
    /// No eligible cluster fits. Deficits are listed in cluster order.
    Blocked {
        deficits: Vec<(String, ResourceVector)>,
    },
    /// No cluster matches the job's accelerator selector.
    NoEligibleCluster,
}

/// Try to reserve a job's full demand on `cluster`.
pub fn admit(job: &Job, cluster: &str, ledger: &mut CapacityLedger) -> Admission {
    let required = job.total_demand();
    if ledger.tentatively_reserve(cluster, &required) {
        Admission::Admitted { reserved: required }
    } else {
        Admission::Deficit(ledger.deficit(cluster, &required))
    }
}

/// Clusters a job may run on, in the order they are given.
pub fn eligible_clusters<'a>(
    job: &'a Job,
    clusters: &'a [ComputeCluster],
) -> impl Iterator<Item = &'a ComputeCluster> + 'a {
    clusters
        .iter()
        .filter(move |c| c.matches_selector(job.cluster_selector.as_deref()))
}

/// Admit a job on the first eligible cluster that fits.
///
/// `clusters` should already be sorted by name so the choice is
/// deterministic.
pub fn admit_any(job: &Job, clusters: &[ComputeCluster], ledger: &mut CapacityLedger) -> AdmitOutcome {
    let mut deficits = Vec::new();
    for cluster in eligible_clusters(job, clusters) {
        match admit(job, &cluster.name, ledger) {
            Admission::Admitted { reserved } => {
                return AdmitOutcome::Admitted {
                    cluster: cluster.name.clone(),
                    reserved,
                };
            }
            Admission::Deficit(deficit) => {
                debug!(
                    job = %job.table_key(),
                    cluster = %cluster.name,
                    replicas = job.replicas(),
                    %deficit,
                    "insufficient capacity"
                );
                deficits.push((cluster.name.clone(), deficit));
            }
        }
    }

    if deficits.is_empty() {
        AdmitOutcome::NoEligibleCluster
    } else {
        AdmitOutcome::Blocked { deficits }
    }
}
