//! Per-pass accounting of remaining cluster capacity.
//!
//! Built from the provider's observed available capacity at the start of a
//! pass and dropped at the end of it. Reservations made here are tentative;
//! they only become durable when the matching transition commits.

use std::collections::BTreeMap;

use gantry_core::ResourceVector;

/// Remaining capacity per cluster for one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapacityLedger {
    clusters: BTreeMap<String, ResourceVector>,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from `(cluster, available)` pairs.
    pub fn from_available<I>(available: I) -> Self
    where
        I: IntoIterator<Item = (String, ResourceVector)>,
    {
        Self {
            clusters: available.into_iter().collect(),
        }
    }

    pub fn insert_cluster(&mut self, cluster: &str, available: ResourceVector) {
        self.clusters.insert(cluster.to_string(), available);
    }

    pub fn available(&self, cluster: &str) -> Option<&ResourceVector> {
        self.clusters.get(cluster)
    }

    /// Reserve `demand` on `cluster` if every dimension fits.
    ///
    /// Nothing is reserved when any dimension falls short or the cluster is
    /// unknown.
    pub fn tentatively_reserve(&mut self, cluster: &str, demand: &ResourceVector) -> bool {
        let Some(available) = self.clusters.get_mut(cluster) else {
            return false;
        };
        if !demand.fits_within(available) {
            return false;
        }
        available.saturating_sub_assign(demand);
        true
    }

    /// Return `amount` to `cluster`: a rolled-back reservation or capacity
    /// freed by a preemption victim.
    pub fn release(&mut self, cluster: &str, amount: &ResourceVector) {
        if let Some(available) = self.clusters.get_mut(cluster) {
            available.add_assign(amount);
        }
    }

    /// Shortfall of `cluster` against `demand`.
    ///
    /// An unknown cluster has nothing available.
    pub fn deficit(&self, cluster: &str, demand: &ResourceVector) -> ResourceVector {
        match self.clusters.get(cluster) {
            Some(available) => demand.deficit_against(available),
            None => demand.clone(),
        }
    }

    /// Copy of the remaining capacity of every cluster.
    pub fn snapshot(&self) -> BTreeMap<String, ResourceVector> {
        self.clusters.clone()
    }
}
