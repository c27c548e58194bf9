//! Multi-dimensional resource quantities.
//!
//! A `ResourceVector` maps a dimension name (`gpu`, `cpu_millis`,
//! `memory_bytes`, ...) to an already-normalised integer quantity. A
//! dimension that is absent is treated as zero everywhere.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-dimension resource quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVector(BTreeMap<String, u64>);

impl ResourceVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly used by tests and manifests.
    pub fn with(mut self, dimension: &str, quantity: u64) -> Self {
        self.set(dimension, quantity);
        self
    }

    /// Quantity for a dimension (zero when absent).
    pub fn get(&self, dimension: &str) -> u64 {
        self.0.get(dimension).copied().unwrap_or(0)
    }

    /// Set a dimension. Setting zero removes it.
    pub fn set(&mut self, dimension: &str, quantity: u64) {
        if quantity == 0 {
            self.0.remove(dimension);
        } else {
            self.0.insert(dimension.to_string(), quantity);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// True when every dimension is zero.
    pub fn is_zero(&self) -> bool {
        self.0.values().all(|&v| v == 0)
    }

    /// Multiply every dimension by `factor` (saturating).
    pub fn scaled(&self, factor: u32) -> Self {
        let mut out = Self::new();
        for (dim, qty) in self.iter() {
            out.set(dim, qty.saturating_mul(u64::from(factor)));
        }
        out
    }

    /// Add `other` into `self` (saturating).
    pub fn add_assign(&mut self, other: &ResourceVector) {
        for (dim, qty) in other.iter() {
            let sum = self.get(dim).saturating_add(qty);
            self.set(dim, sum);
        }
    }

    /// Subtract `other` from `self`, clamping each dimension at zero.
    pub fn saturating_sub_assign(&mut self, other: &ResourceVector) {
        for (dim, qty) in other.iter() {
            let rest = self.get(dim).saturating_sub(qty);
            self.set(dim, rest);
        }
    }

    /// `self - other`, clamped at zero per dimension.
    pub fn saturating_sub(&self, other: &ResourceVector) -> Self {
        let mut out = self.clone();
        out.saturating_sub_assign(other);
        out
    }

    /// True when `available` holds at least `self` on every dimension.
    pub fn fits_within(&self, available: &ResourceVector) -> bool {
        self.iter().all(|(dim, qty)| available.get(dim) >= qty)
    }

    /// Per-dimension shortfall of `available` against `self`.
    ///
    /// Only dimensions that are short appear in the result; an empty
    /// vector means `self` fits.
    pub fn deficit_against(&self, available: &ResourceVector) -> Self {
        let mut out = Self::new();
        for (dim, qty) in self.iter() {
            out.set(dim, qty.saturating_sub(available.get(dim)));
        }
        out
    }

    /// True when `self` stays at or below every cap in `quota`.
    ///
    /// Dimensions the quota does not mention are unlimited.
    pub fn within_quota(&self, quota: &ResourceVector) -> bool {
        quota.iter().all(|(dim, cap)| self.get(dim) <= cap)
    }
}

impl fmt::Display for ResourceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "{{}}");
        }
        let mut first = true;
        for (dim, qty) in self.iter() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{dim}={qty}")?;
            first = false;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for ResourceVector {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (dim, qty) in iter {
            let dim = dim.into();
            let sum = out.get(&dim).saturating_add(qty);
            out.set(&dim, sum);
        }
        out
    }
}
