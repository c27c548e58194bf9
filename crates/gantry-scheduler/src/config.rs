//! Engine configuration.

use std::time::Duration;

use gantry_core::SchedulerSection;
use gantry_core::config::{DEFAULT_INTERVAL_SECS, DEFAULT_PREEMPTION_MIN_WEIGHT};

use crate::error::{SchedulerError, SchedulerResult};

/// Runtime knobs for the scheduling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between pass starts. Also the implicit per-pass deadline.
    pub interval: Duration,
    pub preemption_enabled: bool,
    /// Blocked jobs below this weight never preempt.
    pub preemption_min_weight: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            preemption_enabled: true,
            preemption_min_weight: DEFAULT_PREEMPTION_MIN_WEIGHT,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.interval.is_zero() {
            return Err(SchedulerError::InvalidConfig(
                "interval must be greater than zero".to_string(),
            ));
        }
        if self.preemption_min_weight == 0 {
            return Err(SchedulerError::InvalidConfig(
                "preemption_min_weight must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&SchedulerSection> for SchedulerConfig {
    fn from(section: &SchedulerSection) -> Self {
        Self {
            interval: Duration::from_secs(section.interval_secs),
            preemption_enabled: section.preemption,
            preemption_min_weight: section.preemption_min_weight,
        }
    }
}
