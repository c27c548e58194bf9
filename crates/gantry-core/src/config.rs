//! gantry.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default scheduling interval in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Weight of the `high` priority class; the default preemption threshold.
pub const DEFAULT_PREEMPTION_MIN_WEIGHT: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GantryConfig {
    pub scheduler: SchedulerSection,
    pub state: StateSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Seconds between scheduling passes.
    pub interval_secs: u64,
    /// Global preemption switch. Queues can still opt out individually.
    pub preemption: bool,
    /// Minimum priority weight a blocked job needs to trigger preemption.
    pub preemption_min_weight: u32,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            preemption: true,
            preemption_min_weight: DEFAULT_PREEMPTION_MIN_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSection {
    /// Path of the redb state file.
    pub path: PathBuf,
}

impl Default for StateSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/gantry/gantry.redb"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// `tracing_subscriber::EnvFilter` directives, overridden by `RUST_LOG`.
    pub filter: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "info,gantry=debug".to_string(),
            json: false,
        }
    }
}

impl GantryConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: GantryConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
