//! Startup configuration for the allocation service.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::invocation::Topology;

/// One managed unit as configured at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    /// The topology this unit advertises; names must be unique across the
    /// inventory.
    pub topology: Topology,
}

/// Root service configuration.
///
/// The durations default to 15s/30s/1s/45s, chosen so the adoption window
/// spans roughly two refresh cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Managed units.
    pub units: Vec<UnitConfig>,
    /// Queue entries not refreshed within this many seconds are expired.
    #[serde(default = "default_queue_refresh_secs")]
    pub queue_refresh_duration_secs: u64,
    /// Allocations not refreshed within this many seconds are expired.
    #[serde(default = "default_allocation_refresh_secs")]
    pub allocation_refresh_duration_secs: u64,
    /// Janitor tick period in seconds.
    #[serde(default = "default_janitor_interval_secs")]
    pub janitor_interval_secs: u64,
    /// Length of the startup adoption window in seconds.
    #[serde(default = "default_adoption_secs")]
    pub adoption_duration_secs: u64,
}

fn default_queue_refresh_secs() -> u64 {
    15
}

fn default_allocation_refresh_secs() -> u64 {
    30
}

fn default_janitor_interval_secs() -> u64 {
    1
}

fn default_adoption_secs() -> u64 {
    45
}

impl ServiceConfig {
    /// Configuration for `units` with all durations at their defaults.
    pub fn with_units(units: Vec<UnitConfig>) -> Self {
        Self {
            units,
            queue_refresh_duration_secs: default_queue_refresh_secs(),
            allocation_refresh_duration_secs: default_allocation_refresh_secs(),
            janitor_interval_secs: default_janitor_interval_secs(),
            adoption_duration_secs: default_adoption_secs(),
        }
    }

    /// Validate configuration values. Duplicate topology names are fatal.
    pub fn validate(&self) -> Result<(), String> {
        if self.queue_refresh_duration_secs == 0 {
            return Err("queue_refresh_duration_secs must be greater than 0".into());
        }
        if self.allocation_refresh_duration_secs == 0 {
            return Err("allocation_refresh_duration_secs must be greater than 0".into());
        }
        if self.janitor_interval_secs == 0 {
            return Err("janitor_interval_secs must be greater than 0".into());
        }
        if self.adoption_duration_secs == 0 {
            return Err("adoption_duration_secs must be greater than 0".into());
        }
        let mut names = BTreeSet::new();
        let mut duplicates = 0;
        for unit in &self.units {
            if !names.insert(unit.topology.name.as_str()) {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            return Err(format!(
                "{duplicates} unit topology names not unique, expected 0"
            ));
        }
        Ok(())
    }

    /// Parse service configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: ServiceConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Queue-refresh duration.
    pub fn queue_refresh(&self) -> Duration {
        Duration::from_secs(self.queue_refresh_duration_secs)
    }

    /// Allocation-refresh duration.
    pub fn allocation_refresh(&self) -> Duration {
        Duration::from_secs(self.allocation_refresh_duration_secs)
    }

    /// Janitor tick period.
    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs)
    }

    /// Adoption window length.
    pub fn adoption_duration(&self) -> Duration {
        Duration::from_secs(self.adoption_duration_secs)
    }
}
