//! Store configuration.
//!
//! Loaded from JSON, e.g.
//!
//! ```json
//! {
//!   "capacity": { "records": 5000 },
//!   "expiry": { "enabled": true, "retention_ms": 3600000, "sweep_interval_secs": 60 },
//!   "rules": [
//!     { "sensor_type": "temperature", "above": 80.0, "priority": 9, "kind": "CRITICAL" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::alerts::ThresholdRule;
use crate::error::{StoreError, StoreResult};
use crate::storage::Capacity;

/// Time-based expiry policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpiryConfig {
    /// Whether the background sweep runs at all
    pub enabled: bool,
    /// Records older than this (relative to sweep time) are expired
    pub retention_ms: u64,
    /// Interval between sweeps
    pub sweep_interval_secs: u64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_ms: 60 * 60 * 1000,
            sweep_interval_secs: 60,
        }
    }
}

impl ExpiryConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub capacity: Capacity,
    pub expiry: ExpiryConfig,
    pub rules: Vec<ThresholdRule>,
}

impl StoreConfig {
    pub fn with_capacity(capacity: Capacity) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> StoreResult<Self> {
        let config: StoreConfig = serde_json::from_str(json)
            .map_err(|e| StoreError::Config(format!("Parse config failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    /// Rejects settings the store cannot run with.
    pub fn validate(&self) -> StoreResult<()> {
        self.capacity.validate()?;

        if self.expiry.enabled && self.expiry.sweep_interval_secs == 0 {
            return Err(StoreError::Config(
                "expiry sweep interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}
