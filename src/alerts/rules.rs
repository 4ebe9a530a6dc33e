//! Alert derivation applied to freshly admitted records.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::alerts::alert::AlertDraft;
use crate::record::Record;
use crate::types::{AlertKind, Priority};

/// Derives at most one alert from a record.
pub trait AlertRule: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn derive(&self, record: &Record) -> Option<AlertDraft>;
}

/// Fires when a reading of `sensor_type` is strictly above `above`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub sensor_type: String,
    pub above: f64,
    pub priority: Priority,
    pub kind: AlertKind,
    /// Overrides the generated message
    #[serde(default)]
    pub message: Option<String>,
}

impl ThresholdRule {
    pub fn new(sensor_type: impl Into<String>, above: f64, priority: u32, kind: AlertKind) -> Self {
        Self {
            sensor_type: sensor_type.into(),
            above,
            priority: Priority(priority),
            kind,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl AlertRule for ThresholdRule {
    fn name(&self) -> &str {
        &self.sensor_type
    }

    fn derive(&self, record: &Record) -> Option<AlertDraft> {
        if record.reading.sensor_type != self.sensor_type || record.reading.value <= self.above {
            return None;
        }

        let message = self.message.clone().unwrap_or_else(|| {
            format!(
                "{} threshold exceeded at {}: {} > {}",
                self.sensor_type, record.group, record.reading.value, self.above
            )
        });
        debug!("rule '{}' fired for record {}", self.sensor_type, record.id);

        Some(AlertDraft {
            priority: self.priority,
            kind: self.kind,
            message,
            record: Some(record.id),
        })
    }
}
