//! Storage data structures.
//!
//! Defines the capacity model and counters used by the record store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::record::Record;

/// Upper bound on what the record store may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capacity {
    /// Maximum number of resident records
    Records(usize),
    /// Maximum aggregate byte size of resident records
    Bytes(usize),
}

impl Capacity {
    /// Rejects a zero bound. Called once at configuration time.
    pub fn validate(&self) -> StoreResult<()> {
        match *self {
            Capacity::Records(0) => Err(StoreError::CapacityViolation(
                "record capacity must be greater than zero".to_string(),
            )),
            Capacity::Bytes(0) => Err(StoreError::CapacityViolation(
                "byte budget must be greater than zero".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn limit(&self) -> usize {
        match *self {
            Capacity::Records(n) | Capacity::Bytes(n) => n,
        }
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Records(10_000)
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Records(n) => write!(f, "{} records", n),
            Capacity::Bytes(n) => write!(f, "{} bytes", n),
        }
    }
}

/// Byte-size accessor for byte-budgeted stores.
pub type RecordSizer = Arc<dyn Fn(&Record) -> usize + Send + Sync>;

/// Default sizer: [`Record::approx_size`].
pub fn default_sizer() -> RecordSizer {
    Arc::new(|record: &Record| record.approx_size())
}

/// Statistics about record store usage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of resident records
    pub resident: usize,
    /// Aggregate byte size of resident records
    pub bytes_used: usize,
    /// Records appended since creation
    pub total_appended: u64,
    /// Records removed from the head since creation
    pub total_evicted: u64,
}
