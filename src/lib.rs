//! # Sensor Store
//!
//! Bounded, multi-index store for sensor readings with a prioritized alert
//! queue.
//!
//! ## Architecture
//!
//! - **RecordStore**: FIFO buffer bounded by record count or byte budget
//! - **IdIndex**: identifier → record handle
//! - **GroupIndex**: location → set of record handles
//! - **PriorityIndex**: max-heap of alerts with lazy invalidation
//! - **EvictionCoordinator**: the only remover; keeps the four in step
//! - **EventStore**: shared, lock-protected handle used by callers
//! - **ExpiryScheduler**: background retention sweep

pub mod alerts;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod expiry;
pub mod index;
pub mod record;
pub mod storage;
pub mod store;
pub mod types;

pub use alerts::{Alert, AlertDraft, AlertRule, PriorityIndex, PriorityStats, ThresholdRule};
pub use config::{ExpiryConfig, StoreConfig};
pub use coordinator::{EvictionCoordinator, ExpiryOutcome, IngestOutcome, StoreStats};
pub use error::{StoreError, StoreResult};
pub use expiry::{ExpiryScheduler, ExpiryService, ExpiryStats};
pub use index::{GroupIndex, IdIndex};
pub use record::{Record, SensorReading};
pub use storage::{default_sizer, Capacity, RecordSizer, RecordStore, StorageStats};
pub use store::EventStore;
pub use types::{AlertHandle, AlertKind, GroupKey, Priority, RecordHandle, RecordId};
