//! On-demand expiry sweep.
//!
//! Applies the retention window to the store: every record stamped before
//! `now - retention_ms` is evicted through the coordinator, which tears down
//! its index entries and invalidates its alerts.

use log::info;

use crate::config::ExpiryConfig;
use crate::store::EventStore;
use crate::types::now_ms;

/// Statistics from one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryStats {
    /// Number of records expired
    pub records_expired: usize,
    /// Alerts invalidated because their record expired
    pub alerts_invalidated: usize,
    /// Records stamped before this were eligible
    pub cutoff_ms: u64,
    /// Duration of the sweep in milliseconds
    pub duration_ms: u64,
    /// Timestamp of the sweep
    pub timestamp: u64,
}

/// Time-based expiry policy bound to a store.
#[derive(Debug, Clone)]
pub struct ExpiryService {
    store: EventStore,
    retention_ms: u64,
}

impl ExpiryService {
    pub fn new(store: EventStore, config: &ExpiryConfig) -> Self {
        Self {
            store,
            retention_ms: config.retention_ms,
        }
    }

    pub fn retention_ms(&self) -> u64 {
        self.retention_ms
    }

    /// Sweeps against the current wall clock.
    pub fn sweep_now(&self) -> ExpiryStats {
        self.sweep_at(now_ms())
    }

    /// Sweeps as if the current time were `now`.
    pub fn sweep_at(&self, now: u64) -> ExpiryStats {
        let start = now_ms();
        let cutoff_ms = now.saturating_sub(self.retention_ms);

        let outcome = self.store.expire_older_than(cutoff_ms);
        if !outcome.expired.is_empty() {
            info!(
                "expired {} record(s) older than {}, {} alert(s) invalidated",
                outcome.expired.len(),
                cutoff_ms,
                outcome.invalidated
            );
        }

        ExpiryStats {
            records_expired: outcome.expired.len(),
            alerts_invalidated: outcome.invalidated,
            cutoff_ms,
            duration_ms: now_ms().saturating_sub(start),
            timestamp: now_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertDraft;
    use crate::record::Record;
    use crate::storage::Capacity;
    use crate::types::{AlertKind, RecordId};

    fn stamped(id: u64, ts: u64) -> Record {
        let mut record = Record::now(id, "Building_A", "temperature", 71.0);
        record.timestamp_ms = ts;
        record
    }

    #[test]
    fn test_sweep_applies_retention_window() {
        let store = EventStore::new(Capacity::Records(10)).unwrap();
        store
            .ingest(
                stamped(1, 1_000),
                vec![AlertDraft::new(5, AlertKind::Warning, "old")],
            )
            .unwrap();
        store.ingest(stamped(2, 5_000), vec![]).unwrap();

        let config = ExpiryConfig {
            retention_ms: 2_000,
            ..Default::default()
        };
        let service = ExpiryService::new(store.clone(), &config);
        assert_eq!(service.retention_ms(), 2_000);

        let stats = service.sweep_at(6_000);
        assert_eq!(stats.cutoff_ms, 4_000);
        assert_eq!(stats.records_expired, 1);
        assert_eq!(stats.alerts_invalidated, 1);
        assert!(store.get(RecordId(1)).is_none());
        assert!(store.pop_next_valid().is_none());
    }

    #[test]
    fn test_sweep_before_retention_is_noop() {
        let store = EventStore::new(Capacity::Records(10)).unwrap();
        store.ingest(stamped(1, 100), vec![]).unwrap();

        let service = ExpiryService::new(store.clone(), &ExpiryConfig::default());
        let stats = service.sweep_at(200);
        assert_eq!(stats.cutoff_ms, 0);
        assert_eq!(stats.records_expired, 0);
        assert_eq!(store.len(), 1);
    }
}
