use crate::alerts::{Alert, AlertDraft, AlertRule};
use crate::config::StoreConfig;
use crate::coordinator::{EvictionCoordinator, ExpiryOutcome, IngestOutcome, StoreStats};
use crate::error::StoreResult;
use crate::record::Record;
use crate::storage::{Capacity, RecordSizer};
use crate::types::{AlertHandle, GroupKey, RecordHandle, RecordId};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::sync::Arc;

/// Shared handle over the eviction coordinator.
///
/// # Thread Safety
/// - One `RwLock` covers the record store, both indexes and the alert heap
/// - Mutations (ingest, expiry, eviction, alert pops) hold the write lock for
///   their whole eviction/invalidation sequence, so readers never observe a
///   half-propagated eviction
/// - Lookups share the read lock
/// - `peek_next_valid` takes an upgradable read and only upgrades when stale
///   heap entries have to be discarded
///
/// Cloning is cheap; every clone refers to the same store.
#[derive(Clone, Debug)]
pub struct EventStore {
    inner: Arc<RwLock<EvictionCoordinator>>,
}

impl EventStore {
    /// Creates a store with the given capacity and no alert rules.
    pub fn new(capacity: Capacity) -> StoreResult<Self> {
        Ok(Self::from_coordinator(EvictionCoordinator::new(capacity)?))
    }

    /// Creates a byte- or count-bounded store with a custom record sizer.
    pub fn with_sizer(capacity: Capacity, sizer: RecordSizer) -> StoreResult<Self> {
        let coordinator = EvictionCoordinator::with_sizer(capacity, sizer)?;
        Ok(Self::from_coordinator(coordinator))
    }

    /// Creates a store from configuration, installing its threshold rules.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let coordinator = EvictionCoordinator::from_config(config)?;
        Ok(Self::from_coordinator(coordinator))
    }

    /// Wraps an existing coordinator, e.g. one built and pre-filled in tests.
    pub fn from_coordinator(coordinator: EvictionCoordinator) -> Self {
        Self {
            inner: Arc::new(RwLock::new(coordinator)),
        }
    }

    /// Installs an alert rule applied to every subsequently ingested record.
    pub fn add_rule(&self, rule: Arc<dyn AlertRule>) {
        self.inner.write().add_rule(rule);
    }

    // ============================================================================================
    // MUTATION
    // ============================================================================================

    /// Admits a record and queues alerts derived from it.
    ///
    /// # Arguments
    /// - `record`: the record to admit; its identifier must not be resident
    /// - `derived_alerts`: alerts to queue against the new record, in addition
    ///   to whatever the installed rules derive
    ///
    /// # Returns
    /// - `Ok(IngestOutcome)`: the new handle, the identifiers evicted to make
    ///   room and the alerts queued and invalidated along the way
    /// - `Err(DuplicateIdentifier | RecordTooLarge)`: nothing was changed
    ///
    /// # Example
    /// ```rust
    /// use sensor_store::{AlertDraft, AlertKind, Capacity, EventStore, Record};
    ///
    /// let store = EventStore::new(Capacity::Records(3))?;
    /// let outcome = store.ingest(
    ///     Record::now(101, "Building_A", "temperature", 72.5),
    ///     vec![AlertDraft::new(3, AlertKind::Warning, "Temperature threshold exceeded")],
    /// )?;
    /// assert!(outcome.evicted.is_empty());
    /// assert_eq!(outcome.alerts.len(), 1);
    /// # Ok::<(), sensor_store::StoreError>(())
    /// ```
    pub fn ingest(
        &self,
        record: Record,
        derived_alerts: Vec<AlertDraft>,
    ) -> StoreResult<IngestOutcome> {
        self.inner.write().ingest(record, derived_alerts)
    }

    /// Ingests records under one write lock, one result per record.
    pub fn ingest_batch(&self, records: Vec<Record>) -> Vec<StoreResult<IngestOutcome>> {
        if records.is_empty() {
            return Vec::new();
        }

        let mut coordinator = self.inner.write();
        records
            .into_iter()
            .map(|record| coordinator.ingest(record, Vec::new()))
            .collect()
    }

    /// Queues a stand-alone alert.
    ///
    /// A draft that references a record requires that record to be resident,
    /// otherwise `UnknownRecord` is returned.
    pub fn raise_alert(&self, draft: AlertDraft) -> StoreResult<AlertHandle> {
        self.inner.write().raise_alert(draft)
    }

    /// Evicts head records stamped strictly before `cutoff_ms`.
    ///
    /// Stops at the first head that is not older than the cutoff.
    pub fn expire_older_than(&self, cutoff_ms: u64) -> ExpiryOutcome {
        self.inner.write().expire_older_than(cutoff_ms)
    }

    /// Evicts the oldest resident record, tearing down its index entries and
    /// invalidating its alerts. `None` when the store is empty.
    pub fn evict_oldest(&self) -> Option<Record> {
        self.inner.write().evict_oldest()
    }

    /// Removes and returns the highest-priority valid alert.
    ///
    /// Stale entries above it are discarded. Once the queue is drained every
    /// further call returns `None`.
    pub fn pop_next_valid(&self) -> Option<Alert> {
        self.inner.write().pop_next_valid()
    }

    /// Returns a copy of the next valid alert without consuming it.
    pub fn peek_next_valid(&self) -> Option<Alert> {
        let guard = self.inner.upgradable_read();
        if !guard.has_stale_top() {
            return guard.peek_if_clean().cloned();
        }

        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        guard.peek_next_valid().cloned()
    }

    // ============================================================================================
    // QUERY OPERATIONS
    // ============================================================================================

    /// Handle of the resident record with identifier `id`.
    pub fn lookup_by_id(&self, id: RecordId) -> Option<RecordHandle> {
        self.inner.read().lookup_by_id(id)
    }

    /// Handles of the resident records in `group`, in no particular order.
    ///
    /// Empty for an unknown group. Handles are a snapshot: one may stop
    /// resolving once the read lock is released and a writer evicts it.
    pub fn lookup_by_group(&self, group: &GroupKey) -> Vec<RecordHandle> {
        self.inner.read().lookup_by_group(group)
    }

    /// Copy of the record at `handle`, if it is still resident.
    pub fn resolve(&self, handle: RecordHandle) -> Option<Record> {
        self.inner.read().resolve(handle).cloned()
    }

    /// Copy of the resident record with identifier `id`.
    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.inner.read().get(id).cloned()
    }

    /// Runs `f` against a resident record without cloning it.
    pub fn with_record<F, R>(&self, id: RecordId, f: F) -> Option<R>
    where
        F: FnOnce(&Record) -> R,
    {
        let coordinator = self.inner.read();
        coordinator.get(id).map(f)
    }

    /// Resident records of `group`, oldest first.
    pub fn records_in_group(&self, group: &GroupKey) -> Vec<Record> {
        self.inner
            .read()
            .records_in_group(group)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Groups that currently hold at least one record.
    pub fn group_keys(&self) -> Vec<GroupKey> {
        self.inner.read().group_keys()
    }

    /// Number of resident records in `group`.
    pub fn group_len(&self, group: &GroupKey) -> usize {
        self.inner.read().group_len(group)
    }

    /// Valid alerts still queued against record `id`.
    pub fn pending_alerts_for(&self, id: RecordId) -> usize {
        self.inner.read().pending_alerts_for(id)
    }

    /// Number of resident records.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Configured capacity bound.
    pub fn capacity(&self) -> Capacity {
        self.inner.read().capacity()
    }

    // ============================================================================================
    // STATISTICS & MONITORING
    // ============================================================================================

    /// Snapshot of store, index and alert counters.
    pub fn stats(&self) -> StoreStats {
        self.inner.read().stats()
    }

    /// See [`EvictionCoordinator::is_consistent`].
    pub fn is_consistent(&self) -> bool {
        self.inner.read().is_consistent()
    }
}

// ================================================================================================
// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlertKind;

    fn create_test_store(capacity: usize) -> EventStore {
        EventStore::new(Capacity::Records(capacity)).unwrap()
    }

    #[test]
    fn test_clones_share_state() {
        let store = create_test_store(4);
        let other = store.clone();

        store.ingest(Record::now(1, "A", "t", 1.0), vec![]).unwrap();
        assert_eq!(other.len(), 1);
        assert!(other.get(RecordId(1)).is_some());
    }

    #[test]
    fn test_peek_without_stale_entries_does_not_consume() {
        let store = create_test_store(4);
        store
            .ingest(
                Record::now(1, "A", "t", 1.0),
                vec![AlertDraft::new(4, AlertKind::Info, "hello")],
            )
            .unwrap();

        assert_eq!(store.peek_next_valid().unwrap().message, "hello");
        assert_eq!(store.peek_next_valid().unwrap().message, "hello");
        assert_eq!(store.pop_next_valid().unwrap().message, "hello");
        assert!(store.peek_next_valid().is_none());
    }

    #[test]
    fn test_peek_upgrades_to_discard_stale_top() {
        let store = create_test_store(1);
        store
            .ingest(
                Record::now(1, "A", "t", 1.0),
                vec![AlertDraft::new(9, AlertKind::Critical, "stale")],
            )
            .unwrap();
        store.raise_alert(AlertDraft::new(2, AlertKind::Info, "free")).unwrap();
        store.ingest(Record::now(2, "A", "t", 1.0), vec![]).unwrap();

        assert_eq!(store.stats().heap_entries, 2);
        assert_eq!(store.peek_next_valid().unwrap().message, "free");
        assert_eq!(store.stats().heap_entries, 1);
        assert_eq!(store.stats().alerts.discarded, 1);
    }

    #[test]
    fn test_ingest_batch_reports_per_record() {
        let store = create_test_store(10);
        let results = store.ingest_batch(vec![
            Record::now(1, "A", "t", 1.0),
            Record::now(1, "A", "t", 2.0),
            Record::now(2, "B", "t", 3.0),
        ]);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        assert_eq!(store.len(), 2);
        assert!(store.ingest_batch(Vec::new()).is_empty());
    }

    #[test]
    fn test_with_record_avoids_clone() {
        let store = create_test_store(2);
        store.ingest(Record::now(7, "Lab", "humidity", 45.2), vec![]).unwrap();

        let value = store.with_record(RecordId(7), |r| r.reading.value);
        assert_eq!(value, Some(45.2));
        assert!(store.with_record(RecordId(8), |r| r.reading.value).is_none());
    }

    #[test]
    fn test_lookup_by_group_resolves_handles() {
        let store = create_test_store(5);
        store.ingest(Record::now(1, "A", "t", 1.0), vec![]).unwrap();
        store.ingest(Record::now(2, "A", "t", 2.0), vec![]).unwrap();

        let mut values: Vec<f64> = store
            .lookup_by_group(&GroupKey::new("A"))
            .into_iter()
            .filter_map(|h| store.resolve(h))
            .map(|r| r.reading.value)
            .collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(values, vec![1.0, 2.0]);
    }
}
