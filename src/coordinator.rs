//! Keeps the record store, both indexes and the alert heap consistent.
//!
//! The coordinator is the only code that removes records. Every removal runs
//! the same sequence before control returns to the caller:
//!
//! 1. `IdIndex::on_evict`
//! 2. `GroupIndex::on_evict`
//! 3. `PriorityIndex::invalidate`
//!
//! Record lifecycle: `Admitted → Resident → Evicted`. Index memberships exist
//! only while a record is Resident.

use log::{debug, warn};
use std::sync::Arc;

use crate::alerts::{Alert, AlertDraft, AlertRule, PriorityIndex, PriorityStats};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::index::{GroupIndex, IdIndex};
use crate::record::Record;
use crate::storage::{default_sizer, Capacity, RecordSizer, RecordStore};
use crate::types::{AlertHandle, GroupKey, RecordHandle, RecordId};

/// What a single `ingest` did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub handle: RecordHandle,
    /// Records evicted to make room, oldest first
    pub evicted: Vec<RecordId>,
    /// Alerts queued for the new record
    pub alerts: Vec<AlertHandle>,
    /// Alerts cancelled because their record was evicted
    pub invalidated: usize,
}

/// What an `expire_older_than` sweep did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpiryOutcome {
    pub expired: Vec<RecordId>,
    pub invalidated: usize,
}

/// Store-level statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreStats {
    pub resident: usize,
    pub capacity: Capacity,
    pub bytes_used: usize,
    pub groups: usize,
    /// Valid alerts waiting to be processed
    pub pending_alerts: usize,
    /// Physical heap entries, stale ones included
    pub heap_entries: usize,
    pub total_ingested: u64,
    /// Every head removal, capacity-driven or expiry-driven
    pub total_evicted: u64,
    pub total_expired: u64,
    pub rejected_duplicates: u64,
    pub alerts: PriorityStats,
}

pub struct EvictionCoordinator {
    records: RecordStore,
    ids: IdIndex,
    groups: GroupIndex,
    alerts: PriorityIndex,
    rules: Vec<Arc<dyn AlertRule>>,
    total_expired: u64,
    rejected_duplicates: u64,
}

impl std::fmt::Debug for EvictionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionCoordinator")
            .field("records", &self.records)
            .field("groups", &self.groups.group_count())
            .field("pending_alerts", &self.alerts.len())
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl EvictionCoordinator {
    pub fn new(capacity: Capacity) -> StoreResult<Self> {
        Self::with_sizer(capacity, default_sizer())
    }

    pub fn with_sizer(capacity: Capacity, sizer: RecordSizer) -> StoreResult<Self> {
        Ok(Self {
            records: RecordStore::with_sizer(capacity, sizer)?,
            ids: IdIndex::new(),
            groups: GroupIndex::new(),
            alerts: PriorityIndex::new(),
            rules: Vec::new(),
            total_expired: 0,
            rejected_duplicates: 0,
        })
    }

    /// Builds a coordinator with the configured capacity and threshold rules.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let mut coordinator = Self::new(config.capacity)?;
        for rule in &config.rules {
            coordinator.add_rule(Arc::new(rule.clone()));
        }
        Ok(coordinator)
    }

    pub fn add_rule(&mut self, rule: Arc<dyn AlertRule>) {
        self.rules.push(rule);
    }

    // ============================================================================================
    // MUTATION
    // ============================================================================================

    /// Admits a record, evicting as capacity requires, then queues the given
    /// alerts plus whatever the configured rules derive.
    ///
    /// Every alert queued here references the new record. A duplicate
    /// identifier is rejected before anything is evicted.
    pub fn ingest(
        &mut self,
        record: Record,
        derived_alerts: Vec<AlertDraft>,
    ) -> StoreResult<IngestOutcome> {
        let id = record.id;
        if self.ids.contains(id) {
            self.rejected_duplicates += 1;
            warn!("rejected duplicate record {}", id);
            return Err(StoreError::DuplicateIdentifier(id));
        }
        let group = record.group.clone();

        let appended = self.records.append(record)?;

        let mut outcome = IngestOutcome {
            handle: appended.handle,
            ..Default::default()
        };
        for old in &appended.evicted {
            outcome.invalidated += self.retire(old);
            outcome.evicted.push(old.id);
        }
        if !outcome.evicted.is_empty() {
            debug!(
                "admitting {} evicted {} record(s), {} alert(s) invalidated",
                id,
                outcome.evicted.len(),
                outcome.invalidated
            );
        }

        self.ids.on_insert(id, appended.handle);
        self.groups.on_insert(id, &group, appended.handle);

        let mut drafts = derived_alerts;
        if let Some(stored) = self.records.get(appended.handle) {
            drafts.extend(self.rules.iter().filter_map(|rule| rule.derive(stored)));
        }
        for draft in drafts {
            outcome.alerts.push(self.alerts.push(draft.for_record(id)));
        }

        Ok(outcome)
    }

    /// Queues an alert outside of ingestion.
    ///
    /// An alert may only reference a resident record, otherwise nothing would
    /// ever invalidate it.
    pub fn raise_alert(&mut self, draft: AlertDraft) -> StoreResult<AlertHandle> {
        if let Some(record) = draft.record {
            if !self.ids.contains(record) {
                return Err(StoreError::UnknownRecord(record));
            }
        }
        Ok(self.alerts.push(draft))
    }

    /// Evicts every head record stamped strictly before `cutoff_ms`.
    ///
    /// Stops at the first head that is not older, so records stamped out of
    /// order age out together with their insertion neighbours.
    pub fn expire_older_than(&mut self, cutoff_ms: u64) -> ExpiryOutcome {
        let mut outcome = ExpiryOutcome::default();

        while self
            .records
            .peek_oldest()
            .is_some_and(|head| head.timestamp_ms < cutoff_ms)
        {
            let Some(old) = self.records.evict_oldest() else {
                break;
            };
            outcome.invalidated += self.retire(&old);
            outcome.expired.push(old.id);
        }

        self.total_expired += outcome.expired.len() as u64;
        outcome
    }

    /// Explicitly evicts the oldest record.
    pub fn evict_oldest(&mut self) -> Option<Record> {
        let old = self.records.evict_oldest()?;
        self.retire(&old);
        Some(old)
    }

    pub fn pop_next_valid(&mut self) -> Option<Alert> {
        self.alerts.pop_next_valid()
    }

    /// Peeks the next valid alert, discarding stale entries above it.
    pub fn peek_next_valid(&mut self) -> Option<&Alert> {
        self.alerts.peek_next_valid()
    }

    /// Resident → Evicted. Returns the number of alerts invalidated.
    fn retire(&mut self, record: &Record) -> usize {
        self.ids.on_evict(record.id);
        self.groups.on_evict(record.id, &record.group);
        self.alerts.invalidate(record.id)
    }

    // ============================================================================================
    // QUERIES
    // ============================================================================================

    pub fn lookup_by_id(&self, id: RecordId) -> Option<RecordHandle> {
        self.ids.lookup_by_id(id)
    }

    pub fn lookup_by_group(&self, group: &GroupKey) -> Vec<RecordHandle> {
        self.groups.lookup_by_group(group).collect()
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        let handle = self.ids.lookup_by_id(id)?;
        self.records.get(handle)
    }

    pub fn resolve(&self, handle: RecordHandle) -> Option<&Record> {
        self.records.get(handle)
    }

    /// Resident records of `group`, oldest first.
    pub fn records_in_group(&self, group: &GroupKey) -> Vec<&Record> {
        let mut handles: Vec<RecordHandle> = self.groups.lookup_by_group(group).collect();
        handles.sort_unstable();
        handles
            .into_iter()
            .filter_map(|handle| self.records.get(handle))
            .collect()
    }

    pub fn group_keys(&self) -> Vec<GroupKey> {
        self.groups.groups().cloned().collect()
    }

    /// Number of resident records in `group`; zero for an unknown key.
    pub fn group_len(&self, group: &GroupKey) -> usize {
        self.groups.group_len(group)
    }

    pub fn group_count(&self) -> usize {
        self.groups.group_count()
    }

    pub fn peek_oldest(&self) -> Option<&Record> {
        self.records.peek_oldest()
    }

    /// Read-only alert peek; `None` when the heap is empty or its top is stale.
    pub fn peek_if_clean(&self) -> Option<&Alert> {
        self.alerts.peek_if_clean()
    }

    pub fn has_stale_top(&self) -> bool {
        self.alerts.has_stale_top()
    }

    pub fn pending_alerts_for(&self, id: RecordId) -> usize {
        self.alerts.pending_for(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> Capacity {
        self.records.capacity()
    }

    pub fn stats(&self) -> StoreStats {
        let storage = self.records.stats();
        StoreStats {
            resident: storage.resident,
            capacity: self.records.capacity(),
            bytes_used: storage.bytes_used,
            groups: self.groups.group_count(),
            pending_alerts: self.alerts.len(),
            heap_entries: self.alerts.heap_len(),
            total_ingested: storage.total_appended,
            total_evicted: storage.total_evicted,
            total_expired: self.total_expired,
            rejected_duplicates: self.rejected_duplicates,
            alerts: self.alerts.stats(),
        }
    }

    /// Cross-checks the record store against both indexes.
    ///
    /// O(n). Holds by construction between calls; exposed for tests.
    pub fn is_consistent(&self) -> bool {
        let n = self.records.len();
        if self.ids.len() != n || self.groups.len() != n {
            return false;
        }

        let records_indexed = self.records.iter().all(|record| {
            self.ids.lookup_by_id(record.id) == Some(record.handle())
                && self.groups.contains(record.id, &record.group)
        });
        let ids_resident = self.ids.iter().all(|(id, handle)| {
            self.records
                .get(handle)
                .is_some_and(|record| record.id == id)
        });
        records_indexed && ids_resident
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::ThresholdRule;
    use crate::types::AlertKind;

    fn reading(id: u64, group: &str, ts: u64) -> Record {
        let mut record = Record::now(id, group, "temperature", 20.0);
        record.timestamp_ms = ts;
        record
    }

    fn warning(priority: u32) -> AlertDraft {
        AlertDraft::new(priority, AlertKind::Warning, "threshold")
    }

    #[test]
    fn test_capacity_eviction_tears_down_all_views() {
        let mut coord = EvictionCoordinator::new(Capacity::Records(3)).unwrap();
        coord.ingest(reading(1, "G", 1), vec![warning(5)]).unwrap();
        coord.ingest(reading(2, "G", 2), vec![]).unwrap();
        coord.ingest(reading(3, "H", 3), vec![]).unwrap();

        let outcome = coord.ingest(reading(4, "H", 4), vec![]).unwrap();
        assert_eq!(outcome.evicted, vec![RecordId(1)]);
        assert_eq!(outcome.invalidated, 1);

        assert!(coord.lookup_by_id(RecordId(1)).is_none());
        assert_eq!(coord.records_in_group(&GroupKey::new("G")).len(), 1);
        assert_eq!(coord.group_len(&GroupKey::new("H")), 2);
        assert_eq!(coord.group_len(&GroupKey::new("missing")), 0);
        assert!(coord.pop_next_valid().is_none());
        assert!(coord.is_consistent());
    }

    #[test]
    fn test_duplicate_rejected_without_eviction() {
        let mut coord = EvictionCoordinator::new(Capacity::Records(2)).unwrap();
        coord.ingest(reading(1, "G", 1), vec![]).unwrap();
        coord.ingest(reading(2, "G", 2), vec![]).unwrap();

        let err = coord.ingest(reading(2, "G", 3), vec![warning(1)]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentifier(RecordId(2))));
        assert_eq!(coord.len(), 2);
        assert!(coord.get(RecordId(1)).is_some());
        assert_eq!(coord.stats().rejected_duplicates, 1);
        assert!(coord.pop_next_valid().is_none());
    }

    #[test]
    fn test_identifier_reuse_after_eviction() {
        let mut coord = EvictionCoordinator::new(Capacity::Records(1)).unwrap();
        coord.ingest(reading(1, "G", 1), vec![warning(3)]).unwrap();
        coord.ingest(reading(2, "G", 2), vec![]).unwrap();

        coord.ingest(reading(1, "K", 3), vec![warning(2)]).unwrap();
        let reused = coord.get(RecordId(1)).unwrap();
        assert_eq!(reused.group.as_str(), "K");

        // The old alert for id 1 was cancelled; only the new one surfaces.
        let alert = coord.pop_next_valid().unwrap();
        assert_eq!(alert.priority.0, 2);
        assert!(coord.pop_next_valid().is_none());
    }

    #[test]
    fn test_expire_older_than_stops_at_first_fresh_head() {
        let mut coord = EvictionCoordinator::new(Capacity::Records(10)).unwrap();
        coord.ingest(reading(1, "G", 100), vec![warning(1)]).unwrap();
        coord.ingest(reading(2, "G", 200), vec![]).unwrap();
        coord.ingest(reading(3, "G", 300), vec![]).unwrap();

        let outcome = coord.expire_older_than(250);
        assert_eq!(outcome.expired, vec![RecordId(1), RecordId(2)]);
        assert_eq!(outcome.invalidated, 1);
        assert_eq!(coord.len(), 1);
        assert_eq!(coord.stats().total_expired, 2);

        assert!(coord.expire_older_than(250).expired.is_empty());
        assert!(coord.is_consistent());
    }

    #[test]
    fn test_rules_derive_alerts_on_ingest() {
        let mut coord = EvictionCoordinator::new(Capacity::Records(10)).unwrap();
        coord.add_rule(Arc::new(ThresholdRule::new(
            "temperature",
            70.0,
            3,
            AlertKind::Warning,
        )));

        let hot = Record::now(101, "Building_A", "temperature", 72.5);
        let outcome = coord.ingest(hot, vec![]).unwrap();
        assert_eq!(outcome.alerts.len(), 1);
        assert_eq!(coord.pending_alerts_for(RecordId(101)), 1);

        let cool = Record::now(102, "Building_A", "temperature", 60.0);
        assert!(coord.ingest(cool, vec![]).unwrap().alerts.is_empty());
    }

    #[test]
    fn test_raise_alert_requires_resident_record() {
        let mut coord = EvictionCoordinator::new(Capacity::Records(2)).unwrap();
        coord.ingest(reading(1, "G", 1), vec![]).unwrap();

        assert!(coord.raise_alert(warning(4).for_record(RecordId(1))).is_ok());
        assert!(coord.raise_alert(warning(4)).is_ok());
        assert!(matches!(
            coord.raise_alert(warning(4).for_record(RecordId(9))),
            Err(StoreError::UnknownRecord(RecordId(9)))
        ));
        assert_eq!(coord.stats().pending_alerts, 2);
    }

    #[test]
    fn test_explicit_evict_oldest() {
        let mut coord = EvictionCoordinator::new(Capacity::Records(4)).unwrap();
        coord.ingest(reading(1, "Z", 1), vec![warning(9)]).unwrap();

        let old = coord.evict_oldest().unwrap();
        assert_eq!(old.id, RecordId(1));
        assert_eq!(coord.group_count(), 0);
        assert!(coord.peek_next_valid().is_none());
        assert!(coord.evict_oldest().is_none());
    }

    #[test]
    fn test_from_config_installs_rules() {
        let config = StoreConfig {
            rules: vec![ThresholdRule::new("humidity", 50.0, 7, AlertKind::Error)],
            ..StoreConfig::with_capacity(Capacity::Records(5))
        };
        let mut coord = EvictionCoordinator::from_config(&config).unwrap();
        coord
            .ingest(Record::now(202, "Building_B", "humidity", 52.7), vec![])
            .unwrap();

        let alert = coord.pop_next_valid().unwrap();
        assert_eq!(alert.kind, AlertKind::Error);
        assert_eq!(alert.record, Some(RecordId(202)));
    }
}
