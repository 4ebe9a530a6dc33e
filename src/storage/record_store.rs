//! FIFO record buffer bounded by a record count or a byte budget.
//!
//! Records are appended at the tail and evicted from the head, so insertion
//! order is eviction order. Every appended record is stamped with the next
//! sequence number; sequences are contiguous, which lets a handle resolve to
//! its buffer slot as `handle - head_sequence`.

use std::collections::VecDeque;

use crate::error::{StoreError, StoreResult};
use crate::record::Record;
use crate::storage::types::{default_sizer, Capacity, RecordSizer, StorageStats};
use crate::types::RecordHandle;

/// Result of a successful append.
#[derive(Debug)]
pub struct Appended {
    /// Handle of the record that was just admitted
    pub handle: RecordHandle,
    /// Records removed from the head to make room, oldest first
    pub evicted: Vec<Record>,
}

pub struct RecordStore {
    records: VecDeque<Record>,
    capacity: Capacity,
    sizer: RecordSizer,
    bytes_used: usize,
    next_sequence: u64,
    total_appended: u64,
    total_evicted: u64,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("len", &self.records.len())
            .field("capacity", &self.capacity)
            .field("bytes_used", &self.bytes_used)
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}

impl RecordStore {
    /// Creates a store sized with [`Record::approx_size`].
    pub fn new(capacity: Capacity) -> StoreResult<Self> {
        Self::with_sizer(capacity, default_sizer())
    }

    /// Creates a store with a caller-supplied byte-size accessor.
    ///
    /// The sizer only matters for [`Capacity::Bytes`]; it must return the same
    /// value for the same record every time.
    pub fn with_sizer(capacity: Capacity, sizer: RecordSizer) -> StoreResult<Self> {
        capacity.validate()?;

        let initial = match capacity {
            Capacity::Records(n) => n.min(4096),
            Capacity::Bytes(_) => 0,
        };

        Ok(Self {
            records: VecDeque::with_capacity(initial),
            capacity,
            sizer,
            bytes_used: 0,
            next_sequence: 1,
            total_appended: 0,
            total_evicted: 0,
        })
    }

    /// Appends at the tail, evicting from the head first when full.
    ///
    /// Under a byte budget one append may evict several records. A record
    /// larger than the whole budget is rejected and nothing is evicted.
    pub fn append(&mut self, mut record: Record) -> StoreResult<Appended> {
        let size = (self.sizer)(&record);

        if let Capacity::Bytes(budget) = self.capacity {
            if size > budget {
                return Err(StoreError::RecordTooLarge {
                    id: record.id,
                    size,
                    budget,
                });
            }
        }

        let mut evicted = Vec::new();
        while self.needs_room_for(size) {
            match self.evict_oldest() {
                Some(old) => evicted.push(old),
                None => break,
            }
        }

        let handle = RecordHandle(self.next_sequence);
        record.stamp(self.next_sequence);
        self.next_sequence += 1;
        self.bytes_used += size;
        self.total_appended += 1;
        self.records.push_back(record);

        Ok(Appended { handle, evicted })
    }

    /// Removes and returns the head record, if any.
    pub fn evict_oldest(&mut self) -> Option<Record> {
        let record = self.records.pop_front()?;
        let size = (self.sizer)(&record);
        self.bytes_used = self.bytes_used.saturating_sub(size);
        self.total_evicted += 1;
        Some(record)
    }

    #[inline]
    pub fn peek_oldest(&self) -> Option<&Record> {
        self.records.front()
    }

    /// Resolves a handle to its record in O(1).
    pub fn get(&self, handle: RecordHandle) -> Option<&Record> {
        let head = self.head_sequence();
        if handle.0 < head {
            return None;
        }
        self.records.get((handle.0 - head) as usize)
    }

    /// Iterates resident records oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    #[inline]
    pub fn bytes_used(&self) -> usize {
        self.bytes_used
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            resident: self.records.len(),
            bytes_used: self.bytes_used,
            total_appended: self.total_appended,
            total_evicted: self.total_evicted,
        }
    }

    fn head_sequence(&self) -> u64 {
        self.next_sequence - self.records.len() as u64
    }

    fn needs_room_for(&self, incoming: usize) -> bool {
        match self.capacity {
            Capacity::Records(max) => self.records.len() >= max,
            Capacity::Bytes(budget) => self.bytes_used + incoming > budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn fixed_size(bytes: usize) -> RecordSizer {
        Arc::new(move |_: &Record| bytes)
    }

    #[test]
    fn test_append_stamps_contiguous_sequences() {
        let mut store = RecordStore::new(Capacity::Records(10)).unwrap();
        let a = store.append(Record::now(1, "A", "t", 1.0)).unwrap();
        let b = store.append(Record::now(2, "A", "t", 2.0)).unwrap();

        assert_eq!(b.handle.0, a.handle.0 + 1);
        assert!(a.evicted.is_empty());
        assert_eq!(store.get(b.handle).unwrap().sequence(), b.handle.0);
    }

    #[test]
    fn test_count_capacity_evicts_head() {
        let mut store = RecordStore::new(Capacity::Records(2)).unwrap();
        let first = store.append(Record::now(1, "A", "t", 1.0)).unwrap();
        store.append(Record::now(2, "A", "t", 1.0)).unwrap();
        let third = store.append(Record::now(3, "A", "t", 1.0)).unwrap();

        assert_eq!(third.evicted.len(), 1);
        assert_eq!(third.evicted[0].id.0, 1);
        assert_eq!(store.len(), 2);
        assert!(store.get(first.handle).is_none());
        assert_eq!(store.peek_oldest().unwrap().id.0, 2);
    }

    #[test]
    fn test_byte_budget_evicts_batch() {
        let sizes: RecordSizer = Arc::new(|r: &Record| if r.id.0 == 99 { 250 } else { 100 });
        let mut store = RecordStore::with_sizer(Capacity::Bytes(300), sizes).unwrap();
        for id in 1..=3 {
            store.append(Record::now(id, "A", "t", 1.0)).unwrap();
        }
        assert_eq!(store.bytes_used(), 300);

        let big = store.append(Record::now(99, "A", "t", 1.0)).unwrap();
        let evicted: Vec<u64> = big.evicted.iter().map(|r| r.id.0).collect();
        assert_eq!(evicted, vec![1, 2, 3]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.bytes_used(), 250);
    }

    #[test]
    fn test_oversized_record_rejected_without_eviction() {
        let sizes: RecordSizer = Arc::new(|r: &Record| if r.id.0 == 2 { 150 } else { 60 });
        let mut store = RecordStore::with_sizer(Capacity::Bytes(100), sizes).unwrap();
        store.append(Record::now(1, "A", "t", 1.0)).unwrap();

        let err = store.append(Record::now(2, "A", "t", 1.0)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::RecordTooLarge {
                size: 150,
                budget: 100,
                ..
            }
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(store.bytes_used(), 60);
        assert_eq!(store.peek_oldest().unwrap().id.0, 1);
    }

    #[test]
    fn test_evict_oldest_releases_bytes() {
        let mut store = RecordStore::with_sizer(Capacity::Bytes(1000), fixed_size(40)).unwrap();
        for id in 1..=3 {
            store.append(Record::now(id, "A", "t", 1.0)).unwrap();
        }
        assert_eq!(store.bytes_used(), 120);

        let oldest = store.evict_oldest().unwrap();
        assert_eq!(oldest.id.0, 1);
        assert_eq!(store.bytes_used(), 80);
        assert_eq!(store.stats().total_evicted, 1);
    }

    #[test]
    fn test_evict_oldest_on_empty_store() {
        let mut store = RecordStore::new(Capacity::Records(3)).unwrap();
        assert!(store.evict_oldest().is_none());
        assert!(store.peek_oldest().is_none());
        assert_eq!(store.stats(), StorageStats::default());
    }

    #[test]
    fn test_zero_capacity_is_a_configuration_error() {
        assert!(matches!(
            RecordStore::new(Capacity::Records(0)),
            Err(StoreError::CapacityViolation(_))
        ));
    }
}
