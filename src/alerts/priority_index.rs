//! Max-heap of alerts with lazy invalidation.
//!
//! `BinaryHeap` cannot delete arbitrary entries, so cancelling an alert only
//! flips its validity flag. Stale entries stay in the heap until they reach
//! the top, where `pop_next_valid` / `peek_next_valid` discard them, or until
//! they outnumber the valid entries and `invalidate` compacts the heap. Each
//! alert is discarded at most once, so total discards never exceed pushes.
//!
//! The heap itself holds small `(priority, handle)` keys; alert bodies and
//! their flags live in a side table keyed by handle. A reverse map from
//! record to the handles of its *valid* alerts makes `invalidate` cost
//! proportional to the number of alerts that record owns.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::alerts::alert::{Alert, AlertDraft};
use crate::types::{AlertHandle, Priority, RecordId};

/// Heaps smaller than this are never compacted.
const COMPACT_MIN_ENTRIES: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct HeapKey {
    priority: Priority,
    handle: AlertHandle,
}

impl Ord for HeapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first; among equals the earlier handle wins.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.handle.cmp(&self.handle))
    }
}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
struct QueuedAlert {
    alert: Alert,
    /// Once false, never true again.
    valid: bool,
}

/// Counters for the lifetime of a priority index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PriorityStats {
    pub pushed: u64,
    pub popped: u64,
    pub invalidated: u64,
    pub discarded: u64,
}

#[derive(Debug)]
pub struct PriorityIndex {
    heap: BinaryHeap<HeapKey>,
    queued: HashMap<AlertHandle, QueuedAlert>,
    by_record: HashMap<RecordId, HashSet<AlertHandle>>,
    next_handle: u64,
    valid: usize,
    stats: PriorityStats,
}

impl Default for PriorityIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityIndex {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            queued: HashMap::new(),
            by_record: HashMap::new(),
            next_handle: 1,
            valid: 0,
            stats: PriorityStats::default(),
        }
    }

    /// Queues an alert in O(log n).
    pub fn push(&mut self, draft: AlertDraft) -> AlertHandle {
        let handle = AlertHandle(self.next_handle);
        self.next_handle += 1;

        let alert = Alert::from_draft(handle, draft);
        if let Some(record) = alert.record {
            self.by_record.entry(record).or_default().insert(handle);
        }

        self.heap.push(HeapKey {
            priority: alert.priority,
            handle,
        });
        self.queued.insert(handle, QueuedAlert { alert, valid: true });
        self.valid += 1;
        self.stats.pushed += 1;

        handle
    }

    /// Marks every pending alert derived from `record` invalid.
    ///
    /// Returns how many alerts were cancelled. Entries stay in the heap.
    pub fn invalidate(&mut self, record: RecordId) -> usize {
        let Some(handles) = self.by_record.remove(&record) else {
            return 0;
        };

        let mut cancelled = 0;
        for handle in handles {
            if let Some(queued) = self.queued.get_mut(&handle) {
                if queued.valid {
                    queued.valid = false;
                    cancelled += 1;
                }
            }
        }

        self.valid -= cancelled;
        self.stats.invalidated += cancelled as u64;

        if self.heap.len() >= COMPACT_MIN_ENTRIES && self.heap.len() > 2 * self.valid {
            self.compact();
        }
        cancelled
    }

    /// Drops every stale entry from the heap and the side table.
    ///
    /// `invalidate` runs this once stale entries outnumber valid ones in a heap
    /// of at least `COMPACT_MIN_ENTRIES`. Returns how many entries were
    /// discarded.
    pub fn compact(&mut self) -> usize {
        let before = self.heap.len();
        let queued = &self.queued;
        self.heap
            .retain(|key| queued.get(&key.handle).is_some_and(|q| q.valid));
        self.queued.retain(|_, q| q.valid);

        let discarded = before - self.heap.len();
        self.stats.discarded += discarded as u64;
        discarded
    }

    /// Removes and returns the highest-priority valid alert, discarding any
    /// stale entries above it.
    pub fn pop_next_valid(&mut self) -> Option<Alert> {
        while let Some(key) = self.heap.pop() {
            let Some(queued) = self.queued.remove(&key.handle) else {
                continue;
            };

            if !queued.valid {
                self.stats.discarded += 1;
                continue;
            }

            let alert = queued.alert;
            if let Some(record) = alert.record {
                self.unlink(record, alert.handle);
            }
            self.valid -= 1;
            self.stats.popped += 1;
            return Some(alert);
        }
        None
    }

    /// Returns the highest-priority valid alert without removing it.
    ///
    /// Stale entries encountered on the way are discarded.
    pub fn peek_next_valid(&mut self) -> Option<&Alert> {
        self.discard_stale_top();
        let key = self.heap.peek()?;
        self.queued.get(&key.handle).map(|queued| &queued.alert)
    }

    /// Read-only peek that succeeds only when the top entry is valid.
    ///
    /// `None` with [`Self::has_stale_top`] true means a mutable peek is needed.
    pub fn peek_if_clean(&self) -> Option<&Alert> {
        let key = self.heap.peek()?;
        self.queued
            .get(&key.handle)
            .filter(|queued| queued.valid)
            .map(|queued| &queued.alert)
    }

    pub fn has_stale_top(&self) -> bool {
        self.heap.peek().is_some_and(|key| {
            self.queued
                .get(&key.handle)
                .map_or(true, |queued| !queued.valid)
        })
    }

    /// Pops stale entries off the top. Returns how many were discarded.
    pub fn discard_stale_top(&mut self) -> usize {
        let mut discarded = 0;
        while self.has_stale_top() {
            if let Some(key) = self.heap.pop() {
                self.queued.remove(&key.handle);
                discarded += 1;
            }
        }
        self.stats.discarded += discarded as u64;
        discarded
    }

    /// Valid alerts still pending for `record`.
    pub fn pending_for(&self, record: RecordId) -> usize {
        self.by_record.get(&record).map_or(0, HashSet::len)
    }

    /// Number of valid pending alerts.
    pub fn len(&self) -> usize {
        self.valid
    }

    pub fn is_empty(&self) -> bool {
        self.valid == 0
    }

    /// Physical heap size, stale entries included.
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    pub fn stats(&self) -> PriorityStats {
        self.stats.clone()
    }

    fn unlink(&mut self, record: RecordId, handle: AlertHandle) {
        if let Some(handles) = self.by_record.get_mut(&record) {
            handles.remove(&handle);
            if handles.is_empty() {
                self.by_record.remove(&record);
            }
        }
    }
}
