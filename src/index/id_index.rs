//! Identifier → handle lookup.
//!
//! Entries exist exactly while the record is resident. The coordinator
//! inserts after a successful append and removes on eviction.

use std::collections::HashMap;

use crate::types::{RecordHandle, RecordId};

/// Identifier → handle map over resident records.
#[derive(Debug, Default)]
pub struct IdIndex {
    handles: HashMap<RecordId, RecordHandle>,
}

impl IdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resident record. Returns the handle it replaced, which is
    /// always `None` when callers reject duplicates first.
    pub fn on_insert(&mut self, id: RecordId, handle: RecordHandle) -> Option<RecordHandle> {
        self.handles.insert(id, handle)
    }

    /// Removes an evicted record. Returns its handle if it was indexed.
    pub fn on_evict(&mut self, id: RecordId) -> Option<RecordHandle> {
        self.handles.remove(&id)
    }

    /// Handle of the resident record with this identifier, if any.
    #[inline]
    pub fn lookup_by_id(&self, id: RecordId) -> Option<RecordHandle> {
        self.handles.get(&id).copied()
    }

    #[inline]
    pub fn contains(&self, id: RecordId) -> bool {
        self.handles.contains_key(&id)
    }

    /// Number of indexed identifiers; equals the resident record count.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// All `(identifier, handle)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, RecordHandle)> + '_ {
        self.handles.iter().map(|(id, handle)| (*id, *handle))
    }
}
