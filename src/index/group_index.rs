//! Group key → resident identifiers.
//!
//! Each bucket is a dense `Vec` plus a position map so that removal is a
//! swap-with-last-and-pop. Buckets are dropped as soon as they empty, so a
//! location with no resident sensors holds no memory.

use std::collections::HashMap;

use crate::types::{GroupKey, RecordHandle, RecordId};

#[derive(Debug, Default)]
struct Bucket {
    members: Vec<(RecordId, RecordHandle)>,
    slots: HashMap<RecordId, usize>,
}

impl Bucket {
    fn insert(&mut self, id: RecordId, handle: RecordHandle) {
        if let Some(&slot) = self.slots.get(&id) {
            self.members[slot].1 = handle;
            return;
        }
        self.slots.insert(id, self.members.len());
        self.members.push((id, handle));
    }

    fn remove(&mut self, id: RecordId) -> bool {
        let slot = match self.slots.remove(&id) {
            Some(slot) => slot,
            None => return false,
        };

        self.members.swap_remove(slot);
        if let Some(&(moved, _)) = self.members.get(slot) {
            self.slots.insert(moved, slot);
        }
        true
    }
}

#[derive(Debug, Default)]
pub struct GroupIndex {
    buckets: HashMap<GroupKey, Bucket>,
    members: usize,
}

impl GroupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_insert(&mut self, id: RecordId, group: &GroupKey, handle: RecordHandle) {
        let bucket = self.buckets.entry(group.clone()).or_default();
        let before = bucket.members.len();
        bucket.insert(id, handle);
        self.members += bucket.members.len() - before;
    }

    /// Removes `id` from the bucket for `group`. Returns whether it was there.
    pub fn on_evict(&mut self, id: RecordId, group: &GroupKey) -> bool {
        let Some(bucket) = self.buckets.get_mut(group) else {
            return false;
        };

        let removed = bucket.remove(id);
        if removed {
            self.members -= 1;
        }
        if bucket.members.is_empty() {
            self.buckets.remove(group);
        }
        removed
    }

    /// Handles of the records in `group`, in no particular order.
    pub fn lookup_by_group<'a>(
        &'a self,
        group: &GroupKey,
    ) -> impl Iterator<Item = RecordHandle> + 'a {
        self.buckets
            .get(group)
            .into_iter()
            .flat_map(|bucket| bucket.members.iter().map(|(_, handle)| *handle))
    }

    pub fn group_len(&self, group: &GroupKey) -> usize {
        self.buckets.get(group).map_or(0, |b| b.members.len())
    }

    /// Total identifiers across all buckets.
    pub fn len(&self) -> usize {
        self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members == 0
    }

    pub fn group_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupKey> {
        self.buckets.keys()
    }

    pub fn contains(&self, id: RecordId, group: &GroupKey) -> bool {
        self.buckets
            .get(group)
            .is_some_and(|b| b.slots.contains_key(&id))
    }
}
