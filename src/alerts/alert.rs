//! Alert values.
//!
//! Callers build an [`AlertDraft`]; the priority index assigns it a handle
//! and hands it back as an [`Alert`] when it is popped or peeked.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{AlertHandle, AlertKind, Priority, RecordId};

/// An alert before it is queued.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertDraft {
    /// Higher values are processed first
    pub priority: Priority,
    /// Severity label
    pub kind: AlertKind,
    /// Human-readable description
    pub message: String,
    /// Record this alert was derived from, if any
    #[serde(default)]
    pub record: Option<RecordId>,
}

impl AlertDraft {
    /// Creates a draft that references no record.
    ///
    /// # Example
    /// ```rust
    /// use sensor_store::{AlertDraft, AlertKind, RecordId};
    ///
    /// let draft = AlertDraft::new(9, AlertKind::Critical, "Critical system failure")
    ///     .for_record(RecordId(101));
    /// assert_eq!(draft.record, Some(RecordId(101)));
    /// ```
    pub fn new(priority: u32, kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            priority: Priority(priority),
            kind,
            message: message.into(),
            record: None,
        }
    }

    /// Attaches a back-reference to the originating record.
    pub fn for_record(mut self, record: RecordId) -> Self {
        self.record = Some(record);
        self
    }
}

/// A queued alert as handed back to callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    /// Assigned on push; also the insertion sequence used for tie-breaks
    pub handle: AlertHandle,
    pub priority: Priority,
    pub kind: AlertKind,
    pub message: String,
    /// Record whose eviction invalidates this alert
    pub record: Option<RecordId>,
}

impl Alert {
    pub(crate) fn from_draft(handle: AlertHandle, draft: AlertDraft) -> Self {
        Self {
            handle,
            priority: draft.priority,
            kind: draft.kind,
            message: draft.message,
            record: draft.record,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Priority {}: {} ({})",
            self.priority, self.message, self.kind
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_processing_format() {
        let alert = Alert::from_draft(
            AlertHandle(1),
            AlertDraft::new(9, AlertKind::Critical, "Critical system failure"),
        );
        assert_eq!(
            alert.to_string(),
            "Priority 9: Critical system failure (CRITICAL)"
        );
    }

    #[test]
    fn test_for_record_sets_back_reference() {
        let draft = AlertDraft::new(1, AlertKind::Info, "Low battery detected").for_record(RecordId(5));
        assert_eq!(draft.record, Some(RecordId(5)));
    }
}
