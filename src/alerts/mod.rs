//! Alerts: derived, priority-ordered units of work.
//!
//! Alerts may reference the record they were derived from. When that record
//! is evicted its alerts are invalidated lazily (see [`PriorityIndex`]).

pub mod alert;
pub mod priority_index;
pub mod rules;

pub use alert::{Alert, AlertDraft};
pub use priority_index::{PriorityIndex, PriorityStats};
pub use rules::{AlertRule, ThresholdRule};
