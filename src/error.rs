//! Error type shared by the store, its configuration and the expiry service.
//!
//! Lookups never fail: unknown identifiers and groups yield `None` or an
//! empty result. Only admission and configuration return errors.

use thiserror::Error;

use crate::types::RecordId;

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Ingest of an identifier that is already resident. Nothing was evicted.
    #[error("record {0} is already resident")]
    DuplicateIdentifier(RecordId),

    /// Zero record count or zero byte budget.
    #[error("invalid capacity: {0}")]
    CapacityViolation(String),

    /// A single record is larger than the whole byte budget.
    #[error("record {id} needs {size} bytes but the budget is {budget}")]
    RecordTooLarge { id: RecordId, size: usize, budget: usize },

    /// An alert referenced a record that is not resident.
    #[error("record {0} is not resident")]
    UnknownRecord(RecordId),

    /// Configuration could not be read, parsed or validated.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type StoreResult<T> = Result<T, StoreError>;
