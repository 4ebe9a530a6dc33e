//! Time-based expiry.
//!
//! 1. **On-demand sweep** (ExpiryService): applies the retention window once
//! 2. **Scheduled sweep** (ExpiryScheduler): periodic background task

pub mod scheduler;
pub mod service;

pub use scheduler::ExpiryScheduler;
pub use service::{ExpiryService, ExpiryStats};
