//! Record storage.
//!
//! A single FIFO buffer that owns every resident record:
//! - **Append** at the tail, stamping a contiguous sequence number
//! - **Evict** at the head, either to honour capacity or on explicit expiry
//!
//! Capacity is a record count or a byte budget. Index maintenance for evicted
//! records is the coordinator's job, not the store's.

pub mod record_store;
pub mod types;

pub use record_store::{Appended, RecordStore};
pub use types::{default_sizer, Capacity, RecordSizer, StorageStats};
