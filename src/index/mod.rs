//! Non-owning views over the record store.
//!
//! - [`IdIndex`]: identifier → handle, for point lookup
//! - [`GroupIndex`]: group key → identifiers, for grouped retrieval
//!
//! Neither index owns records; both are maintained only by the coordinator.

pub mod group_index;
pub mod id_index;

pub use group_index::GroupIndex;
pub use id_index::IdIndex;
