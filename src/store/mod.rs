//! Persistent storage for interval records.
//!
//! The store is an external collaborator: the write guard only needs a
//! predicate read, single-record insert/update/delete and a field-level mass
//! update. `InMemoryIntervalStore` implements it over a `HashMap` for tests
//! and embedded use.

mod in_memory;
#[allow(clippy::module_inception)]
mod store;

use thiserror::Error;

pub use in_memory::InMemoryIntervalStore;
pub use store::{FieldUpdates, IntervalStore};

/// Error type for store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on {collection}:{id} (expected version {expected}, actual {actual})")]
    ConcurrencyConflict {
        collection: String,
        id: String,
        expected: u64,
        actual: u64,
    },
    /// Serialization/deserialization error.
    #[error("record serialization error: {0}")]
    Serde(String),
    /// Storage-level error.
    #[error("record storage error: {0}")]
    Storage(String),
    /// Record not found.
    #[error("record not found: {collection}:{id}")]
    NotFound { collection: String, id: String },
    /// A mass update named a field the record does not have.
    #[error("unknown field `{field}` on {collection}")]
    UnknownField {
        collection: &'static str,
        field: String,
    },
    /// A mass update was refused for one record; nothing was written.
    #[error("update of {collection}:{id} rejected")]
    Rejected {
        collection: &'static str,
        id: String,
    },
}
