//! The interval record contract.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::interval::Interval;
use crate::policy::CollisionPolicy;

/// An entity carrying a `[start, end)` range subject to the no-overlap invariant.
///
/// Usually implemented with `#[derive(IntervalRecord)]`. Identity, start and
/// end are optional on the value so that an unsaved record, or one with a
/// missing bound, is representable; the write guard rejects the latter.
pub trait IntervalRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name for this record type. Maps to a table, a collection or
    /// a key prefix depending on the store.
    const COLLECTION: &'static str;

    /// Serialized name of the identity field.
    const ID_FIELD: &'static str = "id";

    /// Serialized name of the start field, used to recognise mass updates that
    /// touch the interval.
    const START_FIELD: &'static str = "start";

    /// Serialized name of the end field.
    const END_FIELD: &'static str = "end";

    /// Store-assigned identity, `None` before the first create.
    fn id(&self) -> Option<&str>;

    /// Sets or clears the identity. Clearing it makes the next `save` create
    /// a new record.
    fn set_id(&mut self, id: Option<String>);

    fn start(&self) -> Option<DateTime<Utc>>;

    fn end(&self) -> Option<DateTime<Utc>>;

    /// Collision policy for this type. Resolved once per type and cached.
    fn collision_policy() -> CollisionPolicy<Self> {
        CollisionPolicy::default()
    }

    /// The record's interval, if both bounds are set and ordered.
    fn interval(&self) -> Option<Interval> {
        Interval::new(self.start()?, self.end()?)
    }
}

/// A stored record together with its version, for optimistic concurrency.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub data: T,
    pub version: u64,
}
