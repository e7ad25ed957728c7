//! Mutual exclusion for time-interval records.
//!
//! Records of one type are partitioned into collision groups by a
//! [`CollisionPolicy`]; within a group no two eligible records may hold
//! overlapping `[start, end)` ranges. [`MutexRepository`] enforces this at
//! write time in front of any [`IntervalStore`], serializing concurrent
//! writers per group through a [`LockManager`].

mod error;
mod guard;
mod interval;
mod lock;
mod policy;
mod query;
mod record;
mod store;
mod validator;

pub use error::{CollisionError, MutexError, UnsupportedOperationError, ValidationError};
pub use guard::{MutexConfig, MutexRepository};
pub use interval::{overlaps, Interval};
pub use lock::{InMemoryLock, InMemoryLockManager, Lock, LockError, LockGuard, LockManager, Wait};
pub use policy::{CollisionPolicy, GroupKey, PolicyRegistry};
pub use query::{find_conflicts, OverlapQuery};
pub use record::{IntervalRecord, Versioned};
pub use store::{FieldUpdates, InMemoryIntervalStore, IntervalStore, StoreError};
pub use validator::{check_fields, validate_and_prepare, Prepared};

// Re-export the derive macro under the trait's name
pub use interval_mutex_macros::IntervalRecord;

// Re-export chrono so derived impls name the same timestamp type
pub use chrono;
