use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::lock::LockError;
use crate::policy::GroupKey;
use crate::store::StoreError;

/// Missing or malformed input on an interval record.
///
/// Fixed by correcting the record; never retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{collection}: start is required")]
    MissingStart { collection: &'static str },

    #[error("{collection}: end is required")]
    MissingEnd { collection: &'static str },

    #[error("{collection}: end ({end}) must be after start ({start})")]
    EmptyInterval {
        collection: &'static str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Update requested for a record that was never persisted.
    #[error("{collection}: record has no identity; create it first")]
    MissingIdentity { collection: &'static str },

    /// Create requested for a record that already has an identity.
    #[error("{collection}: record already has identity {id}; clear it to save as new")]
    IdentityAlreadyAssigned { collection: &'static str, id: String },

    #[error("{collection}: collision field `{field}` does not exist on the record")]
    UnknownCollisionField {
        collection: &'static str,
        field: String,
    },

    #[error("{collection}: field `{field}` does not exist on the record")]
    UnknownField {
        collection: &'static str,
        field: String,
    },

    #[error("{collection}: record does not serialize to an object")]
    NotAnObject { collection: &'static str },
}

/// A conflicting interval already exists in the same collision group.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{collection}: [{start}, {end}) collides with {conflicting:?} in group {group}")]
pub struct CollisionError {
    pub collection: &'static str,
    pub group: GroupKey,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Identities of the stored records that overlap, sorted.
    pub conflicting: Vec<String>,
}

/// A multi-record interval mutation was attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{collection}: {operation} is not supported for interval records")]
pub struct UnsupportedOperationError {
    pub collection: &'static str,
    pub operation: &'static str,
}

/// Everything a guarded write can fail with.
#[derive(Error, Debug)]
pub enum MutexError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Collision(#[from] CollisionError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperationError),

    /// Transient contention: the group lock could not be taken in time, or a
    /// concurrent writer changed the record first. Safe to retry.
    #[error("contention on {key}: {reason}")]
    Contention { key: String, reason: String },

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

impl MutexError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MutexError::Contention { .. })
    }
}

impl From<StoreError> for MutexError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrencyConflict {
                collection,
                id,
                expected,
                actual,
            } => MutexError::Contention {
                key: format!("{}:{}", collection, id),
                reason: format!("expected version {}, found {}", expected, actual),
            },
            other => MutexError::Store(other),
        }
    }
}
