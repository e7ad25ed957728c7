//! Collision policies: which records compete for the same time slots.
//!
//! A policy names the fields whose values partition records of one type into
//! collision groups, and optionally a predicate that exempts records from
//! collision checks altogether (parallel-capable resources, soft-deleted rows).
//!
//! ```ignore
//! fn collision_policy() -> CollisionPolicy<Self> {
//!     CollisionPolicy::new(["room.id"])
//!         .excluding(|b: &Self| b.room.can_parallel || b.deleted_at.is_some())
//! }
//! ```

mod registry;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ValidationError;
use crate::record::IntervalRecord;

pub use registry::PolicyRegistry;

type ExclusionPredicate<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// Identifies a collision group: the serialized values of the collision
/// fields, in declaration order.
///
/// A type without collision fields has exactly one group, the empty key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupKey(Vec<Value>);

impl GroupKey {
    /// The single group shared by every record of a type without collision fields.
    pub fn global() -> Self {
        GroupKey(Vec::new())
    }

    pub fn new(values: Vec<Value>) -> Self {
        GroupKey(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn is_global(&self) -> bool {
        self.0.is_empty()
    }

    /// Lock key scoping a collision group within a collection.
    pub fn lock_key(&self, collection: &str) -> String {
        format!("{}:{}", collection, self)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Array(self.0.clone()))
    }
}

/// Per-type collision configuration.
pub struct CollisionPolicy<R> {
    collision_fields: Vec<String>,
    exclusion: Option<ExclusionPredicate<R>>,
}

impl<R> Default for CollisionPolicy<R> {
    fn default() -> Self {
        CollisionPolicy {
            collision_fields: Vec::new(),
            exclusion: None,
        }
    }
}

impl<R> Clone for CollisionPolicy<R> {
    fn clone(&self) -> Self {
        CollisionPolicy {
            collision_fields: self.collision_fields.clone(),
            exclusion: self.exclusion.clone(),
        }
    }
}

impl<R> fmt::Debug for CollisionPolicy<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionPolicy")
            .field("collision_fields", &self.collision_fields)
            .field("has_exclusion", &self.exclusion.is_some())
            .finish()
    }
}

impl<R: IntervalRecord> CollisionPolicy<R> {
    /// Policy grouping records by the given fields.
    ///
    /// Fields are serialized field names; a dotted path (`"room.id"`) reaches
    /// into nested objects.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CollisionPolicy {
            collision_fields: fields.into_iter().map(Into::into).collect(),
            exclusion: None,
        }
    }

    /// Policy with a single global group and no exclusions.
    pub fn global() -> Self {
        Self::default()
    }

    /// Records for which `predicate` holds never collide.
    pub fn excluding<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.exclusion = Some(Arc::new(predicate));
        self
    }

    pub fn collision_fields(&self) -> &[String] {
        &self.collision_fields
    }

    pub fn has_exclusion(&self) -> bool {
        self.exclusion.is_some()
    }

    pub fn group_key(&self, record: &R) -> Result<GroupKey, ValidationError> {
        if self.collision_fields.is_empty() {
            return Ok(GroupKey::global());
        }

        let value = serde_json::to_value(record).map_err(|_| ValidationError::NotAnObject {
            collection: R::COLLECTION,
        })?;
        if !value.is_object() {
            return Err(ValidationError::NotAnObject {
                collection: R::COLLECTION,
            });
        }

        let mut values = Vec::with_capacity(self.collision_fields.len());
        for field in &self.collision_fields {
            let found = value.pointer(&json_pointer(field)).ok_or_else(|| {
                ValidationError::UnknownCollisionField {
                    collection: R::COLLECTION,
                    field: field.clone(),
                }
            })?;
            values.push(found.clone());
        }
        Ok(GroupKey(values))
    }

    pub fn is_excluded(&self, record: &R) -> bool {
        self.exclusion
            .as_ref()
            .map(|predicate| predicate(record))
            .unwrap_or(false)
    }
}

/// `"room.id"` -> `"/room/id"`, escaping per RFC 6901.
fn json_pointer(path: &str) -> String {
    let mut pointer = String::with_capacity(path.len() + 1);
    for segment in path.split('.') {
        pointer.push('/');
        pointer.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    }
    pointer
}
