//! Overlap queries against the store.
//!
//! A query is compiled into one predicate and issued as a single
//! `IntervalStore::find_records` read, never as per-candidate lookups, so the
//! whole answer comes from one consistent view of the store.

use chrono::{DateTime, Utc};

use crate::error::{MutexError, ValidationError};
use crate::interval::overlaps;
use crate::policy::{CollisionPolicy, GroupKey};
use crate::record::{IntervalRecord, Versioned};
use crate::store::{IntervalStore, StoreError};

/// Stored records of `R` overlapping `[start, end)`, optionally narrowed to a
/// collision group, with policy exclusions and one identity filtered out.
pub struct OverlapQuery<'a, R> {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    policy: Option<&'a CollisionPolicy<R>>,
    group: Option<&'a GroupKey>,
    skip_excluded: bool,
    exclude_identity: Option<&'a str>,
}

impl<'a, R: IntervalRecord> OverlapQuery<'a, R> {
    /// Query over `[start, end)`; the range must be non-empty.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::EmptyInterval {
                collection: R::COLLECTION,
                start,
                end,
            });
        }
        Ok(OverlapQuery {
            start,
            end,
            policy: None,
            group: None,
            skip_excluded: false,
            exclude_identity: None,
        })
    }

    /// Only match records whose group key under `policy` equals `group`.
    pub fn in_group(mut self, policy: &'a CollisionPolicy<R>, group: &'a GroupKey) -> Self {
        self.policy = Some(policy);
        self.group = Some(group);
        self
    }

    /// Drop records the policy's exclusion predicate exempts.
    pub fn skip_excluded(mut self, policy: &'a CollisionPolicy<R>) -> Self {
        self.policy = Some(policy);
        self.skip_excluded = true;
        self
    }

    /// Never match the record with this identity (the candidate's own prior
    /// version on update). `None` excludes nothing.
    pub fn excluding_identity(mut self, id: Option<&'a str>) -> Self {
        self.exclude_identity = id;
        self
    }

    pub fn matches(&self, record: &R) -> bool {
        let (Some(start), Some(end)) = (record.start(), record.end()) else {
            return false;
        };
        if !overlaps(&start, &end, &self.start, &self.end) {
            return false;
        }
        if let (Some(excluded), Some(id)) = (self.exclude_identity, record.id()) {
            if excluded == id {
                return false;
            }
        }
        if let Some(policy) = self.policy {
            if self.skip_excluded && policy.is_excluded(record) {
                return false;
            }
            if let Some(group) = self.group {
                match policy.group_key(record) {
                    Ok(key) if &key == group => {}
                    _ => return false,
                }
            }
        }
        true
    }

    pub fn run<S: IntervalStore>(&self, store: &S) -> Result<Vec<Versioned<R>>, StoreError> {
        store.find_records::<R>(&|record: &R| self.matches(record))
    }
}

/// Stored records that would collide with `[start, end)` in `group`.
pub fn find_conflicts<S, R>(
    store: &S,
    policy: &CollisionPolicy<R>,
    group: &GroupKey,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_identity: Option<&str>,
) -> Result<Vec<Versioned<R>>, MutexError>
where
    S: IntervalStore,
    R: IntervalRecord,
{
    let query = OverlapQuery::new(start, end)?
        .in_group(policy, group)
        .skip_excluded(policy)
        .excluding_identity(exclude_identity);
    Ok(query.run(store)?)
}
