//! The mutex validator: decides whether a candidate record may be written.

use crate::error::{CollisionError, MutexError, ValidationError};
use crate::interval::Interval;
use crate::policy::{CollisionPolicy, GroupKey};
use crate::query::find_conflicts;
use crate::record::IntervalRecord;
use crate::store::IntervalStore;

/// A candidate that passed validation and may be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub interval: Interval,
    pub group: GroupKey,
    /// The candidate itself is exempt under the exclusion predicate, so no
    /// conflict query was issued.
    pub excluded: bool,
}

/// Checks a record's bounds and computes its collision group, without
/// touching the store.
pub fn check_fields<R: IntervalRecord>(
    policy: &CollisionPolicy<R>,
    record: &R,
) -> Result<(Interval, GroupKey), ValidationError> {
    let start = record.start().ok_or(ValidationError::MissingStart {
        collection: R::COLLECTION,
    })?;
    let end = record.end().ok_or(ValidationError::MissingEnd {
        collection: R::COLLECTION,
    })?;
    let interval = Interval::new(start, end).ok_or(ValidationError::EmptyInterval {
        collection: R::COLLECTION,
        start,
        end,
    })?;
    Ok((interval, policy.group_key(record)?))
}

/// Validates `record` and checks it against every stored record in its
/// collision group.
///
/// The record's own identity, if any, is excluded from the check, so an
/// update never collides with the version it replaces. The caller must hold
/// the group lock from this call until the write completes.
pub fn validate_and_prepare<S, R>(
    store: &S,
    policy: &CollisionPolicy<R>,
    record: &R,
) -> Result<Prepared, MutexError>
where
    S: IntervalStore,
    R: IntervalRecord,
{
    let (interval, group) = check_fields(policy, record)?;

    if policy.is_excluded(record) {
        return Ok(Prepared {
            interval,
            group,
            excluded: true,
        });
    }

    let conflicts = find_conflicts(
        store,
        policy,
        &group,
        interval.start(),
        interval.end(),
        record.id(),
    )?;

    if !conflicts.is_empty() {
        let mut conflicting: Vec<String> = conflicts
            .iter()
            .filter_map(|v| v.data.id().map(str::to_string))
            .collect();
        conflicting.sort();

        tracing::warn!(
            collection = R::COLLECTION,
            group = %group,
            start = %interval.start(),
            end = %interval.end(),
            conflicting = ?conflicting,
            "interval collision"
        );
        return Err(CollisionError {
            collection: R::COLLECTION,
            group,
            start: interval.start(),
            end: interval.end(),
            conflicting,
        }
        .into());
    }

    Ok(Prepared {
        interval,
        group,
        excluded: false,
    })
}
