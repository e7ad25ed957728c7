//! MutexRepository - the write guard in front of an `IntervalStore`.
//!
//! Every single-record write goes through field validation, takes the lock of
//! the record's collision group, runs the mutex validator and only then
//! persists. Multi-record writes that touch an interval are refused outright:
//! they cannot be checked one record at a time.
//!
//! ## Example
//!
//! ```ignore
//! use interval_mutex::{InMemoryIntervalStore, MutexRepository};
//!
//! let repo = MutexRepository::new(InMemoryIntervalStore::new());
//! let id = repo.create(&mut booking)?;
//!
//! booking.end = Some(booking.end.unwrap() + Duration::hours(1));
//! repo.update(&booking)?;
//! ```

mod config;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{MutexError, UnsupportedOperationError, ValidationError};
use crate::interval::Interval;
use crate::lock::{InMemoryLockManager, LockGuard, LockManager, Wait};
use crate::policy::{CollisionPolicy, GroupKey, PolicyRegistry};
use crate::query::OverlapQuery;
use crate::record::{IntervalRecord, Versioned};
use crate::store::{FieldUpdates, IntervalStore, StoreError};
use crate::validator::{check_fields, validate_and_prepare};

pub use config::MutexConfig;

/// Guards an `IntervalStore` so that no two eligible records in the same
/// collision group ever overlap.
///
/// Lock keys are `"collection:group"`, so writers only contend when they
/// target the same collision group of the same record type.
pub struct MutexRepository<S, L = InMemoryLockManager> {
    store: S,
    locks: L,
    policies: PolicyRegistry,
    config: MutexConfig,
}

impl<S: IntervalStore> MutexRepository<S> {
    /// Guard `store` with in-process group locks.
    pub fn new(store: S) -> Self {
        Self::with_lock_manager(store, InMemoryLockManager::new())
    }
}

impl<S: IntervalStore, L: LockManager> MutexRepository<S, L> {
    /// Guard `store` with an external lock manager, e.g. one handing out
    /// database advisory locks shared by several processes.
    pub fn with_lock_manager(store: S, locks: L) -> Self {
        MutexRepository {
            store,
            locks,
            policies: PolicyRegistry::new(),
            config: MutexConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MutexConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve `R`'s collision policy up front instead of on first write.
    pub fn register<R: IntervalRecord>(self) -> Self {
        self.policies.resolve::<R>();
        self
    }

    /// Access the inner store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &MutexConfig {
        &self.config
    }

    /// The resolved collision policy for `R`.
    pub fn policy<R: IntervalRecord>(&self) -> Arc<CollisionPolicy<R>> {
        self.policies.resolve::<R>()
    }

    // ========================================================================
    // Single-record writes
    // ========================================================================

    /// Persist a new record and write the assigned identity back into it.
    pub fn create<R: IntervalRecord>(&self, record: &mut R) -> Result<String, MutexError> {
        if let Some(id) = record.id() {
            return Err(ValidationError::IdentityAlreadyAssigned {
                collection: R::COLLECTION,
                id: id.to_string(),
            }
            .into());
        }

        let resolved = self.policies.resolve::<R>();
        let policy = resolved.as_ref();
        let (_, group) = check_fields(policy, record)?;
        let guard = self.lock_group::<R>(&group)?;

        validate_and_prepare(&self.store, policy, record)?;
        let saved = self.store.insert_record(record)?;
        let id = saved.data.id().map(str::to_string).ok_or_else(|| {
            MutexError::Store(StoreError::Storage(format!(
                "{} insert returned no identity",
                R::COLLECTION
            )))
        })?;

        record.set_id(Some(id.clone()));
        // Committed: a failed unlock is logged by the guard, not returned.
        drop(guard);
        tracing::debug!(collection = R::COLLECTION, id = %id, group = %group, "created");
        Ok(id)
    }

    /// Persist changes to an existing record.
    ///
    /// A changed interval, collision group or exclusion status is
    /// re-validated against every other record in the group; the record's
    /// own stored version never counts as a conflict.
    pub fn update<R: IntervalRecord>(&self, record: &R) -> Result<(), MutexError> {
        let id = record.id().ok_or(ValidationError::MissingIdentity {
            collection: R::COLLECTION,
        })?;

        let resolved = self.policies.resolve::<R>();
        let policy = resolved.as_ref();
        let (interval, group) = check_fields(policy, record)?;
        let guard = self.lock_group::<R>(&group)?;

        let stored = self
            .store
            .get_record::<R>(id)?
            .ok_or_else(|| StoreError::NotFound {
                collection: R::COLLECTION.to_string(),
                id: id.to_string(),
            })?;

        if self.config.skip_unchanged_revalidation
            && Self::unchanged(policy, &stored, record, &interval, &group)
        {
            tracing::trace!(collection = R::COLLECTION, id, "interval unchanged, skipping check");
        } else {
            validate_and_prepare(&self.store, policy, record)?;
        }

        let saved = self.store.update_record(record, stored.version)?;
        drop(guard);
        tracing::debug!(
            collection = R::COLLECTION,
            id,
            version = saved.version,
            group = %group,
            "updated"
        );
        Ok(())
    }

    /// Create when the record has no identity, update otherwise.
    ///
    /// Clearing a persisted record's identity and saving it again stores it
    /// as a new record.
    pub fn save<R: IntervalRecord>(&self, record: &mut R) -> Result<String, MutexError> {
        match record.id().map(str::to_string) {
            Some(id) => {
                self.update(record)?;
                Ok(id)
            }
            None => self.create(record),
        }
    }

    pub fn delete<R: IntervalRecord>(&self, id: &str) -> Result<bool, MutexError> {
        Ok(self.store.delete_record::<R>(id)?)
    }

    // ========================================================================
    // Multi-record writes
    // ========================================================================

    /// Always refused: a batch insert cannot be collision-checked record by
    /// record, and could commit records that overlap each other.
    pub fn bulk_create<R: IntervalRecord>(&self, records: &[R]) -> Result<Vec<String>, MutexError> {
        tracing::warn!(
            collection = R::COLLECTION,
            records = records.len(),
            "rejected bulk create of interval records"
        );
        Err(UnsupportedOperationError {
            collection: R::COLLECTION,
            operation: "bulk_create",
        }
        .into())
    }

    /// Overwrite `changes` on every record matching `filter`, returning how
    /// many records were updated.
    ///
    /// Refused when `changes` touches the start, end or identity field. The
    /// field names are checked first; each matching record is then compared
    /// before and after the changes, so a serialized name the constants miss
    /// is caught as well. Any other field is written without collision checks.
    pub fn mass_update<R: IntervalRecord>(
        &self,
        filter: &dyn Fn(&R) -> bool,
        changes: &FieldUpdates,
    ) -> Result<usize, MutexError> {
        let forbidden: Vec<&str> = changes
            .keys()
            .map(String::as_str)
            .filter(|field| [R::START_FIELD, R::END_FIELD, R::ID_FIELD].contains(field))
            .collect();

        if !forbidden.is_empty() {
            tracing::warn!(
                collection = R::COLLECTION,
                fields = ?forbidden,
                "rejected mass update of interval fields"
            );
            return Err(Self::interval_mass_update_refused::<R>());
        }

        if changes.is_empty() {
            return Ok(self.store.count_records(filter)?);
        }

        let keeps_interval = |before: &R, after: &R| {
            before.id() == after.id()
                && before.start() == after.start()
                && before.end() == after.end()
        };

        let updated = self
            .store
            .update_where(filter, changes, &keeps_interval)
            .map_err(|err| match err {
                StoreError::UnknownField { collection, field } => {
                    MutexError::from(ValidationError::UnknownField { collection, field })
                }
                StoreError::Rejected { id, .. } => {
                    tracing::warn!(
                        collection = R::COLLECTION,
                        id = %id,
                        "rejected mass update changing an interval"
                    );
                    Self::interval_mass_update_refused::<R>()
                }
                other => MutexError::from(other),
            })?;

        tracing::debug!(collection = R::COLLECTION, updated, "mass updated");
        Ok(updated)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn get<R: IntervalRecord>(&self, id: &str) -> Result<Option<Versioned<R>>, MutexError> {
        Ok(self.store.get_record(id)?)
    }

    pub fn find<R: IntervalRecord>(
        &self,
        predicate: &dyn Fn(&R) -> bool,
    ) -> Result<Vec<Versioned<R>>, MutexError> {
        Ok(self.store.find_records(predicate)?)
    }

    pub fn count<R: IntervalRecord>(&self) -> Result<usize, MutexError> {
        Ok(self.store.count_records::<R>(&|_| true)?)
    }

    /// Every stored record of `R` overlapping `[start, end)`, across all
    /// collision groups and regardless of exclusions.
    pub fn overlapping<R: IntervalRecord>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Versioned<R>>, MutexError> {
        Ok(OverlapQuery::<R>::new(start, end)?.run(&self.store)?)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lock_group<R: IntervalRecord>(
        &self,
        group: &GroupKey,
    ) -> Result<LockGuard<L::Lock>, MutexError> {
        let key = group.lock_key(R::COLLECTION);
        let wait = match self.config.lock_timeout {
            Some(timeout) => Wait::Timeout(timeout),
            None => Wait::Forever,
        };

        match LockGuard::acquire(&self.locks, &key, wait)? {
            Some(guard) => Ok(guard),
            None => {
                tracing::warn!(key = %key, "timed out waiting for group lock");
                Err(MutexError::Contention {
                    reason: format!("group lock not acquired within {:?}", self.config.lock_timeout),
                    key,
                })
            }
        }
    }

    fn interval_mass_update_refused<R: IntervalRecord>() -> MutexError {
        UnsupportedOperationError {
            collection: R::COLLECTION,
            operation: "mass_update of start, end or identity",
        }
        .into()
    }

    fn unchanged<R: IntervalRecord>(
        policy: &CollisionPolicy<R>,
        stored: &Versioned<R>,
        record: &R,
        interval: &Interval,
        group: &GroupKey,
    ) -> bool {
        stored.data.interval().as_ref() == Some(interval)
            && policy.group_key(&stored.data).ok().as_ref() == Some(group)
            && policy.is_excluded(&stored.data) == policy.is_excluded(record)
    }
}
