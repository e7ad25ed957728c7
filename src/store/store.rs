//! IntervalStore - abstract storage for interval records.

use serde_json::{Map, Value};

use super::StoreError;
use crate::record::{IntervalRecord, Versioned};

/// Field name -> new serialized value, applied by `IntervalStore::update_where`.
pub type FieldUpdates = Map<String, Value>;

/// Abstract storage for interval records.
///
/// Each method is a single atomic operation against the store. The write
/// guard serializes the conflict check and the write with group locks, so
/// implementations need no knowledge of collision policies.
pub trait IntervalStore: Send + Sync {
    /// Get a record by identity. Returns None if not found.
    fn get_record<R: IntervalRecord>(&self, id: &str) -> Result<Option<Versioned<R>>, StoreError>;

    /// Find all records of `R` matching a predicate, in one read.
    fn find_records<R: IntervalRecord>(
        &self,
        predicate: &dyn Fn(&R) -> bool,
    ) -> Result<Vec<Versioned<R>>, StoreError>;

    /// Count records of `R` matching a predicate.
    fn count_records<R: IntervalRecord>(
        &self,
        predicate: &dyn Fn(&R) -> bool,
    ) -> Result<usize, StoreError> {
        Ok(self.find_records(predicate)?.len())
    }

    /// Insert a new record, assigning it a fresh identity.
    ///
    /// Any identity already present on `record` is ignored. The returned copy
    /// carries the assigned identity.
    fn insert_record<R: IntervalRecord>(&self, record: &R) -> Result<Versioned<R>, StoreError>;

    /// Update an existing record with optimistic concurrency control.
    fn update_record<R: IntervalRecord>(
        &self,
        record: &R,
        expected_version: u64,
    ) -> Result<Versioned<R>, StoreError>;

    /// Overwrite `changes` on every record matching `predicate`.
    ///
    /// `accept` sees each matching record before and after the changes; a
    /// `false` fails the call with `StoreError::Rejected`. All-or-nothing: if
    /// any record cannot take the changes, none is written. Returns the
    /// number of records updated.
    fn update_where<R: IntervalRecord>(
        &self,
        predicate: &dyn Fn(&R) -> bool,
        changes: &FieldUpdates,
        accept: &dyn Fn(&R, &R) -> bool,
    ) -> Result<usize, StoreError>;

    /// Delete a record by identity. Returns true if it existed.
    fn delete_record<R: IntervalRecord>(&self, id: &str) -> Result<bool, StoreError>;
}
