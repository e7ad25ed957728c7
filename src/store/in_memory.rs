//! InMemoryIntervalStore - HashMap-backed record store for testing and embedded use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::{FieldUpdates, IntervalStore, StoreError};
use crate::record::{IntervalRecord, Versioned};

/// Internal stored representation of a record.
struct StoredRecord {
    bytes: Vec<u8>,
    version: u64,
}

/// In-memory record store backed by a HashMap.
///
/// Storage key is `"COLLECTION:id"`. Identities are drawn from one counter
/// shared by all collections. Clone-friendly via Arc.
#[derive(Clone)]
pub struct InMemoryIntervalStore {
    storage: Arc<RwLock<HashMap<String, StoredRecord>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for InMemoryIntervalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIntervalStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn make_key(collection: &str, id: &str) -> String {
        format!("{}:{}", collection, id)
    }

    fn decode<R: IntervalRecord>(bytes: &[u8]) -> Result<R, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serde(e.to_string()))
    }

    fn encode<R: IntervalRecord>(record: &R) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(record).map_err(|e| StoreError::Serde(e.to_string()))
    }

    fn apply_changes<R: IntervalRecord>(
        bytes: &[u8],
        changes: &FieldUpdates,
    ) -> Result<R, StoreError> {
        let mut value: Value =
            serde_json::from_slice(bytes).map_err(|e| StoreError::Serde(e.to_string()))?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| StoreError::Serde(format!("{} record is not an object", R::COLLECTION)))?;

        for (field, new_value) in changes {
            match object.get_mut(field) {
                Some(slot) => *slot = new_value.clone(),
                None => {
                    return Err(StoreError::UnknownField {
                        collection: R::COLLECTION,
                        field: field.clone(),
                    })
                }
            }
        }

        // Decoding as R rejects a change of the wrong type here instead of
        // poisoning later reads.
        serde_json::from_value(value).map_err(|e| StoreError::Serde(e.to_string()))
    }
}

impl IntervalStore for InMemoryIntervalStore {
    fn get_record<R: IntervalRecord>(&self, id: &str) -> Result<Option<Versioned<R>>, StoreError> {
        let key = Self::make_key(R::COLLECTION, id);
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        match storage.get(&key) {
            Some(stored) => Ok(Some(Versioned {
                data: Self::decode(&stored.bytes)?,
                version: stored.version,
            })),
            None => Ok(None),
        }
    }

    fn find_records<R: IntervalRecord>(
        &self,
        predicate: &dyn Fn(&R) -> bool,
    ) -> Result<Vec<Versioned<R>>, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        let prefix = format!("{}:", R::COLLECTION);
        let mut results = Vec::new();

        for (key, stored) in storage.iter() {
            if !key.starts_with(&prefix) {
                continue;
            }
            let data: R = Self::decode(&stored.bytes)?;
            if predicate(&data) {
                results.push(Versioned {
                    data,
                    version: stored.version,
                });
            }
        }

        Ok(results)
    }

    fn insert_record<R: IntervalRecord>(&self, record: &R) -> Result<Versioned<R>, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let mut data = record.clone();
        data.set_id(Some(id.clone()));
        let bytes = Self::encode(&data)?;

        let key = Self::make_key(R::COLLECTION, &id);
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        if let Some(existing) = storage.get(&key) {
            return Err(StoreError::ConcurrencyConflict {
                collection: R::COLLECTION.to_string(),
                id,
                expected: 0,
                actual: existing.version,
            });
        }

        storage.insert(key, StoredRecord { bytes, version: 1 });

        Ok(Versioned { data, version: 1 })
    }

    fn update_record<R: IntervalRecord>(
        &self,
        record: &R,
        expected_version: u64,
    ) -> Result<Versioned<R>, StoreError> {
        let id = record
            .id()
            .ok_or_else(|| StoreError::Storage(format!("{} record has no identity", R::COLLECTION)))?;
        let key = Self::make_key(R::COLLECTION, id);
        let bytes = Self::encode(record)?;

        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        let actual_version = storage
            .get(&key)
            .map(|s| s.version)
            .ok_or_else(|| StoreError::NotFound {
                collection: R::COLLECTION.to_string(),
                id: id.to_string(),
            })?;

        if actual_version != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                collection: R::COLLECTION.to_string(),
                id: id.to_string(),
                expected: expected_version,
                actual: actual_version,
            });
        }

        let new_version = actual_version + 1;
        storage.insert(
            key,
            StoredRecord {
                bytes,
                version: new_version,
            },
        );

        Ok(Versioned {
            data: record.clone(),
            version: new_version,
        })
    }

    fn update_where<R: IntervalRecord>(
        &self,
        predicate: &dyn Fn(&R) -> bool,
        changes: &FieldUpdates,
        accept: &dyn Fn(&R, &R) -> bool,
    ) -> Result<usize, StoreError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        let prefix = format!("{}:", R::COLLECTION);
        let mut pending = Vec::new();

        for (key, stored) in storage.iter() {
            if !key.starts_with(&prefix) {
                continue;
            }
            let data: R = Self::decode(&stored.bytes)?;
            if !predicate(&data) {
                continue;
            }
            let changed: R = Self::apply_changes(&stored.bytes, changes)?;
            if !accept(&data, &changed) {
                return Err(StoreError::Rejected {
                    collection: R::COLLECTION,
                    id: data.id().unwrap_or_default().to_string(),
                });
            }
            pending.push((key.clone(), Self::encode(&changed)?));
        }

        let updated = pending.len();
        for (key, bytes) in pending {
            if let Some(stored) = storage.get_mut(&key) {
                stored.bytes = bytes;
                stored.version += 1;
            }
        }

        Ok(updated)
    }

    fn delete_record<R: IntervalRecord>(&self, id: &str) -> Result<bool, StoreError> {
        let key = Self::make_key(R::COLLECTION, id);
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        Ok(storage.remove(&key).is_some())
    }
}
