use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::CollisionPolicy;
use crate::record::IntervalRecord;

/// Caches each record type's `CollisionPolicy` after first use.
///
/// `IntervalRecord::collision_policy` is called at most once per type per
/// registry; every later lookup hands out the same `Arc`.
#[derive(Default)]
pub struct PolicyRegistry {
    policies: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the policy for `R`, building it on first request.
    pub fn resolve<R: IntervalRecord>(&self) -> Arc<CollisionPolicy<R>> {
        let type_id = TypeId::of::<R>();

        // The map only ever gains fully built entries, so a poisoned lock
        // still guards consistent data.
        if let Some(existing) = self
            .policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            if let Ok(policy) = Arc::clone(existing).downcast::<CollisionPolicy<R>>() {
                return policy;
            }
        }

        let mut policies = self
            .policies
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = policies.entry(type_id).or_insert_with(|| {
            let policy = R::collision_policy();
            tracing::debug!(
                collection = R::COLLECTION,
                fields = ?policy.collision_fields(),
                exclusion = policy.has_exclusion(),
                "resolved collision policy"
            );
            Arc::new(policy) as Arc<dyn Any + Send + Sync>
        });

        Arc::clone(entry)
            .downcast::<CollisionPolicy<R>>()
            .unwrap_or_else(|_| Arc::new(R::collision_policy()))
    }

    /// Number of record types resolved so far.
    pub fn len(&self) -> usize {
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
