use std::sync::Arc;

use super::{Lock, LockError};

/// Factory trait for obtaining per-key locks.
///
/// `MutexRepository` asks for one lock per collision group (key
/// `"collection:group"`) and holds it across the conflict check and the write.
pub trait LockManager: Send + Sync {
    /// The concrete lock type returned by this manager.
    type Lock: Lock;

    /// Get (or create) a lock for the given key.
    ///
    /// Repeated calls with the same `key` must return the same logical lock
    /// (the same `Arc` in memory, or the same distributed key).
    fn get_lock(&self, key: &str) -> Result<Arc<Self::Lock>, LockError>;
}
