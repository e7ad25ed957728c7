use std::sync::Arc;
use std::time::Duration;

use super::{Lock, LockError, LockManager};

/// How long `LockGuard::acquire` may wait for a held lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Forever,
    Timeout(Duration),
}

/// Holds a lock for the lifetime of the guard and releases it on drop.
///
/// Drop runs on every exit path, including early `?` returns and unwinding,
/// so a failed validation can never leave a collision group locked.
pub struct LockGuard<L: Lock> {
    key: String,
    lock: Option<Arc<L>>,
}

impl<L: Lock> LockGuard<L> {
    /// Acquires the lock for `key`.
    ///
    /// Returns `Ok(None)` when `wait` is a timeout and the lock stayed held.
    pub fn acquire<M>(manager: &M, key: &str, wait: Wait) -> Result<Option<Self>, LockError>
    where
        M: LockManager<Lock = L> + ?Sized,
    {
        let lock = manager.get_lock(key)?;
        let acquired = match wait {
            Wait::Forever => {
                lock.lock()?;
                true
            }
            Wait::Timeout(timeout) => lock.lock_timeout(timeout)?,
        };

        if !acquired {
            return Ok(None);
        }

        tracing::trace!(key, "lock acquired");
        Ok(Some(LockGuard {
            key: key.to_string(),
            lock: Some(lock),
        }))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Releases the lock now, surfacing any release error.
    pub fn release(mut self) -> Result<(), LockError> {
        match self.lock.take() {
            Some(lock) => lock.unlock(),
            None => Ok(()),
        }
    }
}

impl<L: Lock> Drop for LockGuard<L> {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            if let Err(err) = lock.unlock() {
                tracing::warn!(key = %self.key, error = %err, "failed to release lock");
            } else {
                tracing::trace!(key = %self.key, "lock released");
            }
        }
    }
}
