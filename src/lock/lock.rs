use std::time::Duration;

use super::LockError;

/// Trait for a single lock instance.
///
/// The in-memory lock uses `Mutex` + `Condvar`; a database-backed store would
/// typically hand out advisory locks or `SELECT ... FOR UPDATE` rows keyed by
/// collision group instead.
pub trait Lock: Send + Sync {
    /// Acquire the lock, blocking until it becomes available.
    fn lock(&self) -> Result<(), LockError>;

    /// Try to acquire the lock without blocking.
    /// Returns `Ok(true)` if acquired, `Ok(false)` if already held.
    fn try_lock(&self) -> Result<bool, LockError>;

    /// Acquire the lock, waiting at most `timeout`.
    /// Returns `Ok(false)` if the lock was still held when the timeout elapsed.
    fn lock_timeout(&self, timeout: Duration) -> Result<bool, LockError>;

    /// Release the lock.
    fn unlock(&self) -> Result<(), LockError>;
}
