//! Lock abstractions used to serialize writers within a collision group.
//!
//! Keys are `"collection:group"` strings, so writers targeting different
//! groups (or different record types) never contend.

mod error;
mod guard;
mod in_memory;
#[allow(clippy::module_inception)]
mod lock;
mod lock_manager;

pub use error::LockError;
pub use guard::{LockGuard, Wait};
pub use in_memory::{InMemoryLock, InMemoryLockManager};
pub use lock::Lock;
pub use lock_manager::LockManager;
