use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for a `MutexRepository`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutexConfig {
    /// How long a write may wait for its collision group's lock before
    /// failing with a retryable contention error. `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,

    /// Skip the conflict query on updates that leave start, end, collision
    /// group and exclusion status exactly as stored.
    pub skip_unchanged_revalidation: bool,
}

impl Default for MutexConfig {
    fn default() -> Self {
        Self {
            lock_timeout: None,
            skip_unchanged_revalidation: true,
        }
    }
}

impl MutexConfig {
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Always re-run the conflict query on update.
    pub fn always_revalidate(mut self) -> Self {
        self.skip_unchanged_revalidation = false;
        self
    }
}
