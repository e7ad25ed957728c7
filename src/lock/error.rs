use thiserror::Error;

/// Error type for lock operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The underlying lock primitive was poisoned (a thread panicked while holding it).
    #[error("lock poisoned: {0}")]
    Poisoned(String),
    /// Backend failure reported by an external `Lock` implementation.
    #[error("lock error: {0}")]
    Other(String),
}
