use std::fmt;

/// Errors a [`crate::SnapshotStore`] implementation may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// No snapshot exists under this name (`load_backtest`'s `NOT_FOUND`).
    NotFound(String),
    /// Underlying storage (filesystem, etc.) failed.
    Backend(String),
    /// The stored blob could not be deserialized back into a snapshot.
    Corrupt(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::NotFound(name) => write!(f, "no snapshot named '{name}'"),
            PersistenceError::Backend(detail) => write!(f, "persistence backend error: {detail}"),
            PersistenceError::Corrupt(detail) => write!(f, "corrupt snapshot: {detail}"),
        }
    }
}

impl std::error::Error for PersistenceError {}
