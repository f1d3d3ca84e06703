//! Subscription store error types.

use std::path::PathBuf;

/// Errors from reading or writing stored subscriptions.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing a record failed
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored record is not valid JSON of the expected shape
    #[error("corrupt record {path:?}: {message}")]
    Corrupt { path: PathBuf, message: String },

    /// Serializing a record failed
    #[error("failed to serialize record: {0}")]
    Serialize(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}
