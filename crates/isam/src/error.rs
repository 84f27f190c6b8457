//! Error types for the order store.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`IsamError`].
pub type Result<T> = std::result::Result<T, IsamError>;

/// Errors surfaced by [`Store`](crate::Store) operations.
///
/// A key that is not present is never an error: lookups and deletes report
/// it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum IsamError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt file {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("duplicate key: {0}")]
    DuplicateKey(i64),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
