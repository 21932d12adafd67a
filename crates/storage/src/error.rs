//! Error types for span storage access

use reconstruct::ReconstructError;
use search::CompileError;
use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised while running a trace search against Postgres
///
/// Execution errors carry the query shape, never the SQL parameters, so
/// they are safe to log.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Could not open the connection pool
    #[error("failed to connect to Postgres: {0}")]
    Connect(#[source] sqlx::Error),

    /// Statement failed or the cursor broke while reading rows
    #[error("query [{shape}] failed: {source}")]
    Execution {
        shape: String,
        #[source]
        source: sqlx::Error,
    },

    /// A result row could not be turned into a span
    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),

    /// The search query was rejected before reaching the database
    #[error("invalid search query: {0}")]
    Compile(#[from] CompileError),
}

impl StorageError {
    pub(crate) fn execution(shape: &str, source: sqlx::Error) -> Self {
        StorageError::Execution {
            shape: shape.to_string(),
            source,
        }
    }
}
