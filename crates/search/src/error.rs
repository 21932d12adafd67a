//! Error types for trace search compilation

use thiserror::Error;

/// Result type for query validation
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors raised while checking a search query
///
/// Compilation itself is total: every [`TraceSearchQuery`](crate::TraceSearchQuery)
/// compiles. These errors come from [`TraceSearchQuery::validate`](crate::TraceSearchQuery::validate),
/// which callers may run to reject queries before they reach storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Lower bound of a range is above its upper bound
    #[error("invalid {field} range: minimum {min} is greater than maximum {max}")]
    InvalidRange {
        field: &'static str,
        min: String,
        max: String,
    },

    /// Tag predicate with an empty key
    #[error("tag key cannot be empty")]
    EmptyTagKey,

    /// Result limit outside what storage accepts
    #[error("num_traces {0} exceeds the maximum of {max}", max = i64::MAX)]
    LimitTooLarge(usize),
}
