//! Error types for row reconstruction

use model::{SpanId, TraceId};
use thiserror::Error;

/// Result type for reconstruction operations
pub type Result<T> = std::result::Result<T, ReconstructError>;

/// Errors raised while turning result rows into spans
///
/// Scan-class errors mean the row does not have the expected shape and the
/// whole query is unusable. Decode and reference errors concern a single span
/// and carry its identifiers so the caller can choose to drop just that span.
#[derive(Error, Debug)]
pub enum ReconstructError {
    /// Column missing or of an unexpected type
    #[error("scan error on column {column}: {source}")]
    Scan {
        column: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Row has a different number of columns than the span query selects
    #[error("scan error: expected {expected} columns, got {actual}")]
    ColumnCount { expected: usize, actual: usize },

    /// Value outside what the data model can represent
    #[error("span {trace_id}/{span_id}: cannot decode {column}{}: {reason}", key_suffix(.key))]
    Decode {
        trace_id: TraceId,
        span_id: SpanId,
        column: &'static str,
        key: Option<String>,
        reason: String,
    },

    /// Parallel arrays of one event or link group disagree in length
    #[error(
        "span {trace_id}/{span_id}: {group} column {column} has {} entries, expected {expected}",
        entries(.actual)
    )]
    Reference {
        trace_id: TraceId,
        span_id: SpanId,
        group: &'static str,
        column: &'static str,
        expected: usize,
        /// `None` when the column is NULL
        actual: Option<usize>,
    },
}

impl ReconstructError {
    /// True when the error concerns one span rather than the query as a whole
    pub fn is_span_local(&self) -> bool {
        matches!(
            self,
            ReconstructError::Decode { .. } | ReconstructError::Reference { .. }
        )
    }

    /// Identifiers of the offending span, when the error concerns one
    pub fn span(&self) -> Option<(TraceId, SpanId)> {
        match self {
            ReconstructError::Decode {
                trace_id, span_id, ..
            }
            | ReconstructError::Reference {
                trace_id, span_id, ..
            } => Some((*trace_id, *span_id)),
            _ => None,
        }
    }
}

fn key_suffix(key: &Option<String>) -> String {
    match key {
        Some(k) => format!(" key {k:?}"),
        None => String::new(),
    }
}

fn entries(actual: &Option<usize>) -> String {
    match actual {
        Some(n) => n.to_string(),
        None => "no".to_string(),
    }
}
