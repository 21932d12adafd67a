//! # reconstruct
//!
//! Rebuilds traces from the flattened, array-aggregated rows of the span query.
//!
//! Reconstruction runs in three steps:
//! - [`SpanRow::from_pg_row`] reads one result row by column name
//! - [`row_to_batch`] rebuilds the span with its events, links, and
//!   instrumentation library, and derives the batch process from the
//!   resource attributes
//! - [`batches_to_traces`] (or [`trace_stream`] for async cursors) stamps the
//!   process onto each span and groups consecutive spans by trace ID
//!
//! ## Example
//!
//! ```no_run
//! use reconstruct::{reconstruct_traces, MalformedSpanPolicy, SpanRow};
//!
//! # fn rows() -> Vec<SpanRow> { Vec::new() }
//! for trace in reconstruct_traces(rows(), MalformedSpanPolicy::Fail) {
//!     let trace = trace.unwrap();
//!     println!("Trace {} has {} spans", trace.trace_id_hex(), trace.total_spans());
//! }
//! ```

pub mod attributes;
pub mod convert;
pub mod error;
pub mod group;
pub mod row;

pub use convert::{row_to_batch, MalformedSpanPolicy};
pub use error::{ReconstructError, Result};
pub use group::{batches_to_traces, merge_batches, trace_stream, TraceAccumulator, TraceGrouper};
pub use row::SpanRow;

use model::Trace;

/// Rebuilds traces from rows already sorted by trace ID
pub fn reconstruct_traces<I>(
    rows: I,
    policy: MalformedSpanPolicy,
) -> impl Iterator<Item = Result<Trace>>
where
    I: IntoIterator<Item = SpanRow>,
{
    let batches = rows
        .into_iter()
        .filter_map(move |row| policy.apply(row_to_batch(row)));
    batches_to_traces(batches)
}
