/// Trace search query compilation
///
/// This crate turns a structured [`TraceSearchQuery`] into SQL text plus an
/// ordered list of positional parameters for the normalized span schema.
///
/// # Architecture
///
/// 1. **Query** (`query.rs`) - The search request value and its validation
/// 2. **Compiler** (`compiler.rs`) - Builds predicates, the distinct-trace-ID
///    sub-query, and the outer aggregated span query
/// 3. **Compiled** (`compiled.rs`) - SQL text, parameters, and a value-free shape
/// 4. **Columns** (`columns.rs`) - Result column names shared with the row reconstructor
///
/// # Usage
///
/// ```rust,ignore
/// use search::{compile, TraceSearchQuery};
///
/// let query = TraceSearchQuery::new()
///     .with_service_name("checkout")
///     .with_tag("http.method", "GET")
///     .with_num_traces(20);
///
/// let compiled = compile(&query);
/// // compiled.sql uses $1..$n, compiled.params holds the values in order
/// ```
pub mod columns;
pub mod compiled;
pub mod compiler;
pub mod error;
pub mod query;

pub use compiled::{CompiledQuery, QueryParam};
pub use compiler::{compile, compile_trace_by_id, compile_trace_ids};
pub use error::{CompileError, Result};
pub use query::TraceSearchQuery;
