//! # model
//!
//! In-memory trace data model produced by the row reconstructor and handed to
//! an external encoder. Every value here is request scoped: it is built while
//! one query's result rows are consumed and owned by the caller afterwards.
//!
//! The shapes follow the open trace data model (resource, instrumentation
//! library, span, event, link) with one addition: a [`Span`] carries the
//! [`Process`] of the batch it was read from once the batch merge pass has run.

pub mod attribute;
pub mod ids;
pub mod span;
pub mod trace;

pub use attribute::{AttributeValue, Attributes};
pub use ids::{IdParseError, SpanId, TraceId};
pub use span::{Event, InstrumentationLibrary, Link, Span, SpanKind, UnknownSpanKind};
pub use trace::{Batch, Process, Trace, SERVICE_NAME_KEY};
