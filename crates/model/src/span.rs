//! Span, event, and link types

use crate::attribute::Attributes;
use crate::ids::{SpanId, TraceId};
use crate::trace::Process;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Returned when stored span-kind text is not one of the known kinds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown span kind: {0}")]
pub struct UnknownSpanKind(pub String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    #[default]
    Unspecified,
    Internal,
    Client,
    Server,
    Producer,
    Consumer,
}

impl SpanKind {
    /// Text form as stored in the span table
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Unspecified => "SPAN_KIND_UNSPECIFIED",
            SpanKind::Internal => "SPAN_KIND_INTERNAL",
            SpanKind::Client => "SPAN_KIND_CLIENT",
            SpanKind::Server => "SPAN_KIND_SERVER",
            SpanKind::Producer => "SPAN_KIND_PRODUCER",
            SpanKind::Consumer => "SPAN_KIND_CONSUMER",
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpanKind {
    type Err = UnknownSpanKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SPAN_KIND_UNSPECIFIED" => Ok(SpanKind::Unspecified),
            "SPAN_KIND_INTERNAL" => Ok(SpanKind::Internal),
            "SPAN_KIND_CLIENT" => Ok(SpanKind::Client),
            "SPAN_KIND_SERVER" => Ok(SpanKind::Server),
            "SPAN_KIND_PRODUCER" => Ok(SpanKind::Producer),
            "SPAN_KIND_CONSUMER" => Ok(SpanKind::Consumer),
            other => Err(UnknownSpanKind(other.to_string())),
        }
    }
}

/// Timestamped annotation owned by one span
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub dropped_attribute_count: u32,
    pub attributes: Attributes,
}

/// Reference from one span to another, possibly in a different trace
///
/// The referenced span is identified, never embedded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub trace_state: Option<String>,
    pub dropped_attribute_count: u32,
    pub attributes: Attributes,
}

/// Library that produced a span
///
/// Every field is optional because a span's instrumentation-library
/// association may be missing entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstrumentationLibrary {
    pub name: Option<String>,
    pub version: Option<String>,
    pub schema_url: Option<String>,
}

impl InstrumentationLibrary {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.version.is_none() && self.schema_url.is_none()
    }
}

/// One unit of work within a trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    /// [`SpanId::EMPTY`] for root spans
    pub parent_span_id: SpanId,
    pub name: String,
    pub kind: Option<SpanKind>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub dropped_attribute_count: u32,
    pub dropped_event_count: u32,
    pub dropped_link_count: u32,
    pub trace_state: Option<String>,
    pub attributes: Attributes,
    pub events: Vec<Event>,
    pub links: Vec<Link>,
    /// Schema URL of the resource the span was reported under
    pub schema_url: Option<String>,
    pub instrumentation: InstrumentationLibrary,
    /// Set by the batch merge pass; `None` while the span sits in its batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<Arc<Process>>,
}

impl Span {
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_empty()
    }

    /// Span duration, clamped at zero when end precedes start
    pub fn duration(&self) -> chrono::Duration {
        (self.end_time - self.start_time).max(chrono::Duration::zero())
    }
}
