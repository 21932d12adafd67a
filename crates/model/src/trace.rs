//! Batches, processes, and traces

use crate::attribute::{AttributeValue, Attributes};
use crate::ids::TraceId;
use crate::span::Span;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Resource attribute holding the reporting service's name
pub const SERVICE_NAME_KEY: &str = "service.name";

/// Process description shared by every span of one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Process {
    pub service_name: String,
    /// Resource attributes other than the service name
    pub tags: Attributes,
}

impl Process {
    /// Builds a process from resource attributes
    ///
    /// A string-valued `service.name` becomes the service name; every other
    /// attribute is kept as a process tag. A non-string `service.name` is
    /// left in the tags and the service name stays empty.
    pub fn from_resource(mut attributes: Attributes) -> Self {
        let service_name = match attributes.remove(SERVICE_NAME_KEY) {
            Some(AttributeValue::String(name)) => name,
            Some(other) => {
                attributes.insert(SERVICE_NAME_KEY.to_string(), other);
                String::new()
            }
            None => String::new(),
        };

        Self {
            service_name,
            tags: attributes,
        }
    }
}

/// Spans sharing one process description
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub process: Arc<Process>,
    pub spans: Vec<Span>,
}

impl Batch {
    pub fn new(process: Process, spans: Vec<Span>) -> Self {
        Self {
            process: Arc::new(process),
            spans,
        }
    }

    /// Consumes the batch, stamping its process onto every span
    ///
    /// Each span keeps its own process lineage after the spans are regrouped
    /// by trace, since one trace may span several batches.
    pub fn into_spans(self) -> impl Iterator<Item = Span> {
        let process = self.process;
        self.spans.into_iter().map(move |mut span| {
            span.process = Some(Arc::clone(&process));
            span
        })
    }
}

/// Spans sharing one trace identifier, in arrival order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub trace_id: TraceId,
    pub spans: Vec<Span>,
}

impl Trace {
    pub fn new(trace_id: TraceId) -> Self {
        Self {
            trace_id,
            spans: Vec::new(),
        }
    }

    /// Returns the total number of spans in this trace
    pub fn total_spans(&self) -> usize {
        self.spans.len()
    }

    /// Returns the trace ID as a hex string
    pub fn trace_id_hex(&self) -> String {
        self.trace_id.to_hex()
    }

    /// First span without a parent, if any
    pub fn root_span(&self) -> Option<&Span> {
        self.spans.iter().find(|s| s.is_root())
    }

    /// Earliest start and latest end across all spans
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.spans.iter().map(|s| s.start_time).min()?;
        let end = self.spans.iter().map(|s| s.end_time).max()?;
        Some((start, end))
    }

    pub fn duration(&self) -> chrono::Duration {
        match self.time_range() {
            Some((start, end)) if end >= start => end - start,
            _ => chrono::Duration::zero(),
        }
    }

    /// Distinct service names of the processes attached to the spans
    pub fn services(&self) -> BTreeSet<&str> {
        self.spans
            .iter()
            .filter_map(|s| s.process.as_deref())
            .map(|p| p.service_name.as_str())
            .filter(|name| !name.is_empty())
            .collect()
    }
}
