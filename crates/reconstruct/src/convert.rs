//! Conversion from flattened span rows into spans with nested events and links

use crate::attributes::decode_attributes;
use crate::error::{ReconstructError, Result};
use crate::row::SpanRow;
use model::{
    Attributes, Batch, Event, InstrumentationLibrary, Link, Process, Span, SpanId, SpanKind,
    TraceId,
};
use search::columns;
use serde_json::Value as JsonValue;

/// Identifies the span a row belongs to, for error reports
#[derive(Debug, Clone, Copy)]
struct RowContext {
    trace_id: TraceId,
    span_id: SpanId,
}

impl RowContext {
    fn decode_error(
        &self,
        column: &'static str,
        key: Option<String>,
        reason: String,
    ) -> ReconstructError {
        ReconstructError::Decode {
            trace_id: self.trace_id,
            span_id: self.span_id,
            column,
            key,
            reason,
        }
    }

    fn attributes(&self, column: &'static str, value: &JsonValue) -> Result<Attributes> {
        decode_attributes(value).map_err(|e| self.decode_error(column, e.key(), e.to_string()))
    }

    fn count(&self, column: &'static str, value: i32) -> Result<u32> {
        u32::try_from(value)
            .map_err(|_| self.decode_error(column, None, format!("negative count {value}")))
    }

    /// Checks that every array of a parallel group has `expected` entries
    fn check_group(
        &self,
        group: &'static str,
        expected: usize,
        lengths: &[(&'static str, Option<usize>)],
    ) -> Result<()> {
        for &(column, actual) in lengths {
            if actual != Some(expected) {
                return Err(ReconstructError::Reference {
                    trace_id: self.trace_id,
                    span_id: self.span_id,
                    group,
                    column,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Checks that every array of a group is NULL when its lead array is
    fn check_group_absent(
        &self,
        group: &'static str,
        lengths: &[(&'static str, Option<usize>)],
    ) -> Result<()> {
        match lengths.iter().find(|(_, len)| len.is_some()) {
            Some(&(column, actual)) => Err(ReconstructError::Reference {
                trace_id: self.trace_id,
                span_id: self.span_id,
                group,
                column,
                expected: 0,
                actual,
            }),
            None => Ok(()),
        }
    }
}

/// Splits an aggregated JSON tag column into its elements
fn json_elements<'a>(value: Option<&'a JsonValue>) -> Option<&'a [JsonValue]> {
    match value {
        Some(JsonValue::Array(items)) => Some(items.as_slice()),
        // A non-array aggregate reads as zero entries and fails the group check.
        Some(_) => Some(&[]),
        None => None,
    }
}

fn build_events(ctx: &RowContext, row: &SpanRow) -> Result<Vec<Event>> {
    let tags = json_elements(row.event_tags.as_ref());
    let lengths = [
        (columns::EVENT_TIMES, row.event_times.as_ref().map(Vec::len)),
        (
            columns::EVENT_DROPPED_TAGS_COUNTS,
            row.event_dropped_tags_counts.as_ref().map(Vec::len),
        ),
        (columns::EVENT_TAGS, tags.map(<[JsonValue]>::len)),
    ];

    let (Some(names), Some(times), Some(dropped), Some(tags)) = (
        row.event_names.as_ref(),
        row.event_times.as_ref(),
        row.event_dropped_tags_counts.as_ref(),
        tags,
    ) else {
        return match &row.event_names {
            Some(names) => ctx.check_group("event", names.len(), &lengths).map(|_| Vec::new()),
            None => ctx.check_group_absent("event", &lengths).map(|_| Vec::new()),
        };
    };
    ctx.check_group("event", names.len(), &lengths)?;

    names
        .iter()
        .zip(times)
        .zip(dropped)
        .zip(tags)
        .map(|(((name, timestamp), dropped), tags)| {
            Ok(Event {
                name: name.clone(),
                timestamp: *timestamp,
                dropped_attribute_count: ctx.count(columns::EVENT_DROPPED_TAGS_COUNTS, *dropped)?,
                attributes: ctx.attributes(columns::EVENT_TAGS, tags)?,
            })
        })
        .collect()
}

fn build_links(ctx: &RowContext, row: &SpanRow) -> Result<Vec<Link>> {
    let tags = json_elements(row.link_tags.as_ref());
    let lengths = [
        (columns::LINK_SPAN_IDS, row.link_span_ids.as_ref().map(Vec::len)),
        (
            columns::LINK_TRACE_STATES,
            row.link_trace_states.as_ref().map(Vec::len),
        ),
        (
            columns::LINK_DROPPED_TAGS_COUNTS,
            row.link_dropped_tags_counts.as_ref().map(Vec::len),
        ),
        (columns::LINK_TAGS, tags.map(<[JsonValue]>::len)),
    ];

    let (Some(trace_ids), Some(span_ids), Some(states), Some(dropped), Some(tags)) = (
        row.link_trace_ids.as_ref(),
        row.link_span_ids.as_ref(),
        row.link_trace_states.as_ref(),
        row.link_dropped_tags_counts.as_ref(),
        tags,
    ) else {
        return match &row.link_trace_ids {
            Some(ids) => ctx.check_group("link", ids.len(), &lengths).map(|_| Vec::new()),
            None => ctx.check_group_absent("link", &lengths).map(|_| Vec::new()),
        };
    };
    ctx.check_group("link", trace_ids.len(), &lengths)?;

    trace_ids
        .iter()
        .zip(span_ids)
        .zip(states)
        .zip(dropped)
        .zip(tags)
        .map(|((((trace_id, span_id), state), dropped), tags)| {
            Ok(Link {
                trace_id: TraceId::from_bytes(trace_id.into_bytes()),
                span_id: SpanId::from_i64(*span_id),
                trace_state: state.clone(),
                dropped_attribute_count: ctx.count(columns::LINK_DROPPED_TAGS_COUNTS, *dropped)?,
                attributes: ctx.attributes(columns::LINK_TAGS, tags)?,
            })
        })
        .collect()
}

/// Rebuilds the span held by one row, together with its process
///
/// The result is a batch of exactly one span whose process comes from the
/// row's resource attributes. The span's own `process` field stays unset
/// until the batch is merged.
pub fn row_to_batch(row: SpanRow) -> Result<Batch> {
    let ctx = RowContext {
        trace_id: TraceId::from_bytes(row.trace_id.into_bytes()),
        span_id: SpanId::from_i64(row.span_id),
    };

    let kind = row
        .span_kind
        .as_deref()
        .map(str::parse::<SpanKind>)
        .transpose()
        .map_err(|e| ctx.decode_error(columns::SPAN_KIND, None, e.to_string()))?;

    let events = build_events(&ctx, &row)?;
    let links = build_links(&ctx, &row)?;
    let resource = ctx.attributes(columns::RESOURCE_TAGS, &row.resource_tags)?;
    let process = Process::from_resource(resource);

    let span = Span {
        trace_id: ctx.trace_id,
        span_id: ctx.span_id,
        parent_span_id: SpanId::from_nullable(row.parent_span_id),
        name: row.span_name,
        kind,
        start_time: row.start_time,
        end_time: row.end_time,
        dropped_attribute_count: ctx.count(columns::DROPPED_TAGS_COUNT, row.dropped_tags_count)?,
        dropped_event_count: ctx.count(columns::DROPPED_EVENTS_COUNT, row.dropped_events_count)?,
        dropped_link_count: ctx.count(columns::DROPPED_LINK_COUNT, row.dropped_link_count)?,
        trace_state: row.trace_state,
        attributes: ctx.attributes(columns::SPAN_TAGS, &row.span_tags)?,
        events,
        links,
        schema_url: row.schema_url,
        instrumentation: InstrumentationLibrary {
            name: row.library_name,
            version: row.library_version,
            schema_url: row.library_schema_url,
        },
        process: None,
    };

    Ok(Batch::new(process, vec![span]))
}

/// What to do with a row whose span cannot be decoded
///
/// Scan errors always fail the query; this only governs span-local errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedSpanPolicy {
    /// Report the error and stop
    #[default]
    Fail,
    /// Log the error and drop the offending span
    Skip,
}

impl MalformedSpanPolicy {
    /// Applies the policy to one converted row, returning `None` for a dropped span
    pub fn apply(self, result: Result<Batch>) -> Option<Result<Batch>> {
        match result {
            Err(e) if self == MalformedSpanPolicy::Skip && e.is_span_local() => {
                tracing::warn!(error = %e, "skipping malformed span");
                None
            }
            other => Some(other),
        }
    }
}
