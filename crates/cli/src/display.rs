use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use model::{Span, Trace, TraceId};

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::DynamicFullWidth);
    table.set_header(header.iter().map(Cell::new).collect::<Vec<_>>());
    table
}

fn format_millis(duration: chrono::Duration) -> String {
    format!("{:.3}", duration.num_microseconds().unwrap_or(i64::MAX) as f64 / 1000.0)
}

/// Root span of a trace, or its earliest span when no root was stored
fn entry_span(trace: &Trace) -> Option<&Span> {
    trace
        .root_span()
        .or_else(|| trace.spans.iter().min_by_key(|s| s.start_time))
}

/// One row per trace: ID, root service and operation, span count, timing
pub fn traces_table(traces: &[Trace]) -> Table {
    let mut table = new_table(&[
        "Trace ID",
        "Root Service",
        "Root Operation",
        "Spans",
        "Services",
        "Start",
        "Duration (ms)",
    ]);

    for trace in traces {
        let entry = entry_span(trace);
        let service = entry
            .and_then(|s| s.process.as_deref())
            .map(|p| p.service_name.clone())
            .unwrap_or_default();
        let operation = entry.map(|s| s.name.clone()).unwrap_or_default();
        let start = trace
            .time_range()
            .map(|(start, _)| start.to_rfc3339())
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(trace.trace_id_hex()),
            Cell::new(service),
            Cell::new(operation),
            Cell::new(trace.total_spans()),
            Cell::new(trace.services().len()),
            Cell::new(start),
            Cell::new(format_millis(trace.duration())),
        ]);
    }

    table
}

/// One row per span of a single trace, in stored order
pub fn spans_table(trace: &Trace) -> Table {
    let mut table = new_table(&[
        "Span ID",
        "Parent",
        "Service",
        "Operation",
        "Kind",
        "Start",
        "Duration (ms)",
        "Events",
        "Links",
    ]);

    for span in &trace.spans {
        let parent = if span.is_root() {
            String::new()
        } else {
            span.parent_span_id.to_string()
        };
        let service = span
            .process
            .as_deref()
            .map(|p| p.service_name.as_str())
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(span.span_id),
            Cell::new(parent),
            Cell::new(service),
            Cell::new(&span.name),
            Cell::new(span.kind.map(|k| k.as_str()).unwrap_or_default()),
            Cell::new(span.start_time.to_rfc3339()),
            Cell::new(format_millis(span.duration())),
            Cell::new(span.events.len()),
            Cell::new(span.links.len()),
        ]);
    }

    table
}

pub fn trace_ids_table(ids: &[TraceId]) -> Table {
    let mut table = new_table(&["Trace ID"]);
    for id in ids {
        table.add_row(vec![Cell::new(id)]);
    }
    table
}
