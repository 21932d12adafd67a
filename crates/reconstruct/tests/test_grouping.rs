//! Trace grouping over rows sorted by trace ID

mod common;

use common::{encode_span, plain_span, resource};
use model::{Batch, Process, Span, TraceId};
use reconstruct::{
    batches_to_traces, reconstruct_traces, MalformedSpanPolicy, SpanRow, TraceGrouper,
};

fn rows_for(layout: &[(u8, i64)]) -> Vec<SpanRow> {
    layout
        .iter()
        .map(|&(trace, id)| encode_span(&plain_span(trace, id), &resource("svc")))
        .collect()
}

fn span_keys(spans: &[Span]) -> Vec<(TraceId, i64)> {
    spans.iter().map(|s| (s.trace_id, s.span_id.to_i64())).collect()
}

#[test]
fn test_two_traces_of_m_and_n_spans() {
    let rows = rows_for(&[(1, 1), (1, 2), (1, 3), (2, 4), (2, 5)]);
    let traces: Vec<_> = reconstruct_traces(rows, MalformedSpanPolicy::Fail)
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0].total_spans(), 3);
    assert_eq!(traces[1].total_spans(), 2);
    assert_eq!(traces[0].trace_id, TraceId::from_bytes([1; 16]));
    assert_eq!(traces[1].trace_id, TraceId::from_bytes([2; 16]));
}

#[test]
fn test_concatenation_reproduces_row_order() {
    let layout = [(1, 10), (1, 11), (3, 12), (5, 13), (5, 14), (5, 15), (8, 16)];
    let expected: Vec<_> = layout
        .iter()
        .map(|&(t, id)| (TraceId::from_bytes([t; 16]), id))
        .collect();

    let traces: Vec<_> = reconstruct_traces(rows_for(&layout), MalformedSpanPolicy::Fail)
        .collect::<Result<_, _>>()
        .unwrap();
    let flattened: Vec<Span> = traces.into_iter().flat_map(|t| t.spans).collect();

    assert_eq!(span_keys(&flattened), expected);
}

#[test]
fn test_each_trace_holds_a_single_trace_id() {
    let rows = rows_for(&[(1, 1), (2, 2), (2, 3), (4, 4)]);
    for trace in reconstruct_traces(rows, MalformedSpanPolicy::Fail) {
        let trace = trace.unwrap();
        assert!(trace.spans.iter().all(|s| s.trace_id == trace.trace_id));
    }
}

#[test]
fn test_unsorted_input_splits_a_trace() {
    // The grouper relies on sorted input; interleaving is not repaired.
    let rows = rows_for(&[(1, 1), (2, 2), (1, 3)]);
    let traces: Vec<_> = reconstruct_traces(rows, MalformedSpanPolicy::Fail)
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(traces.len(), 3);
    assert_eq!(traces[0].trace_id, traces[2].trace_id);
}

#[test]
fn test_process_lineage_survives_grouping() {
    let batch = |service: &str, id: i64| -> Result<Batch, ()> {
        Ok(Batch::new(
            Process {
                service_name: service.to_string(),
                ..Default::default()
            },
            vec![plain_span(7, id)],
        ))
    };

    let traces: Vec<_> = batches_to_traces(
        vec![batch("frontend", 1), batch("cart", 2), batch("frontend", 3)].into_iter(),
    )
    .collect::<Result<_, _>>()
    .unwrap();

    assert_eq!(traces.len(), 1);
    let services: Vec<_> = traces[0]
        .spans
        .iter()
        .map(|s| s.process.as_ref().unwrap().service_name.as_str())
        .collect();
    assert_eq!(services, vec!["frontend", "cart", "frontend"]);
}

#[test]
fn test_grouper_is_lazy() {
    let mut pulled = 0;
    let spans = (0..4).map(|i| {
        pulled += 1;
        Ok::<_, ()>(plain_span(if i < 2 { 1 } else { 2 }, i))
    });

    let mut grouper = TraceGrouper::new(spans);
    let first = grouper.next().unwrap().unwrap();
    assert_eq!(first.total_spans(), 2);
    drop(grouper);
    // Only the spans up to the first span of the next trace were read
    assert_eq!(pulled, 3);
}
