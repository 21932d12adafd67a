//! Grouping of reconstructed spans into traces
//!
//! # Ordering contract
//!
//! Input spans must arrive sorted by trace ID, which the span query
//! guarantees with its `ORDER BY s.trace_id`. Grouping is a single forward
//! pass that closes the current trace as soon as a different trace ID shows
//! up; it never re-sorts. If the contract is broken, spans of one trace end
//! up in several groups. That case is logged, not repaired.

use async_stream::stream;
use futures::{Stream, StreamExt};
use model::{Batch, Span, Trace, TraceId};

/// Accumulates consecutive spans of one trace
///
/// Holds the trace being built and the ID of the last closed one, nothing
/// more, so memory stays bounded by the largest trace.
#[derive(Debug, Default)]
pub struct TraceAccumulator {
    current: Option<Trace>,
    last_closed: Option<TraceId>,
    out_of_order: usize,
}

impl TraceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a span, returning the previous trace once its group is complete
    pub fn push(&mut self, span: Span) -> Option<Trace> {
        if let Some(trace) = self.current.as_mut() {
            if trace.trace_id == span.trace_id {
                trace.spans.push(span);
                return None;
            }
        }

        let finished = self.current.take();
        if let Some(done) = &finished {
            self.last_closed = Some(done.trace_id);
        }

        // Sorted input only ever moves to a larger trace ID.
        if self.last_closed.is_some_and(|closed| span.trace_id <= closed) {
            self.out_of_order += 1;
            tracing::debug!(
                trace_id = %span.trace_id,
                "trace id not above the previous group; input is not sorted by trace id"
            );
        }

        let mut trace = Trace::new(span.trace_id);
        trace.spans.push(span);
        self.current = Some(trace);
        finished
    }

    /// Returns the trace still being accumulated, if any
    pub fn finish(&mut self) -> Option<Trace> {
        let finished = self.current.take();
        if let Some(done) = &finished {
            self.last_closed = Some(done.trace_id);
        }
        finished
    }

    /// Number of groups opened below or at an already closed trace ID
    pub fn out_of_order_groups(&self) -> usize {
        self.out_of_order
    }
}

/// Lazily groups a sorted span sequence into traces
///
/// The first error ends the sequence after it is yielded; the trace that was
/// being accumulated is discarded rather than returned incomplete.
pub struct TraceGrouper<I> {
    spans: I,
    acc: TraceAccumulator,
    done: bool,
}

impl<I> TraceGrouper<I> {
    pub fn new(spans: I) -> Self {
        Self {
            spans,
            acc: TraceAccumulator::new(),
            done: false,
        }
    }
}

impl<I, E> Iterator for TraceGrouper<I>
where
    I: Iterator<Item = Result<Span, E>>,
{
    type Item = Result<Trace, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.spans.next() {
                Some(Ok(span)) => {
                    if let Some(trace) = self.acc.push(span) {
                        return Some(Ok(trace));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return self.acc.finish().map(Ok);
                }
            }
        }
    }
}

/// Flattens batches into spans, stamping each span with its batch's process
pub fn merge_batches<I, E>(batches: I) -> impl Iterator<Item = Result<Span, E>>
where
    I: Iterator<Item = Result<Batch, E>>,
{
    batches.flat_map(|batch| match batch {
        Ok(batch) => batch.into_spans().map(Ok).collect::<Vec<_>>(),
        Err(e) => vec![Err(e)],
    })
}

/// Groups sorted batches into traces
///
/// Process attributes are copied onto the spans before grouping, so every
/// span keeps its own process even when a trace spans several batches.
pub fn batches_to_traces<I, E>(
    batches: I,
) -> TraceGrouper<impl Iterator<Item = Result<Span, E>>>
where
    I: Iterator<Item = Result<Batch, E>>,
{
    TraceGrouper::new(merge_batches(batches))
}

/// Stream counterpart of [`batches_to_traces`]
///
/// Consumes the input strictly in order, one batch at a time. Dropping the
/// returned stream drops the input stream with it.
pub fn trace_stream<S, E>(batches: S) -> impl Stream<Item = Result<Trace, E>>
where
    S: Stream<Item = Result<Batch, E>>,
{
    stream! {
        let mut acc = TraceAccumulator::new();
        futures::pin_mut!(batches);

        while let Some(batch) = batches.next().await {
            match batch {
                Ok(batch) => {
                    for span in batch.into_spans() {
                        if let Some(trace) = acc.push(span) {
                            yield Ok(trace);
                        }
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if let Some(trace) = acc.finish() {
            yield Ok(trace);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use model::{Attributes, InstrumentationLibrary, Process, SpanId};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn span(trace: u8, id: i64) -> Span {
        Span {
            trace_id: TraceId::from_bytes([trace; 16]),
            span_id: SpanId::from_i64(id),
            parent_span_id: SpanId::EMPTY,
            name: "op".to_string(),
            kind: None,
            start_time: Utc.timestamp_opt(0, 0).unwrap(),
            end_time: Utc.timestamp_opt(1, 0).unwrap(),
            dropped_attribute_count: 0,
            dropped_event_count: 0,
            dropped_link_count: 0,
            trace_state: None,
            attributes: Attributes::new(),
            events: vec![],
            links: vec![],
            schema_url: None,
            instrumentation: InstrumentationLibrary::default(),
            process: None,
        }
    }

    #[test]
    fn test_accumulator_closes_on_new_trace_id() {
        let mut acc = TraceAccumulator::new();
        assert!(acc.push(span(1, 1)).is_none());
        assert!(acc.push(span(1, 2)).is_none());

        let first = acc.push(span(2, 3)).unwrap();
        assert_eq!(first.trace_id, TraceId::from_bytes([1; 16]));
        assert_eq!(first.total_spans(), 2);

        let last = acc.finish().unwrap();
        assert_eq!(last.total_spans(), 1);
        assert!(acc.finish().is_none());
    }

    #[test]
    fn test_accumulator_state_is_bounded() {
        let mut acc = TraceAccumulator::new();
        let mut emitted = 0;
        for n in 0..10_000u128 {
            let mut s = span(0, 1);
            s.trace_id = TraceId::from_bytes(n.to_be_bytes());
            emitted += usize::from(acc.push(s).is_some());
        }

        assert_eq!(emitted, 9_999);
        assert_eq!(acc.out_of_order_groups(), 0);
        assert_eq!(acc.last_closed, Some(TraceId::from_bytes(9_998u128.to_be_bytes())));
        assert_eq!(acc.finish().unwrap().total_spans(), 1);
        assert!(acc.current.is_none());
    }

    #[test]
    fn test_accumulator_flags_unsorted_input() {
        let mut acc = TraceAccumulator::new();
        let emitted: Vec<_> = [(1, 1), (2, 2), (1, 3)]
            .into_iter()
            .filter_map(|(trace, id)| acc.push(span(trace, id)))
            .collect();

        assert_eq!(emitted.len(), 2);
        assert_eq!(acc.out_of_order_groups(), 1);
        assert_eq!(acc.last_closed, Some(TraceId::from_bytes([2; 16])));
    }

    #[test]
    fn test_grouper_on_empty_input() {
        let spans: Vec<Result<Span, ()>> = vec![];
        assert_eq!(TraceGrouper::new(spans.into_iter()).count(), 0);
    }

    #[test]
    fn test_grouper_stops_after_error() {
        let spans: Vec<Result<Span, &str>> = vec![Ok(span(1, 1)), Err("boom"), Ok(span(2, 2))];
        let out: Vec<_> = TraceGrouper::new(spans.into_iter()).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], Err("boom"));
    }

    #[test]
    fn test_merge_batches_attaches_process() {
        let batches: Vec<Result<Batch, ()>> = vec![
            Ok(Batch::new(
                Process {
                    service_name: "a".to_string(),
                    tags: Attributes::new(),
                },
                vec![span(1, 1)],
            )),
            Ok(Batch::new(
                Process {
                    service_name: "b".to_string(),
                    tags: Attributes::new(),
                },
                vec![span(1, 2)],
            )),
        ];

        let traces: Vec<_> = batches_to_traces(batches.into_iter())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(traces.len(), 1);
        let services: Vec<_> = traces[0].services().into_iter().collect();
        assert_eq!(services, vec!["a", "b"]);
    }

    /// Sets its flag when dropped
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_trace_stream_releases_input_after_error() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicBool::new(false));

        let batches = vec![
            Ok(Batch::new(Process::default(), vec![span(1, 1)])),
            Err("scan failed"),
            Ok(Batch::new(Process::default(), vec![span(2, 2)])),
        ];
        let input = {
            let pulled = Arc::clone(&pulled);
            let flag = DropFlag(Arc::clone(&dropped));
            futures::stream::iter(batches).inspect(move |_| {
                let _ = &flag;
                pulled.fetch_add(1, Ordering::SeqCst);
            })
        };

        let traces = trace_stream(input);
        futures::pin_mut!(traces);

        assert_eq!(traces.next().await, Some(Err("scan failed")));
        assert_eq!(traces.next().await, None);
        assert_eq!(pulled.load(Ordering::SeqCst), 2);
        // Input is released once the stream ends, before the caller drops it.
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(traces.next().await, None);
        assert_eq!(pulled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_trace_stream_matches_iterator() {
        let make = || {
            vec![
                Ok::<_, ()>(Batch::new(Process::default(), vec![span(1, 1)])),
                Ok(Batch::new(Process::default(), vec![span(1, 2)])),
                Ok(Batch::new(Process::default(), vec![span(3, 3)])),
            ]
        };

        let from_iter: Vec<_> = batches_to_traces(make().into_iter()).collect();
        let from_stream: Vec<_> = trace_stream(futures::stream::iter(make())).collect().await;
        assert_eq!(from_iter, from_stream);
        assert_eq!(from_stream.len(), 2);
    }
}
