//! Builds span-query rows from known spans, the way the aggregation lays them out

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use model::{
    AttributeValue, Attributes, Event, InstrumentationLibrary, Link, Span, SpanId, SpanKind,
    TraceId,
};
use reconstruct::SpanRow;
use serde_json::{json, Map, Value as JsonValue};
use uuid::Uuid;

pub fn attrs_to_json(attrs: &Attributes) -> JsonValue {
    let map: Map<String, JsonValue> = attrs
        .iter()
        .map(|(k, v)| {
            let value = match v {
                AttributeValue::Int(i) => json!(i),
                AttributeValue::Bool(b) => json!(b),
                AttributeValue::String(s) => json!(s),
                AttributeValue::Double(d) => json!(d),
                AttributeValue::Bytes(_) => panic!("tag columns cannot hold bytes"),
            };
            (k.clone(), value)
        })
        .collect();
    JsonValue::Object(map)
}

/// Encodes a span into the aggregated row shape; empty groups become NULL
pub fn encode_span(span: &Span, resource: &Attributes) -> SpanRow {
    let events = &span.events;
    let links = &span.links;

    SpanRow {
        trace_id: Uuid::from_bytes(span.trace_id.to_bytes()),
        span_id: span.span_id.to_i64(),
        parent_span_id: (!span.parent_span_id.is_empty()).then(|| span.parent_span_id.to_i64()),
        start_time: span.start_time,
        end_time: span.end_time,
        span_kind: span.kind.map(|k| k.as_str().to_string()),
        dropped_tags_count: span.dropped_attribute_count as i32,
        dropped_events_count: span.dropped_event_count as i32,
        dropped_link_count: span.dropped_link_count as i32,
        trace_state: span.trace_state.clone(),
        schema_url: span.schema_url.clone(),
        span_name: span.name.clone(),
        resource_tags: attrs_to_json(resource),
        span_tags: attrs_to_json(&span.attributes),

        event_names: (!events.is_empty())
            .then(|| events.iter().map(|e| e.name.clone()).collect()),
        event_times: (!events.is_empty()).then(|| events.iter().map(|e| e.timestamp).collect()),
        event_dropped_tags_counts: (!events.is_empty())
            .then(|| events.iter().map(|e| e.dropped_attribute_count as i32).collect()),
        event_tags: (!events.is_empty()).then(|| {
            JsonValue::Array(events.iter().map(|e| attrs_to_json(&e.attributes)).collect())
        }),

        library_name: span.instrumentation.name.clone(),
        library_version: span.instrumentation.version.clone(),
        library_schema_url: span.instrumentation.schema_url.clone(),

        link_trace_ids: (!links.is_empty())
            .then(|| links.iter().map(|l| Uuid::from_bytes(l.trace_id.to_bytes())).collect()),
        link_span_ids: (!links.is_empty())
            .then(|| links.iter().map(|l| l.span_id.to_i64()).collect()),
        link_trace_states: (!links.is_empty())
            .then(|| links.iter().map(|l| l.trace_state.clone()).collect()),
        link_dropped_tags_counts: (!links.is_empty())
            .then(|| links.iter().map(|l| l.dropped_attribute_count as i32).collect()),
        link_tags: (!links.is_empty()).then(|| {
            JsonValue::Array(links.iter().map(|l| attrs_to_json(&l.attributes)).collect())
        }),
    }
}

pub fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn resource(service: &str) -> Attributes {
    attrs(&[
        ("service.name", AttributeValue::from(service)),
        ("host.name", AttributeValue::from("node-1")),
    ])
}

/// A bare span: root, no events, links, or instrumentation
pub fn plain_span(trace: u8, id: i64) -> Span {
    Span {
        trace_id: TraceId::from_bytes([trace; 16]),
        span_id: SpanId::from_i64(id),
        parent_span_id: SpanId::EMPTY,
        name: format!("op-{id}"),
        kind: None,
        start_time: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
        end_time: Utc.timestamp_opt(1_700_000_001 + id, 0).unwrap(),
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

/// A span exercising every field
pub fn rich_span() -> Span {
    let start = Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap();
    Span {
        trace_id: TraceId::from_bytes([0x42; 16]),
        span_id: SpanId::from_i64(-8_070_450_532_247_928_832),
        parent_span_id: SpanId::from_i64(99),
        name: "POST /checkout".to_string(),
        kind: Some(SpanKind::Server),
        start_time: start,
        end_time: start + chrono::Duration::milliseconds(340),
        dropped_attribute_count: 1,
        dropped_event_count: 2,
        dropped_link_count: 3,
        trace_state: Some("vendor=abc".to_string()),
        attributes: attrs(&[
            ("http.method", AttributeValue::from("POST")),
            ("http.status_code", AttributeValue::Int(201)),
            ("cache.hit", AttributeValue::Bool(false)),
            ("sample.rate", AttributeValue::Double(0.5)),
        ]),
        events: vec![
            Event {
                name: "validated".to_string(),
                timestamp: start + chrono::Duration::milliseconds(10),
                dropped_attribute_count: 0,
                attributes: attrs(&[("items", AttributeValue::Int(3))]),
            },
            Event {
                name: "charged".to_string(),
                timestamp: start + chrono::Duration::milliseconds(300),
                dropped_attribute_count: 4,
                attributes: Attributes::new(),
            },
        ],
        links: vec![Link {
            trace_id: TraceId::from_bytes([0x07; 16]),
            span_id: SpanId::from_i64(12345),
            trace_state: None,
            dropped_attribute_count: 0,
            attributes: attrs(&[("link.reason", AttributeValue::from("retry"))]),
        }],
        schema_url: Some("https://opentelemetry.io/schemas/1.9.0".to_string()),
        instrumentation: InstrumentationLibrary {
            name: Some("io.opentelemetry.http".to_string()),
            version: Some("1.2.0".to_string()),
            schema_url: None,
        },
        process: None,
    }
}
