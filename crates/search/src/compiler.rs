/// Compiler from trace search queries to parameterized SQL
///
/// Only the shape of each predicate is written into the SQL text. Every
/// literal taken from the query travels as a positional parameter.
use crate::compiled::{CompiledQuery, QueryParam};
use crate::query::TraceSearchQuery;
use model::TraceId;

/// Span rows with their name, schema URLs, instrumentation library, and
/// per-span aggregated events and links.
///
/// Events and links are aggregated in separate lateral sub-selects so that a
/// span with several events and several links is not multiplied into their
/// cross product. An aggregate over zero rows yields NULL, so a span without
/// events gets NULL in every event column and likewise for links.
///
/// Rows are ordered by trace ID; the trace grouper depends on it.
const SPAN_QUERY_TEMPLATE: &str = r#"
SELECT
    s.trace_id                      AS trace_id,
    s.span_id                       AS span_id,
    s.parent_span_id                AS parent_span_id,
    s.start_time                    AS start_time,
    s.end_time                      AS end_time,
    s.span_kind::text               AS span_kind,
    s.dropped_tags_count            AS dropped_tags_count,
    s.dropped_events_count          AS dropped_events_count,
    s.dropped_link_count            AS dropped_link_count,
    s.trace_state                   AS trace_state,
    s_url.url                       AS schema_url,
    sn.name                         AS span_name,
    ps_trace.jsonb(s.resource_tags) AS resource_tags,
    ps_trace.jsonb(s.span_tags)     AS span_tags,
    ev.event_names                  AS event_names,
    ev.event_times                  AS event_times,
    ev.event_dropped_tags_counts    AS event_dropped_tags_counts,
    ev.event_tags                   AS event_tags,
    inst_lib.name                   AS library_name,
    inst_lib.version                AS library_version,
    inst_lib_url.url                AS library_schema_url,
    lk.link_trace_ids               AS link_trace_ids,
    lk.link_span_ids                AS link_span_ids,
    lk.link_trace_states            AS link_trace_states,
    lk.link_dropped_tags_counts     AS link_dropped_tags_counts,
    lk.link_tags                    AS link_tags
FROM
    _ps_trace.span s
INNER JOIN
    _ps_trace.span_name sn ON s.name_id = sn.id
LEFT JOIN
    _ps_trace.schema_url s_url ON s.resource_schema_url_id = s_url.id
LEFT JOIN
    _ps_trace.instrumentation_lib inst_lib ON s.instrumentation_lib_id = inst_lib.id
LEFT JOIN
    _ps_trace.schema_url inst_lib_url ON inst_lib_url.id = inst_lib.schema_url_id
LEFT JOIN LATERAL (
    SELECT
        array_agg(e.name ORDER BY e.event_nbr)                 AS event_names,
        array_agg(e.time ORDER BY e.event_nbr)                 AS event_times,
        array_agg(e.dropped_tags_count ORDER BY e.event_nbr)   AS event_dropped_tags_counts,
        jsonb_agg(ps_trace.jsonb(e.tags) ORDER BY e.event_nbr) AS event_tags
    FROM
        _ps_trace.event e
    WHERE
        e.trace_id = s.trace_id AND e.span_id = s.span_id
) ev ON TRUE
LEFT JOIN LATERAL (
    SELECT
        array_agg(l.linked_trace_id ORDER BY l.link_nbr)         AS link_trace_ids,
        array_agg(l.linked_span_id ORDER BY l.link_nbr)          AS link_span_ids,
        array_agg(l.trace_state ORDER BY l.link_nbr)             AS link_trace_states,
        array_agg(l.dropped_tags_count ORDER BY l.link_nbr)      AS link_dropped_tags_counts,
        jsonb_agg(ps_trace.jsonb(l.tags) ORDER BY l.link_nbr)    AS link_tags
    FROM
        _ps_trace.link l
    WHERE
        l.trace_id = s.trace_id AND l.span_id = s.span_id
) lk ON TRUE
WHERE
    {where}
ORDER BY
    s.trace_id, s.start_time, s.span_id"#;

/// Distinct trace IDs having at least one span that matches every predicate
const TRACE_ID_SUBQUERY_TEMPLATE: &str = r#"
    SELECT
        DISTINCT s.trace_id
    FROM
        _ps_trace.span s
    WHERE
        {where}"#;

/// Predicate text for an unconstrained query
const ALWAYS_TRUE: &str = "TRUE";

/// Ordered predicates and the parameters they consume
///
/// Placeholder numbers come from the parameter count at the time a value is
/// pushed, so a skipped predicate never consumes an index.
#[derive(Debug, Default)]
struct Predicates {
    quals: Vec<String>,
    params: Vec<QueryParam>,
    shape: Vec<String>,
}

impl Predicates {
    /// Appends a parameter and returns its 1-based placeholder number
    fn bind(&mut self, param: QueryParam) -> usize {
        self.params.push(param);
        self.params.len()
    }

    fn push(&mut self, qual: String, shape: &str) {
        self.quals.push(qual);
        self.shape.push(shape.to_string());
    }

    fn where_clause(&self) -> String {
        if self.quals.is_empty() {
            ALWAYS_TRUE.to_string()
        } else {
            self.quals.join("\n        AND ")
        }
    }

    fn shape(&self) -> String {
        if self.shape.is_empty() {
            "unconstrained".to_string()
        } else {
            self.shape.join("+")
        }
    }
}

/// Builds the predicate list for every non-empty field of the query
fn build_predicates(query: &TraceSearchQuery) -> Predicates {
    let mut preds = Predicates::default();

    if !query.service_name.is_empty() {
        let p = preds.bind(QueryParam::Text(query.service_name.clone()));
        preds.push(
            format!(
                "s.resource_tags OPERATOR(ps_trace.?) ('{}' OPERATOR(ps_trace.==) ${p})",
                model::SERVICE_NAME_KEY
            ),
            "service_name",
        );
    }

    if !query.operation_name.is_empty() {
        // Span names are interned; resolve the name to its ID first.
        let p = preds.bind(QueryParam::Text(query.operation_name.clone()));
        preds.push(
            format!("s.name_id = (SELECT sn.id FROM _ps_trace.span_name sn WHERE sn.name = ${p})"),
            "operation_name",
        );
    }

    for (key, value) in &query.tags {
        let k = preds.bind(QueryParam::Text(key.clone()));
        let v = preds.bind(QueryParam::Text(value.clone()));
        preds.push(
            format!("s.span_tags OPERATOR(ps_trace.?) (${k} OPERATOR(ps_trace.==) ${v})"),
            "tag",
        );
    }

    if let Some(min) = query.start_time_min {
        let p = preds.bind(QueryParam::Timestamp(min));
        preds.push(format!("s.start_time >= ${p}"), "start_time_min");
    }
    if let Some(max) = query.start_time_max {
        let p = preds.bind(QueryParam::Timestamp(max));
        preds.push(format!("s.start_time <= ${p}"), "start_time_max");
    }

    if let Some(min) = query.duration_min {
        let p = preds.bind(QueryParam::Interval(min));
        preds.push(format!("(s.end_time - s.start_time) >= ${p}"), "duration_min");
    }
    if let Some(max) = query.duration_max {
        let p = preds.bind(QueryParam::Interval(max));
        preds.push(format!("(s.end_time - s.start_time) <= ${p}"), "duration_max");
    }

    preds
}

/// Builds the distinct-trace-ID sub-query, with its limit when one is set
fn build_trace_id_subquery(query: &TraceSearchQuery) -> (String, Predicates) {
    let mut preds = build_predicates(query);
    let mut sql = TRACE_ID_SUBQUERY_TEMPLATE.replace("{where}", &preds.where_clause());

    if query.num_traces > 0 {
        // The limit bounds distinct traces, not span rows.
        let limit = i64::try_from(query.num_traces).unwrap_or(i64::MAX);
        let p = preds.bind(QueryParam::BigInt(limit));
        sql.push_str(&format!("\n    LIMIT ${p}"));
        preds.shape.push("limit".to_string());
    }

    (sql, preds)
}

fn collapse_shape(shape: String) -> String {
    // "tag+tag+tag" reads better as "tag*3"
    let mut out: Vec<String> = Vec::new();
    let mut last: Option<(String, usize)> = None;
    for part in shape.split('+') {
        match &mut last {
            Some((name, count)) if name == part => *count += 1,
            _ => {
                if let Some((name, count)) = last.take() {
                    out.push(if count > 1 { format!("{name}*{count}") } else { name });
                }
                last = Some((part.to_string(), 1));
            }
        }
    }
    if let Some((name, count)) = last {
        out.push(if count > 1 { format!("{name}*{count}") } else { name });
    }
    out.join("+")
}

/// Compiles a search into the full span query
///
/// The predicates select trace IDs, and every span of each selected trace is
/// returned: a trace matches when any of its spans matches. Output rows are
/// sorted by trace ID.
pub fn compile(query: &TraceSearchQuery) -> CompiledQuery {
    let (subquery, preds) = build_trace_id_subquery(query);
    let where_clause = format!("s.trace_id IN ({subquery}\n    )");
    let sql = SPAN_QUERY_TEMPLATE.replace("{where}", &where_clause);
    let shape = collapse_shape(preds.shape());

    tracing::debug!(shape = %shape, params = preds.params.len(), "compiled trace search");
    CompiledQuery::new(sql, preds.params, shape)
}

/// Compiles a search into the distinct-trace-ID query alone
///
/// Each result row has a single `trace_id` column.
pub fn compile_trace_ids(query: &TraceSearchQuery) -> CompiledQuery {
    let (sql, preds) = build_trace_id_subquery(query);
    let shape = collapse_shape(preds.shape());

    tracing::debug!(shape = %shape, params = preds.params.len(), "compiled trace id search");
    CompiledQuery::new(sql, preds.params, shape)
}

/// Compiles a lookup of every span of one trace
pub fn compile_trace_by_id(trace_id: TraceId) -> CompiledQuery {
    let sql = SPAN_QUERY_TEMPLATE.replace("{where}", "s.trace_id = $1");
    CompiledQuery::new(sql, vec![QueryParam::TraceId(trace_id)], "trace_id".to_string())
}
