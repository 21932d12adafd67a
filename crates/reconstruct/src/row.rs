//! Flattened span rows as delivered by the span query

use crate::error::{ReconstructError, Result};
use chrono::{DateTime, Utc};
use search::columns;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Decode, Postgres, Row, Type};
use uuid::Uuid;

/// One aggregated result row, one per span
///
/// Event and link columns are parallel arrays: within a row, every array of a
/// group has the same length, or every array of the group is NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRow {
    // Span table.
    pub trace_id: Uuid,
    pub span_id: i64,
    pub parent_span_id: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub span_kind: Option<String>,
    pub dropped_tags_count: i32,
    pub dropped_events_count: i32,
    pub dropped_link_count: i32,
    pub trace_state: Option<String>,
    pub schema_url: Option<String>,
    pub span_name: String,
    pub resource_tags: JsonValue,
    pub span_tags: JsonValue,

    // Event table.
    pub event_names: Option<Vec<String>>,
    pub event_times: Option<Vec<DateTime<Utc>>>,
    pub event_dropped_tags_counts: Option<Vec<i32>>,
    /// JSON array of tag objects
    pub event_tags: Option<JsonValue>,

    // Instrumentation library table.
    pub library_name: Option<String>,
    pub library_version: Option<String>,
    pub library_schema_url: Option<String>,

    // Link table.
    pub link_trace_ids: Option<Vec<Uuid>>,
    pub link_span_ids: Option<Vec<i64>>,
    pub link_trace_states: Option<Vec<Option<String>>>,
    pub link_dropped_tags_counts: Option<Vec<i32>>,
    /// JSON array of tag objects
    pub link_tags: Option<JsonValue>,
}

fn get<'r, T>(row: &'r PgRow, column: &'static str) -> Result<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<T, _>(column)
        .map_err(|source| ReconstructError::Scan { column, source })
}

impl SpanRow {
    /// Reads a row of the span query by column name
    ///
    /// Fails with a scan error when the column count differs from the span
    /// query's select list or a column has an unexpected type.
    pub fn from_pg_row(row: &PgRow) -> Result<Self> {
        if row.len() != columns::SPAN_COLUMNS.len() {
            return Err(ReconstructError::ColumnCount {
                expected: columns::SPAN_COLUMNS.len(),
                actual: row.len(),
            });
        }

        Ok(Self {
            trace_id: get(row, columns::TRACE_ID)?,
            span_id: get(row, columns::SPAN_ID)?,
            parent_span_id: get(row, columns::PARENT_SPAN_ID)?,
            start_time: get(row, columns::START_TIME)?,
            end_time: get(row, columns::END_TIME)?,
            span_kind: get(row, columns::SPAN_KIND)?,
            dropped_tags_count: get(row, columns::DROPPED_TAGS_COUNT)?,
            dropped_events_count: get(row, columns::DROPPED_EVENTS_COUNT)?,
            dropped_link_count: get(row, columns::DROPPED_LINK_COUNT)?,
            trace_state: get(row, columns::TRACE_STATE)?,
            schema_url: get(row, columns::SCHEMA_URL)?,
            span_name: get(row, columns::SPAN_NAME)?,
            resource_tags: get(row, columns::RESOURCE_TAGS)?,
            span_tags: get(row, columns::SPAN_TAGS)?,

            event_names: get(row, columns::EVENT_NAMES)?,
            event_times: get(row, columns::EVENT_TIMES)?,
            event_dropped_tags_counts: get(row, columns::EVENT_DROPPED_TAGS_COUNTS)?,
            event_tags: get(row, columns::EVENT_TAGS)?,

            library_name: get(row, columns::LIBRARY_NAME)?,
            library_version: get(row, columns::LIBRARY_VERSION)?,
            library_schema_url: get(row, columns::LIBRARY_SCHEMA_URL)?,

            link_trace_ids: get(row, columns::LINK_TRACE_IDS)?,
            link_span_ids: get(row, columns::LINK_SPAN_IDS)?,
            link_trace_states: get(row, columns::LINK_TRACE_STATES)?,
            link_dropped_tags_counts: get(row, columns::LINK_DROPPED_TAGS_COUNTS)?,
            link_tags: get(row, columns::LINK_TAGS)?,
        })
    }
}
