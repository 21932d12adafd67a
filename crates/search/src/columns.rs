//! Result column names of the span query
//!
//! The row reconstructor reads columns by these names. Every alias listed in
//! [`SPAN_COLUMNS`] appears exactly once in the span query's select list.

pub const TRACE_ID: &str = "trace_id";
pub const SPAN_ID: &str = "span_id";
pub const PARENT_SPAN_ID: &str = "parent_span_id";
pub const START_TIME: &str = "start_time";
pub const END_TIME: &str = "end_time";
pub const SPAN_KIND: &str = "span_kind";
pub const DROPPED_TAGS_COUNT: &str = "dropped_tags_count";
pub const DROPPED_EVENTS_COUNT: &str = "dropped_events_count";
pub const DROPPED_LINK_COUNT: &str = "dropped_link_count";
pub const TRACE_STATE: &str = "trace_state";
pub const SCHEMA_URL: &str = "schema_url";
pub const SPAN_NAME: &str = "span_name";
pub const RESOURCE_TAGS: &str = "resource_tags";
pub const SPAN_TAGS: &str = "span_tags";

pub const EVENT_NAMES: &str = "event_names";
pub const EVENT_TIMES: &str = "event_times";
pub const EVENT_DROPPED_TAGS_COUNTS: &str = "event_dropped_tags_counts";
pub const EVENT_TAGS: &str = "event_tags";

pub const LIBRARY_NAME: &str = "library_name";
pub const LIBRARY_VERSION: &str = "library_version";
pub const LIBRARY_SCHEMA_URL: &str = "library_schema_url";

pub const LINK_TRACE_IDS: &str = "link_trace_ids";
pub const LINK_SPAN_IDS: &str = "link_span_ids";
pub const LINK_TRACE_STATES: &str = "link_trace_states";
pub const LINK_DROPPED_TAGS_COUNTS: &str = "link_dropped_tags_counts";
pub const LINK_TAGS: &str = "link_tags";

/// Select-list order of the span query
pub const SPAN_COLUMNS: [&str; 26] = [
    TRACE_ID,
    SPAN_ID,
    PARENT_SPAN_ID,
    START_TIME,
    END_TIME,
    SPAN_KIND,
    DROPPED_TAGS_COUNT,
    DROPPED_EVENTS_COUNT,
    DROPPED_LINK_COUNT,
    TRACE_STATE,
    SCHEMA_URL,
    SPAN_NAME,
    RESOURCE_TAGS,
    SPAN_TAGS,
    EVENT_NAMES,
    EVENT_TIMES,
    EVENT_DROPPED_TAGS_COUNTS,
    EVENT_TAGS,
    LIBRARY_NAME,
    LIBRARY_VERSION,
    LIBRARY_SCHEMA_URL,
    LINK_TRACE_IDS,
    LINK_SPAN_IDS,
    LINK_TRACE_STATES,
    LINK_DROPPED_TAGS_COUNTS,
    LINK_TAGS,
];
