//! Trace search query value

use crate::error::{CompileError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Structured trace search request
///
/// Every field is independently optional. Empty strings, an empty tag map,
/// `None` bounds, and `num_traces == 0` all mean "unconstrained"; a query with
/// every field unset matches every stored span.
///
/// Time and duration bounds are inclusive. Unlike the zero-value convention
/// used for the string fields, a bound of `Some(Duration::ZERO)` is a real
/// constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSearchQuery {
    pub service_name: String,
    pub operation_name: String,
    /// Span attribute equality predicates, applied in key order
    pub tags: BTreeMap<String, String>,
    pub start_time_min: Option<DateTime<Utc>>,
    pub start_time_max: Option<DateTime<Utc>>,
    #[serde(with = "duration_ms")]
    pub duration_min: Option<Duration>,
    #[serde(with = "duration_ms")]
    pub duration_max: Option<Duration>,
    /// Maximum number of distinct traces, 0 for no limit
    pub num_traces: usize,
}

impl TraceSearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = operation_name.into();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_start_time_range(
        mut self,
        min: Option<DateTime<Utc>>,
        max: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time_min = min;
        self.start_time_max = max;
        self
    }

    pub fn with_duration_range(mut self, min: Option<Duration>, max: Option<Duration>) -> Self {
        self.duration_min = min;
        self.duration_max = max;
        self
    }

    pub fn with_num_traces(mut self, num_traces: usize) -> Self {
        self.num_traces = num_traces;
        self
    }

    /// True when no field constrains the search
    pub fn is_unconstrained(&self) -> bool {
        self.service_name.is_empty()
            && self.operation_name.is_empty()
            && self.tags.is_empty()
            && self.start_time_min.is_none()
            && self.start_time_max.is_none()
            && self.duration_min.is_none()
            && self.duration_max.is_none()
            && self.num_traces == 0
    }

    /// Checks the query for contradictory or unusable bounds
    ///
    /// Not called by the compiler; higher layers decide whether to enforce it.
    pub fn validate(&self) -> Result<()> {
        if self.tags.keys().any(|k| k.is_empty()) {
            return Err(CompileError::EmptyTagKey);
        }

        if let (Some(min), Some(max)) = (self.start_time_min, self.start_time_max) {
            if min > max {
                return Err(CompileError::InvalidRange {
                    field: "start_time",
                    min: min.to_rfc3339(),
                    max: max.to_rfc3339(),
                });
            }
        }

        if let (Some(min), Some(max)) = (self.duration_min, self.duration_max) {
            if min > max {
                return Err(CompileError::InvalidRange {
                    field: "duration",
                    min: format!("{min:?}"),
                    max: format!("{max:?}"),
                });
            }
        }

        if i64::try_from(self.num_traces).is_err() {
            return Err(CompileError::LimitTooLarge(self.num_traces));
        }

        Ok(())
    }
}

/// Serializes `Option<Duration>` as whole milliseconds
mod duration_ms {
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => {
                let millis = u64::try_from(d.as_millis()).map_err(|_| {
                    S::Error::custom(format!("duration {d:?} does not fit in u64 milliseconds"))
                })?;
                serializer.serialize_some(&millis)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
