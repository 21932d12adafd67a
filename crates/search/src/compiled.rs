//! Compiled SQL text and its positional parameters

use chrono::{DateTime, Utc};
use model::TraceId;
use std::fmt;
use std::time::Duration;

/// A literal value bound to one positional placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    Text(String),
    Timestamp(DateTime<Utc>),
    Interval(Duration),
    BigInt(i64),
    TraceId(TraceId),
}

impl QueryParam {
    /// SQL type the parameter is bound as
    pub fn type_name(&self) -> &'static str {
        match self {
            QueryParam::Text(_) => "text",
            QueryParam::Timestamp(_) => "timestamptz",
            QueryParam::Interval(_) => "interval",
            QueryParam::BigInt(_) => "int8",
            QueryParam::TraceId(_) => "uuid",
        }
    }
}

/// SQL text with placeholders `$1..$n` and the values bound to them
///
/// `params[i]` is bound to placeholder `$(i + 1)`. Placeholder numbers are
/// assigned in append order with no gaps and no reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
    shape: String,
}

impl CompiledQuery {
    pub(crate) fn new(sql: String, params: Vec<QueryParam>, shape: String) -> Self {
        Self { sql, params, shape }
    }

    /// Value-free description of which predicates the query carries
    ///
    /// Safe to log or attach to errors: it never includes parameter values.
    pub fn shape(&self) -> &str {
        &self.shape
    }

    /// Parameter types in placeholder order, for diagnostics
    pub fn param_types(&self) -> Vec<&'static str> {
        self.params.iter().map(QueryParam::type_name).collect()
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- shape: {}", self.shape)?;
        for (i, ty) in self.param_types().iter().enumerate() {
            writeln!(f, "-- ${}: {}", i + 1, ty)?;
        }
        f.write_str(self.sql.trim())
    }
}
