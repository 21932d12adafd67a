//! Binding of compiled query parameters to sqlx statements

use search::{CompiledQuery, QueryParam};
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;
use uuid::Uuid;

/// Prepares the statement of a compiled query with its parameters bound in order
pub fn prepare(compiled: &CompiledQuery) -> Query<'_, Postgres, PgArguments> {
    compiled
        .params
        .iter()
        .fold(sqlx::query(&compiled.sql), |query, param| match param {
            QueryParam::Text(value) => query.bind(value.as_str()),
            QueryParam::Timestamp(value) => query.bind(*value),
            QueryParam::Interval(value) => query.bind(*value),
            QueryParam::BigInt(value) => query.bind(*value),
            QueryParam::TraceId(value) => query.bind(Uuid::from_bytes(value.to_bytes())),
        })
}
