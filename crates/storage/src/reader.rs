use crate::bind::prepare;
use crate::error::{Result, StorageError};
use crate::pool::create_pool;
use async_stream::stream;
use async_trait::async_trait;
use config::{Config, SearchConfig};
use futures::{Stream, StreamExt, TryStreamExt};
use model::{Batch, Trace, TraceId};
use reconstruct::{row_to_batch, trace_stream, MalformedSpanPolicy, ReconstructError, SpanRow};
use search::{
    columns, compile, compile_trace_by_id, compile_trace_ids, CompiledQuery, TraceSearchQuery,
};
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

/// Read access to stored traces
#[async_trait]
pub trait SpanReader: Send + Sync {
    /// Traces with at least one span matching the search, every span included
    async fn find_traces(&self, query: &TraceSearchQuery) -> Result<Vec<Trace>>;

    /// IDs of the traces matching the search, without loading their spans
    async fn find_trace_ids(&self, query: &TraceSearchQuery) -> Result<Vec<TraceId>>;

    /// Every span of one trace, or `None` if the trace has no stored spans
    async fn get_trace(&self, trace_id: TraceId) -> Result<Option<Trace>>;
}

/// Maps the configured malformed-span behavior onto a reconstruction policy
pub fn malformed_span_policy(config: &SearchConfig) -> MalformedSpanPolicy {
    if config.skip_malformed_spans {
        MalformedSpanPolicy::Skip
    } else {
        MalformedSpanPolicy::Fail
    }
}

/// PgSpanReader - Runs compiled trace searches against the normalized span schema
#[derive(Debug, Clone)]
pub struct PgSpanReader {
    pool: PgPool,
    policy: MalformedSpanPolicy,
}

impl PgSpanReader {
    /// Create a reader over an existing pool
    pub fn new(pool: PgPool, policy: MalformedSpanPolicy) -> Self {
        Self { pool, policy }
    }

    /// Connect using the Postgres and search sections of the configuration
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = create_pool(&config.postgres).await?;
        Ok(Self::new(pool, malformed_span_policy(&config.search)))
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn policy(&self) -> MalformedSpanPolicy {
        self.policy
    }

    /// Lazily streams the traces matching a search
    ///
    /// Rows are pulled from the database cursor as the stream is polled.
    /// The stream ends after the first error, and dropping it at any point
    /// releases the cursor and its connection.
    pub fn stream_traces(
        &self,
        query: &TraceSearchQuery,
    ) -> impl Stream<Item = Result<Trace>> + Send + '_ {
        let checked = query.validate().map(|_| compile(query));
        stream! {
            let compiled = match checked {
                Ok(compiled) => compiled,
                Err(e) => {
                    yield Err(StorageError::from(e));
                    return;
                }
            };
            debug!(shape = compiled.shape(), "streaming traces");

            let traces = trace_stream(self.span_batches(&compiled));
            futures::pin_mut!(traces);
            while let Some(trace) = traces.next().await {
                yield trace;
            }
        }
    }

    /// Rows of a compiled span query, converted into single-span batches
    fn span_batches<'a>(
        &'a self,
        compiled: &'a CompiledQuery,
    ) -> impl Stream<Item = Result<Batch>> + Send + 'a {
        let policy = self.policy;
        let shape = compiled.shape();

        prepare(compiled).fetch(&self.pool).filter_map(move |row| {
            let batch = match row {
                Err(source) => Some(Err(StorageError::execution(shape, source))),
                Ok(row) => match SpanRow::from_pg_row(&row) {
                    Err(e) => Some(Err(StorageError::from(e))),
                    Ok(span_row) => policy
                        .apply(row_to_batch(span_row))
                        .map(|batch| batch.map_err(StorageError::from)),
                },
            };
            futures::future::ready(batch)
        })
    }
}

#[async_trait]
impl SpanReader for PgSpanReader {
    #[tracing::instrument(skip(self, query))]
    async fn find_traces(&self, query: &TraceSearchQuery) -> Result<Vec<Trace>> {
        let traces: Vec<Trace> = self.stream_traces(query).try_collect().await?;
        info!(traces = traces.len(), "trace search complete");
        Ok(traces)
    }

    #[tracing::instrument(skip(self, query), fields(shape = tracing::field::Empty))]
    async fn find_trace_ids(&self, query: &TraceSearchQuery) -> Result<Vec<TraceId>> {
        query.validate()?;
        let compiled = compile_trace_ids(query);
        tracing::Span::current().record("shape", compiled.shape());

        let rows = prepare(&compiled)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| StorageError::execution(compiled.shape(), source))?;

        let ids = rows
            .iter()
            .map(|row| {
                row.try_get::<Uuid, _>(0)
                    .map(|id| TraceId::from_bytes(id.into_bytes()))
                    .map_err(|source| ReconstructError::Scan {
                        column: columns::TRACE_ID,
                        source,
                    })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        info!(trace_ids = ids.len(), "trace id search complete");
        Ok(ids)
    }

    #[tracing::instrument(skip(self, trace_id), fields(trace_id = %trace_id))]
    async fn get_trace(&self, trace_id: TraceId) -> Result<Option<Trace>> {
        let compiled = compile_trace_by_id(trace_id);
        let traces: Vec<Trace> = trace_stream(self.span_batches(&compiled)).try_collect().await?;

        // The lookup pins a single trace ID, so at most one group comes back.
        Ok(traces.into_iter().next())
    }
}
