use crate::error::{Result, StorageError};
use config::PostgresConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Create a Postgres connection pool from configuration
///
/// Parameters:
/// - config: Postgres configuration containing the URL and pool limits
///
/// Returns:
/// - A pool that has opened at least one connection
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    info!(
        url = %config.redacted_url(),
        max_connections = config.max_connections,
        "connecting to Postgres"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(StorageError::Connect)
}
