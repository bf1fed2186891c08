//! Connection pool setup and liveness checks.

use crate::config::ServiceConfig;
use crate::error::CatalogError;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;

fn pool_options(config: &ServiceConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
}

fn connect_options(database_url: &str) -> Result<PgConnectOptions, CatalogError> {
    PgConnectOptions::from_str(database_url)
        .map_err(|e| CatalogError::Config(format!("invalid DATABASE_URL: {}", e)))
}

/// Open the pool and make one round trip so connection failures surface at startup.
pub async fn connect(config: &ServiceConfig) -> Result<PgPool, CatalogError> {
    let opts = connect_options(&config.database_url)?;
    let pool = pool_options(config)
        .connect_with(opts)
        .await
        .map_err(CatalogError::from_sqlx)?;
    ping(&pool).await.map_err(CatalogError::from_sqlx)?;
    tracing::info!(max_connections = config.max_connections, "database pool ready");
    Ok(pool)
}

/// Pool that connects on first use. Lets the router be exercised without a running database.
pub fn connect_lazy(config: &ServiceConfig) -> Result<PgPool, CatalogError> {
    let opts = connect_options(&config.database_url)?;
    Ok(pool_options(config).connect_lazy_with(opts))
}

pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
