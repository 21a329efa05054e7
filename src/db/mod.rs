use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::utils::{retry_on_transient, IsTransient, RetryConfig};

// ============================================================================
// Postgres Connection & Migrations
// ============================================================================

impl IsTransient for sqlx::Error {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_)
        )
    }
}

/// Connect to Postgres, retrying while the server is unreachable.
pub async fn connect(config: &DatabaseConfig, url: &str) -> Result<PgPool> {
    let options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5));

    let pool = retry_on_transient(RetryConfig::with_attempts(config.connect_attempts), |attempt| {
        tracing::debug!(attempt = attempt, "Connecting to Postgres");
        options.clone().connect(url)
    })
    .await
    .into_result()
    .context("failed to connect to Postgres")?;

    tracing::info!(max_connections = config.max_connections, "✅ Connected to Postgres");
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    tracing::info!("✅ Database migrations applied");
    Ok(())
}
