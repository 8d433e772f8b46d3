use anyhow::{Context, Result};
use docdrop_core::ClientConfig;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Workspace `migrations/`, embedded at build time
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Connect to the metadata database named by `DATABASE_URL` and bring its
/// schema up to date.
pub async fn setup_database(config: &ClientConfig) -> Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to use the postgres record store")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(database_url)
        .await
        .context("Failed to connect to metadata database")?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Metadata database connected"
    );

    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("Failed to apply upload record migrations")?;
    tracing::debug!("Upload record migrations applied");
    Ok(())
}
