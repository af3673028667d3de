//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! dewdrop-cli migrate storefront
//! dewdrop-cli migrate admin
//! dewdrop-cli migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for storefront
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for admin
//!
//! Both fall back to `DATABASE_URL`.

use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("{0} is not set (and neither is DATABASE_URL)")]
    MissingEnvVar(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Apply the catalog and review migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    tracing::info!("Connecting to storefront database...");
    let pool = super::connect("STOREFRONT_DATABASE_URL")
        .await
        .ok_or(MigrationError::MissingEnvVar("STOREFRONT_DATABASE_URL"))??;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete");
    Ok(())
}

/// Apply the order migrations and create the operator session table.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn admin() -> Result<(), MigrationError> {
    tracing::info!("Connecting to admin database...");
    let pool = super::connect("ADMIN_DATABASE_URL")
        .await
        .ok_or(MigrationError::MissingEnvVar("ADMIN_DATABASE_URL"))??;

    tracing::info!("Running admin migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Admin migrations complete");
    Ok(())
}
