#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Statement builder, queries, and migrations for the road map store.
//!
//! Spatial queries are assembled by the [`statement::StatementBuilder`],
//! which renumbers positional placeholders across filter conditions, and
//! executed against `PostGIS` through a pooled `sqlx` connection.

pub mod db;
pub mod queries;
pub mod statement;

use sqlx::PgPool;

/// Embedded SQL migrations from the top-level `migrations/` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Malformed filter input. Raised before any statement reaches the
    /// store.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what went wrong.
        message: String,
    },
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    MIGRATOR.run(pool).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}
