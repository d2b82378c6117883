//! Database connection utilities.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::DbError;

/// Connection settings for the `PostGIS` store.
///
/// Built once at process start and passed to whichever component needs a
/// pool, rather than read ambiently at query time.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection URL.
    pub url: String,
    /// Maximum pooled connections.
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Reads the configuration from the environment.
    ///
    /// `DATABASE_URL` wins when set; otherwise the URL is composed from
    /// the standard `PGUSER` / `PGPASSWORD` / `PGHOST` / `PGDATABASE`
    /// variables with local development defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            let user = std::env::var("PGUSER").unwrap_or_else(|_| "postgres".to_string());
            let password = std::env::var("PGPASSWORD").unwrap_or_else(|_| "postgres".to_string());
            let host = std::env::var("PGHOST").unwrap_or_else(|_| "localhost".to_string());
            let dbname = std::env::var("PGDATABASE").unwrap_or_else(|_| "road_map".to_string());
            format!("postgres://{user}:{password}@{host}/{dbname}")
        });

        let max_connections = std::env::var("PG_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Self {
            url,
            max_connections,
        }
    }

    /// Opens a connection pool against the configured store.
    ///
    /// Each logical operation acquires a connection from this pool for
    /// its duration; the acquisition guard returns it on every exit
    /// path, including errors and cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the pool cannot connect.
    pub async fn connect(&self) -> Result<PgPool, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&self.url)
            .await?;

        Ok(pool)
    }
}
