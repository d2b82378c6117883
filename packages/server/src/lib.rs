#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the road map.
//!
//! Serves road-network features as `GeoJSON` for a viewport rectangle.
//! Requests are independent: each builds its own statement/argument
//! pair and borrows a pooled store connection only for the duration of
//! its query.

mod handlers;
pub mod serialize;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use road_map_database::queries::DEFAULT_ROAD_LIMIT;
use sqlx::PgPool;

/// Shared application state.
pub struct AppState {
    /// `PostGIS` connection pool.
    pub pool: PgPool,
    /// Result cap for road queries.
    pub road_limit: i64,
}

/// Bind settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Result cap for road queries.
    pub road_limit: i64,
}

impl ServerConfig {
    /// Reads the configuration from `BIND_ADDR`, `PORT`, and
    /// `ROAD_MAP_ROAD_LIMIT`, with local development defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(9999);
        let road_limit = std::env::var("ROAD_MAP_ROAD_LIMIT")
            .ok()
            .and_then(|limit| limit.parse().ok())
            .unwrap_or(DEFAULT_ROAD_LIMIT);

        Self {
            bind_addr,
            port,
            road_limit,
        }
    }
}

/// Starts the road map API server over an already-connected pool.
///
/// This is a regular async function; the caller provides the async
/// runtime (e.g. via `#[actix_web::main]`) and the migrated database
/// pool.
///
/// # Errors
///
/// Returns an error if the HTTP server fails to bind or encounters a
/// runtime error.
pub async fn run_server(pool: PgPool, config: ServerConfig) -> std::io::Result<()> {
    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    let road_limit = config.road_limit;

    HttpServer::new(move || {
        let cors = Cors::permissive();

        let state = web::Data::new(AppState {
            pool: pool.clone(),
            road_limit,
        });

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state)
            .route("/list_roads", web::post().to(handlers::list_roads))
            .route("/get_rest_stops", web::post().to(handlers::get_rest_stops))
            .route("/api/health", web::get().to(handlers::health))
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
