#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Process entry point for the road map API server.

use road_map_database::db::DatabaseConfig;
use road_map_database::run_migrations;
use road_map_server::{ServerConfig, run_server};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let db_config = DatabaseConfig::from_env();
    let server_config = ServerConfig::from_env();

    log::info!("Connecting to database...");
    let pool = db_config.connect().await.map_err(std::io::Error::other)?;

    log::info!("Running migrations...");
    run_migrations(&pool).await.map_err(std::io::Error::other)?;

    run_server(pool, server_config).await
}
