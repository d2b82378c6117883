#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the road map ingestion tool.

use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use road_map_database::db::DatabaseConfig;
use road_map_database::run_migrations;
use road_map_ingest::census::CensusCsvSource;
use road_map_ingest::progress::{LogProgress, ProgressCallback};
use road_map_ingest::roads::OsmGeoJsonSource;
use road_map_ingest::{IngestConfig, IngestReport, ingest_source};
use sqlx::PgPool;

/// Log a progress line every this many processed records.
const PROGRESS_INTERVAL: u64 = 1000;

#[derive(Parser)]
#[command(name = "road_map_ingest", about = "Road map data ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Ingest the traffic census CSV endpoints
    Census {
        /// Override the census CSV URL (repeatable)
        #[arg(long)]
        url: Vec<String>,
    },
    /// Ingest the local OSM GeoJSON road extract
    Roads {
        /// Override the path to the GeoJSON extract
        #[arg(long)]
        path: Option<std::path::PathBuf>,
    },
    /// Ingest every configured source
    All,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let db_config = DatabaseConfig::from_env();
    let mut config = IngestConfig::from_env();

    log::info!("Connecting to database...");
    let pool = db_config.connect().await?;

    log::info!("Running migrations...");
    run_migrations(&pool).await?;

    let started = Instant::now();

    match cli.command {
        Commands::Migrate => {}
        Commands::Census { url } => {
            if !url.is_empty() {
                config.census_urls = url;
            }
            ingest_census(&pool, &config).await?;
        }
        Commands::Roads { path } => {
            if let Some(path) = path {
                config.osm_data_path = path;
            }
            ingest_roads(&pool, &config).await?;
        }
        Commands::All => {
            ingest_census(&pool, &config).await?;
            ingest_roads(&pool, &config).await?;
        }
    }

    log::info!("Done in {:.1?}", started.elapsed());
    Ok(())
}

async fn ingest_census(
    pool: &PgPool,
    config: &IngestConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    for url in &config.census_urls {
        let source = CensusCsvSource::new(url, config.census_year);
        let progress: Arc<dyn ProgressCallback> = Arc::new(LogProgress::new(
            format!("census {}", config.census_year),
            PROGRESS_INTERVAL,
        ));

        let report = ingest_source(pool, &source, &progress).await?;
        log_report("census", &report);
    }
    Ok(())
}

async fn ingest_roads(
    pool: &PgPool,
    config: &IngestConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = OsmGeoJsonSource::new(&config.osm_data_path);
    let progress: Arc<dyn ProgressCallback> = Arc::new(LogProgress::new(
        "osm roads".to_string(),
        PROGRESS_INTERVAL,
    ));

    let report = ingest_source(pool, &source, &progress).await?;
    log_report("roads", &report);
    Ok(())
}

fn log_report(label: &str, report: &IngestReport) {
    log::info!(
        "{label}: inserted {}, skipped {}, failed {}",
        report.inserted,
        report.skipped,
        report.failed
    );
}
