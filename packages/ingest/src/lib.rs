#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Batched geometry ingestion pipeline for the road map store.
//!
//! Each external dataset implements [`RecordSource`]: it fetches its raw
//! data completely (network I/O finishes before any store connection is
//! taken), then yields records through a pull-based iterator where each
//! item is a coerced row, a skipped partial record, a structurally
//! unusable record, or a record excluded by design.
//!
//! [`ingest_source`] drives the iterator, buffers rows into batches of
//! [`BATCH_SIZE`], and flushes each batch as one multi-row insert inside
//! a single transaction per source. Skipped and failed records are
//! counted and the run continues; any store error aborts and rolls back
//! the whole source.

pub mod census;
pub mod progress;
pub mod roads;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use road_map_database::DbError;
use sqlx::{PgPool, Postgres, Transaction};

use crate::progress::ProgressCallback;

/// Records buffered before a batch flush.
pub const BATCH_SIZE: usize = 100;

/// Errors that can occur during ingestion.
///
/// Per-record coercion failures are not represented here; they travel as
/// [`RecordOutcome::Skipped`] items so one malformed row never aborts a
/// run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON parse error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    /// Store operation failed; the surrounding transaction rolls back.
    #[error("Store error: {0}")]
    Db(#[from] DbError),

    /// The source data has an unusable overall structure.
    #[error("Malformed source: {message}")]
    Source {
        /// Description of what went wrong.
        message: String,
    },
}

/// Outcome of coercing one raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome<T> {
    /// A coerced row ready for insertion.
    Row(T),
    /// A field value failed coercion; counted as skipped. Partial rows
    /// are expected in the source data.
    Skipped(String),
    /// The record is structurally unusable (missing id or geometry);
    /// counted as failed.
    Failed(String),
    /// Record is out of scope by design (e.g. a non-highway feature);
    /// not counted at all.
    Excluded,
}

/// Finite, non-restartable record iterator produced by one fetch. A
/// retry requires a fresh [`RecordSource::fetch`].
pub type RecordIter<T> = Box<dyn Iterator<Item = RecordOutcome<T>> + Send>;

/// Counters reported by one source ingestion. Records excluded by
/// design are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Rows committed to the store.
    pub inserted: u64,
    /// Records dropped by field coercion failures.
    pub skipped: u64,
    /// Structurally unusable records.
    pub failed: u64,
}

/// An external dataset that can be ingested into the store.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// The coerced row type this source produces.
    type Row: Send + Sync;

    /// Human-readable label for log messages.
    fn label(&self) -> &str;

    /// Fetches the raw source completely and returns the record
    /// iterator over it. All network I/O happens here, before the
    /// caller opens a store transaction.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the fetch or structural parse fails.
    async fn fetch(&self) -> Result<RecordIter<Self::Row>, IngestError>;

    /// Inserts one batch of coerced rows inside the caller's
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    async fn insert_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rows: &[Self::Row],
    ) -> Result<u64, DbError>;
}

/// Ingests one source atomically.
///
/// Either every successfully coerced record of the source commits, or
/// (on a store error at any batch) none do — earlier flushes roll back
/// together with the rest when the transaction drops.
///
/// # Errors
///
/// Returns [`IngestError`] if the fetch fails or the store rejects a
/// batch. Per-record coercion failures are counted in the report, not
/// returned.
pub async fn ingest_source<S: RecordSource>(
    pool: &PgPool,
    source: &S,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<IngestReport, IngestError> {
    log::info!("[{}] Fetching source data...", source.label());
    let records = source.fetch().await?;

    let (batches, mut report) = drain_records(records, source.label(), progress);

    let mut tx = pool.begin().await.map_err(DbError::from)?;
    for batch in &batches {
        report.inserted += source.insert_batch(&mut tx, batch).await?;
    }
    tx.commit().await.map_err(DbError::from)?;

    progress.finish(format!(
        "[{}] {} inserted, {} skipped, {} failed",
        source.label(),
        report.inserted,
        report.skipped,
        report.failed
    ));

    Ok(report)
}

/// Drains a record iterator into insert-ready batches of [`BATCH_SIZE`],
/// counting skipped and failed records along the way. `inserted` stays
/// zero until the batches are flushed.
fn drain_records<T>(
    records: RecordIter<T>,
    label: &str,
    progress: &Arc<dyn ProgressCallback>,
) -> (Vec<Vec<T>>, IngestReport) {
    let mut report = IngestReport::default();
    let mut batches: Vec<Vec<T>> = Vec::new();
    let mut batch: Vec<T> = Vec::with_capacity(BATCH_SIZE);

    for outcome in records {
        progress.inc(1);

        match outcome {
            RecordOutcome::Row(row) => {
                batch.push(row);
                if batch.len() >= BATCH_SIZE {
                    batches.push(std::mem::replace(&mut batch, Vec::with_capacity(BATCH_SIZE)));
                }
            }
            RecordOutcome::Skipped(reason) => {
                log::warn!("[{label}] Skipping record: {reason}");
                report.skipped += 1;
            }
            RecordOutcome::Failed(reason) => {
                log::warn!("[{label}] Unusable record: {reason}");
                report.failed += 1;
            }
            RecordOutcome::Excluded => {}
        }
    }

    if !batch.is_empty() {
        batches.push(batch);
    }

    (batches, report)
}

/// External configuration for the ingestion binary.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Path to the local OSM `GeoJSON` extract.
    pub osm_data_path: PathBuf,
    /// Traffic census CSV endpoints.
    pub census_urls: Vec<String>,
    /// Census year the CSV endpoints cover.
    pub census_year: i16,
}

/// 2020 Queensland traffic census extract.
const DEFAULT_CENSUS_URL: &str = "https://www.data.qld.gov.au/dataset/5d74e022-a302-4f40-a594-f1840c92f671/resource/1f52e522-7cb8-451c-b4c2-8467a087e883/download/trafficcensus2020.csv";

impl IngestConfig {
    /// Reads the configuration from the environment.
    ///
    /// `ROAD_MAP_OSM_PATH` locates the `GeoJSON` extract,
    /// `ROAD_MAP_CENSUS_URLS` (comma-separated) and
    /// `ROAD_MAP_CENSUS_YEAR` override the default 2020 Queensland
    /// dataset.
    #[must_use]
    pub fn from_env() -> Self {
        let osm_data_path = std::env::var("ROAD_MAP_OSM_PATH")
            .unwrap_or_else(|_| "data/roads.geojson".to_string())
            .into();

        let census_urls = std::env::var("ROAD_MAP_CENSUS_URLS")
            .map(|urls| {
                urls.split(',')
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_else(|_| vec![DEFAULT_CENSUS_URL.to_string()]);

        let census_year = std::env::var("ROAD_MAP_CENSUS_YEAR")
            .ok()
            .and_then(|year| year.parse().ok())
            .unwrap_or(2020);

        Self {
            osm_data_path,
            census_urls,
            census_year,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{LogProgress, null_progress};

    fn records(items: Vec<RecordOutcome<u32>>) -> RecordIter<u32> {
        Box::new(items.into_iter())
    }

    #[test]
    fn drain_flushes_at_threshold_and_keeps_the_remainder() {
        let items: Vec<_> = (0..250).map(RecordOutcome::Row).collect();
        let progress = null_progress();

        let (batches, report) = drain_records(records(items), "test", &progress);

        assert_eq!(
            batches.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![BATCH_SIZE, BATCH_SIZE, 50]
        );
        assert_eq!(report, IngestReport::default());
    }

    #[test]
    fn drain_counts_one_row_one_skip_from_mixed_source() {
        let items = vec![
            RecordOutcome::Row(1),
            RecordOutcome::Skipped("non-numeric AADT".to_string()),
        ];
        let progress = null_progress();

        let (batches, report) = drain_records(records(items), "test", &progress);

        assert_eq!(batches, vec![vec![1]]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.inserted, 0);
    }

    #[test]
    fn drain_separates_failed_and_excluded_from_skipped() {
        let items = vec![
            RecordOutcome::Row(1),
            RecordOutcome::Failed("missing geometry".to_string()),
            RecordOutcome::Excluded,
            RecordOutcome::Excluded,
            RecordOutcome::Row(2),
        ];
        let progress = null_progress();

        let (batches, report) = drain_records(records(items), "test", &progress);

        assert_eq!(batches, vec![vec![1, 2]]);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn drain_advances_progress_for_every_record() {
        let items = vec![
            RecordOutcome::Row(1),
            RecordOutcome::Skipped("bad".to_string()),
            RecordOutcome::Excluded,
        ];
        let progress: Arc<dyn ProgressCallback> =
            Arc::new(LogProgress::new("test".to_string(), 1000));

        drain_records(records(items), "test", &progress);

        assert_eq!(progress.position(), 3);
    }
}
