//! Traffic census CSV source.
//!
//! The Queensland open-data portal publishes the annual traffic census
//! as comma-delimited CSV: a header row naming the fields, then one
//! observation per line. Rows with missing or unparseable numeric
//! fields are common (partial observations) and are skipped
//! individually.

use std::collections::BTreeMap;

use async_trait::async_trait;
use geo_types::Point;
use road_map_database::DbError;
use road_map_database::queries::{self, NewCensusSite};
use sqlx::{Postgres, Transaction};

use crate::{IngestError, RecordIter, RecordOutcome, RecordSource};

/// One remote census CSV endpoint for one census year.
pub struct CensusCsvSource {
    url: String,
    year: i16,
    label: String,
}

impl CensusCsvSource {
    /// Creates a source over the CSV at `url` covering `year`.
    #[must_use]
    pub fn new(url: &str, year: i16) -> Self {
        Self {
            url: url.to_owned(),
            year,
            label: format!("census {year}"),
        }
    }
}

#[async_trait]
impl RecordSource for CensusCsvSource {
    type Row = NewCensusSite;

    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch(&self) -> Result<RecordIter<Self::Row>, IngestError> {
        let client = reqwest::Client::builder().build()?;
        let response = client.get(&self.url).send().await?.error_for_status()?;
        let body = response.text().await?;

        log::debug!("[{}] Downloaded {} bytes from {}", self.label, body.len(), self.url);

        Ok(parse_census_body(&body, self.year))
    }

    async fn insert_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rows: &[Self::Row],
    ) -> Result<u64, DbError> {
        queries::insert_census_batch(tx, rows).await
    }
}

/// Parses the CSV body into a record iterator, keyed by the header row.
///
/// Short rows are tolerated (missing fields fail coercion per record,
/// not the parse); an empty body or one with only a header yields no
/// records.
#[must_use]
pub fn parse_census_body(body: &str, year: i16) -> RecordIter<NewCensusSite> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(str::to_owned).collect(),
        Err(e) => {
            return Box::new(std::iter::once(RecordOutcome::Skipped(format!(
                "unreadable CSV header row: {e}"
            ))));
        }
    };

    let records: Vec<RecordOutcome<NewCensusSite>> = reader
        .into_records()
        .filter_map(|result| match result {
            // Whitespace-only lines are noise, not observations.
            Ok(record) if record.iter().all(str::is_empty) => None,
            Ok(record) => Some(coerce_census_record(&headers, &record, year)),
            Err(e) => Some(RecordOutcome::Skipped(format!(
                "unreadable CSV record: {e}"
            ))),
        })
        .collect();

    Box::new(records.into_iter())
}

/// Coerces one CSV record into a [`NewCensusSite`].
fn coerce_census_record(
    headers: &[String],
    record: &csv::StringRecord,
    year: i16,
) -> RecordOutcome<NewCensusSite> {
    let fields: BTreeMap<&str, &str> = headers
        .iter()
        .map(String::as_str)
        .zip(record.iter())
        .collect();

    match coerce_fields(&fields, year) {
        Ok(site) => RecordOutcome::Row(site),
        Err(message) => RecordOutcome::Skipped(message),
    }
}

fn coerce_fields(fields: &BTreeMap<&str, &str>, year: i16) -> Result<NewCensusSite, String> {
    let site_id = required_i64(fields, "SITE")?;
    let longitude = required_f64(fields, "LONGITUDE")?;
    let latitude = required_f64(fields, "LATITUDE")?;
    let aadt = required_f64(fields, "AADT")?;

    let pcnt_hv = match fields.get("PC_CLASS_0B").copied().unwrap_or("") {
        "" => None,
        raw => {
            let value = parse_f64("PC_CLASS_0B", raw)?;
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("PC_CLASS_0B out of range [0, 100]: {value}"));
            }
            Some(value)
        }
    };

    let location_wkt = road_map_spatial::point_to_wkt(&Point::new(longitude, latitude))
        .map_err(|e| e.to_string())?;

    Ok(NewCensusSite {
        site_id,
        year,
        location_wkt,
        aadt,
        pcnt_hv,
    })
}

fn required_i64(fields: &BTreeMap<&str, &str>, name: &str) -> Result<i64, String> {
    let raw = fields
        .get(name)
        .copied()
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| format!("missing required field: {name}"))?;
    raw.parse()
        .map_err(|_| format!("non-numeric {name}: {raw:?}"))
}

fn required_f64(fields: &BTreeMap<&str, &str>, name: &str) -> Result<f64, String> {
    let raw = fields
        .get(name)
        .copied()
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| format!("missing required field: {name}"))?;
    parse_f64(name, raw)
}

fn parse_f64(name: &str, raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("non-numeric {name}: {raw:?}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("non-finite {name}: {raw:?}"))
    }
}
