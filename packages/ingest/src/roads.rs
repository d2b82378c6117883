//! OSM road geometry source.
//!
//! Reads a local `GeoJSON` extract of OSM features. Only features with a
//! `highway` tag in one of the imported classes become road rows; the
//! rest of the extract (buildings, waterways, minor roads) is excluded
//! by design rather than counted as failures.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use geojson::{Feature, GeoJson};
use road_map_database::DbError;
use road_map_database::queries::{self, NewRoad};
use road_map_models::HighwayClass;
use sqlx::{Postgres, Transaction};

use crate::{IngestError, RecordIter, RecordOutcome, RecordSource};

/// A local OSM `GeoJSON` extract.
pub struct OsmGeoJsonSource {
    path: PathBuf,
}

impl OsmGeoJsonSource {
    /// Creates a source over the extract at `path`.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl RecordSource for OsmGeoJsonSource {
    type Row = NewRoad;

    fn label(&self) -> &str {
        "osm roads"
    }

    async fn fetch(&self) -> Result<RecordIter<Self::Row>, IngestError> {
        let body = tokio::fs::read_to_string(&self.path).await?;
        let geojson: GeoJson = body.parse().map_err(Box::new)?;

        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(IngestError::Source {
                message: format!("{} is not a GeoJSON FeatureCollection", self.path.display()),
            });
        };

        log::debug!(
            "[{}] Read {} features from {}",
            self.label(),
            collection.features.len(),
            self.path.display()
        );

        Ok(Box::new(collection.features.into_iter().map(coerce_road_feature)))
    }

    async fn insert_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rows: &[Self::Row],
    ) -> Result<u64, DbError> {
        queries::insert_road_batch(tx, rows).await
    }
}

/// Coerces one OSM feature into a [`NewRoad`].
///
/// Features without a recognized `highway` class are excluded; features
/// that carry one but lack a usable id or geometry are failed.
#[must_use]
pub fn coerce_road_feature(feature: Feature) -> RecordOutcome<NewRoad> {
    let Some(properties) = &feature.properties else {
        return RecordOutcome::Excluded;
    };

    let Some(class) = properties
        .get("highway")
        .and_then(serde_json::Value::as_str)
        .and_then(HighwayClass::from_tag)
    else {
        return RecordOutcome::Excluded;
    };

    let route_ref = properties
        .get("ref")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned);

    let (id_type, id) = match parse_compound_id(feature.id.as_ref()) {
        Ok(parts) => parts,
        Err(message) => return RecordOutcome::Failed(message),
    };

    let Some(geometry) = &feature.geometry else {
        return RecordOutcome::Failed(format!("{id_type}/{id} has no geometry"));
    };

    let line = match road_map_spatial::line_string_from_geojson(&geometry.value) {
        Ok(line) => line,
        Err(e) => return RecordOutcome::Failed(format!("{id_type}/{id}: {e}")),
    };

    let route_wkt = match road_map_spatial::line_string_to_wkt(&line) {
        Ok(wkt) => wkt,
        Err(e) => return RecordOutcome::Failed(format!("{id_type}/{id}: {e}")),
    };

    RecordOutcome::Row(NewRoad {
        id,
        id_type,
        highway_class: class.rank(),
        route_ref,
        route_wkt,
    })
}

/// Splits an OSM compound id of the form `"{type}/{numeric-id}"`.
fn parse_compound_id(id: Option<&geojson::feature::Id>) -> Result<(String, i64), String> {
    let Some(geojson::feature::Id::String(raw)) = id else {
        return Err("feature id is missing or not a string".to_string());
    };

    let Some((id_type, number)) = raw.split_once('/') else {
        return Err(format!("feature id is not '{{type}}/{{id}}': {raw:?}"));
    };

    if id_type.is_empty() {
        return Err(format!("feature id has an empty type: {raw:?}"));
    }

    let id: i64 = number
        .parse()
        .map_err(|_| format!("feature id is not numeric: {raw:?}"))?;

    Ok((id_type.to_owned(), id))
}
