//! `GeoJSON` serialization of query results.
//!
//! Builds the `FeatureCollection` response from road rows. The mapping
//! from stored classification ranks back to tag values is exhaustive
//! over everything ingestion can write; a rank outside it means the
//! store holds data this build does not understand, so that row is
//! logged and dropped while the rest of the response proceeds.

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use road_map_models::{HighwayClass, RoadRow, UnknownHighwayRank};

/// Attribution carried on every response collection.
pub const COPYRIGHT: &str = "The data included in this document is from \
     www.openstreetmap.org. The data is made available under ODbL.";

/// Serializes road rows into a `FeatureCollection`.
///
/// Output is deterministic: the same rows always produce byte-identical
/// `GeoJSON`.
#[must_use]
pub fn roads_to_feature_collection(rows: &[RoadRow]) -> FeatureCollection {
    let mut features = Vec::with_capacity(rows.len());

    for row in rows {
        match road_to_feature(row) {
            Ok(feature) => features.push(feature),
            Err(e) => {
                log::warn!("Dropping road {}/{} from response: {e}", row.id_type, row.id);
            }
        }
    }

    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        "copyright".to_string(),
        JsonValue::String(COPYRIGHT.to_string()),
    );

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    }
}

/// Serializes one road row into a `Feature`.
///
/// # Errors
///
/// Returns [`UnknownHighwayRank`] if the stored rank has no
/// classification.
fn road_to_feature(row: &RoadRow) -> Result<Feature, UnknownHighwayRank> {
    let class = HighwayClass::try_from(row.highway_rank)?;
    let compound_id = format!("{}/{}", row.id_type, row.id);

    let mut properties = JsonObject::new();
    properties.insert(
        "@id".to_string(),
        JsonValue::String(compound_id.clone()),
    );
    properties.insert(
        "highway".to_string(),
        JsonValue::String(class.as_str().to_string()),
    );
    if let Some(route_ref) = &row.route_ref {
        properties.insert("ref".to_string(), JsonValue::String(route_ref.clone()));
    }

    Ok(Feature {
        bbox: None,
        geometry: Some(road_map_spatial::line_string_to_geojson(&row.geometry)),
        id: Some(Id::String(compound_id)),
        properties: Some(properties),
        foreign_members: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Coord, LineString};

    fn road(highway_rank: i16) -> RoadRow {
        RoadRow {
            id: 38_284_783,
            id_type: "way".to_string(),
            highway_rank,
            route_ref: Some("M1".to_string()),
            geometry: LineString::new(vec![
                Coord { x: 153.0, y: -27.5 },
                Coord { x: 153.01, y: -27.49 },
            ]),
        }
    }

    #[test]
    fn serializes_road_row_to_feature() {
        let collection = roads_to_feature_collection(&[road(0)]);
        assert_eq!(collection.features.len(), 1);

        let feature = &collection.features[0];
        let properties = feature.properties.as_ref().unwrap();
        assert_eq!(properties["@id"], "way/38284783");
        assert_eq!(properties["highway"], "motorway");
        assert_eq!(properties["ref"], "M1");
        assert_eq!(feature.id, Some(Id::String("way/38284783".to_string())));

        let geometry = feature.geometry.as_ref().unwrap();
        let geojson::Value::LineString(positions) = &geometry.value else {
            panic!("expected LineString geometry");
        };
        assert_eq!(positions[0], vec![153.0, -27.5]);
    }

    #[test]
    fn omits_ref_property_when_unsigned() {
        let mut row = road(2);
        row.route_ref = None;
        let collection = roads_to_feature_collection(&[row]);
        let properties = collection.features[0].properties.as_ref().unwrap();
        assert!(!properties.contains_key("ref"));
        assert_eq!(properties["highway"], "primary");
    }

    #[test]
    fn collection_carries_copyright_member() {
        let collection = roads_to_feature_collection(&[]);
        let members = collection.foreign_members.as_ref().unwrap();
        assert_eq!(members["copyright"], COPYRIGHT);
    }

    #[test]
    fn unmapped_rank_is_dropped_not_fatal() {
        let collection = roads_to_feature_collection(&[road(0), road(9)]);
        assert_eq!(collection.features.len(), 1);
        let properties = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(properties["highway"], "motorway");
    }

    #[test]
    fn serialization_is_idempotent() {
        let rows = vec![road(0), road(3)];
        let first = serde_json::to_vec(&roads_to_feature_collection(&rows)).unwrap();
        let second = serde_json::to_vec(&roads_to_feature_collection(&rows)).unwrap();
        assert_eq!(first, second);
    }
}
