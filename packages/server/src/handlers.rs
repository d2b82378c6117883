//! HTTP handler functions for the road map API.

use actix_web::{HttpResponse, web};
use road_map_database::DbError;
use road_map_database::queries::{self, RoadQuery};
use road_map_models::Viewport;

use crate::AppState;
use crate::serialize::roads_to_feature_collection;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "healthy": true,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /list_roads`
///
/// Returns the roads visible in the requested viewport rectangle as a
/// `GeoJSON` `FeatureCollection`, most significant classes first, capped
/// at the configured result limit.
pub async fn list_roads(state: web::Data<AppState>, body: web::Json<Viewport>) -> HttpResponse {
    let query = RoadQuery {
        viewport: Some(body.into_inner()),
        limit: state.road_limit,
    };

    match queries::query_roads(&state.pool, &query).await {
        Ok(rows) => HttpResponse::Ok().json(roads_to_feature_collection(&rows)),
        Err(DbError::Validation { message }) => {
            HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
        }
        Err(e) => {
            log::error!("Failed to query roads: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to query roads"
            }))
        }
    }
}

/// `POST /get_rest_stops`
///
/// Declared for the heavy-vehicle rest stop dataset, which is not
/// served yet.
pub async fn get_rest_stops(_body: web::Json<Viewport>) -> HttpResponse {
    HttpResponse::NotImplemented().json(serde_json::json!({
        "error": "Rest stop data is not available yet"
    }))
}
