//! Road and census queries against the `PostGIS` store.

use road_map_models::{RoadRow, Viewport};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row as _, Transaction};

use crate::DbError;
use crate::statement::{SqlValue, StatementBuilder};

/// Cap on features returned by a single road query. Bounds the response
/// for oversized viewports; lower-ranked classes are dropped first
/// because results are ordered by rank.
pub const DEFAULT_ROAD_LIMIT: i64 = 2000;

/// Fields that road filters may reference.
const ROAD_FILTER_FIELDS: &[&str] = &["route"];

/// Viewport predicate: a road qualifies when it partially crosses the
/// viewport envelope or is fully contained by it.
const VIEWPORT_CLAUSE: &str = "ST_Crosses(ST_MakeEnvelope({}, {}, {}, {}, 4326), \
     route::geometry) OR ST_Contains(ST_MakeEnvelope({}, {}, {}, {}, 4326), route::geometry)";

/// Parameters for querying roads from the store.
#[derive(Debug, Clone, Copy)]
pub struct RoadQuery {
    /// Viewport rectangle filter.
    pub viewport: Option<Viewport>,
    /// Result cap.
    pub limit: i64,
}

impl Default for RoadQuery {
    fn default() -> Self {
        Self {
            viewport: None,
            limit: DEFAULT_ROAD_LIMIT,
        }
    }
}

/// A road to insert, with its geometry already encoded for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRoad {
    /// Numeric OSM id.
    pub id: i64,
    /// OSM id category (`way`, `node`, `relation`).
    pub id_type: String,
    /// Classification rank.
    pub highway_class: i16,
    /// Route number, when signed.
    pub route_ref: Option<String>,
    /// Centerline as WKT `LINESTRING` text.
    pub route_wkt: String,
}

/// A census observation to insert, with its location encoded for the
/// wire.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCensusSite {
    /// Census site number.
    pub site_id: i64,
    /// Census year.
    pub year: i16,
    /// Site location as WKT `POINT` text.
    pub location_wkt: String,
    /// Annual average daily traffic.
    pub aadt: f64,
    /// Percentage of heavy vehicles, when recorded.
    pub pcnt_hv: Option<f64>,
}

/// Builds the parameterized road statement for `query`.
///
/// The viewport corners are normalized (min/max per axis) before the
/// condition is built, so either diagonal corner pair produces the same
/// statement.
///
/// # Errors
///
/// Returns [`DbError::Validation`] if a corner coordinate is not a
/// finite number.
pub fn build_road_statement(query: &RoadQuery) -> Result<(String, Vec<SqlValue>), DbError> {
    let mut builder = StatementBuilder::new(
        "SELECT id, id_type, highway_class, route_ref, ST_AsText(route) AS route_wkt FROM roads",
        ROAD_FILTER_FIELDS,
    );

    if let Some(viewport) = &query.viewport {
        let bbox = viewport.normalize();
        if !bbox.is_finite() {
            return Err(DbError::Validation {
                message: "viewport corners must be finite numbers".to_string(),
            });
        }

        let envelope = [
            SqlValue::Float(bbox.west),
            SqlValue::Float(bbox.south),
            SqlValue::Float(bbox.east),
            SqlValue::Float(bbox.north),
        ];
        let mut args = Vec::with_capacity(8);
        args.extend_from_slice(&envelope);
        args.extend_from_slice(&envelope);

        builder.condition_on("route", VIEWPORT_CLAUSE, args)?;
    }

    builder.order_by("highway_class ASC").limit(query.limit);

    Ok(builder.build())
}

/// Queries roads matching `query`, decoding stored geometry.
///
/// A row whose geometry fails to decode is logged and skipped rather
/// than failing the whole result set.
///
/// # Errors
///
/// Returns [`DbError`] if the query is invalid or the store fails.
pub async fn query_roads(pool: &PgPool, query: &RoadQuery) -> Result<Vec<RoadRow>, DbError> {
    let (sql, args) = build_road_statement(query)?;

    let mut q = sqlx::query(&sql);
    for arg in &args {
        q = bind_value(q, arg);
    }

    let rows = q.fetch_all(pool).await?;

    let mut roads = Vec::with_capacity(rows.len());
    for row in &rows {
        let id: i64 = row.try_get("id")?;
        let id_type: String = row.try_get("id_type")?;
        let highway_rank: i16 = row.try_get("highway_class")?;
        let route_ref: Option<String> = row.try_get("route_ref")?;
        let route_wkt: String = row.try_get("route_wkt")?;

        let geometry = match road_map_spatial::line_string_from_wkt(&route_wkt) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Skipping road {id_type}/{id}: undecodable geometry: {e}");
                continue;
            }
        };

        roads.push(RoadRow {
            id,
            id_type,
            highway_rank,
            route_ref,
            geometry,
        });
    }

    Ok(roads)
}

/// Inserts a batch of roads as one multi-row prepared statement.
///
/// Re-imported roads overwrite the stored row by `(id, id_type)`.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails. The caller's transaction is
/// expected to roll back in that case.
pub async fn insert_road_batch(
    tx: &mut Transaction<'_, Postgres>,
    roads: &[NewRoad],
) -> Result<u64, DbError> {
    if roads.is_empty() {
        return Ok(0);
    }

    let mut builder: sqlx::QueryBuilder<'_, Postgres> =
        sqlx::QueryBuilder::new("INSERT INTO roads (id, id_type, highway_class, route_ref, route) ");

    builder.push_values(roads, |mut b, road| {
        b.push_bind(road.id)
            .push_bind(&road.id_type)
            .push_bind(road.highway_class)
            .push_bind(&road.route_ref)
            .push("ST_GeomFromText(")
            .push_bind_unseparated(&road.route_wkt)
            .push_unseparated(", 4326)");
    });

    builder.push(
        " ON CONFLICT (id, id_type) DO UPDATE SET \
         highway_class = EXCLUDED.highway_class, \
         route_ref = EXCLUDED.route_ref, \
         route = EXCLUDED.route",
    );

    let result = builder.build().execute(&mut **tx).await?;
    Ok(result.rows_affected())
}

/// Inserts a batch of census observations as one multi-row prepared
/// statement.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails. The caller's transaction is
/// expected to roll back in that case.
pub async fn insert_census_batch(
    tx: &mut Transaction<'_, Postgres>,
    sites: &[NewCensusSite],
) -> Result<u64, DbError> {
    if sites.is_empty() {
        return Ok(0);
    }

    let mut builder: sqlx::QueryBuilder<'_, Postgres> = sqlx::QueryBuilder::new(
        "INSERT INTO census_locations (site_id, year, location, aadt, pcnt_hv) ",
    );

    builder.push_values(sites, |mut b, site| {
        b.push_bind(site.site_id)
            .push_bind(site.year)
            .push("ST_GeomFromText(")
            .push_bind_unseparated(&site.location_wkt)
            .push_unseparated(", 4326)")
            .push_bind(site.aadt)
            .push_bind(site.pcnt_hv);
    });

    let result = builder.build().execute(&mut **tx).await?;
    Ok(result.rows_affected())
}

/// Binds one [`SqlValue`] onto a query.
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q SqlValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::SmallInt(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(corner1: [f64; 2], corner2: [f64; 2]) -> RoadQuery {
        RoadQuery {
            viewport: Some(Viewport { corner1, corner2 }),
            limit: DEFAULT_ROAD_LIMIT,
        }
    }

    #[test]
    fn viewport_statement_has_eight_envelope_args_plus_limit() {
        let (sql, args) =
            build_road_statement(&viewport([152.0, -27.0], [153.0, -28.0])).unwrap();

        assert!(sql.contains("ST_Crosses(ST_MakeEnvelope($1, $2, $3, $4, 4326)"));
        assert!(sql.contains("ST_Contains(ST_MakeEnvelope($5, $6, $7, $8, 4326)"));
        assert!(sql.contains("ORDER BY highway_class ASC"));
        assert!(sql.ends_with("LIMIT $9"));
        assert_eq!(args.len(), 9);
        assert_eq!(args[8], SqlValue::Int(DEFAULT_ROAD_LIMIT));
    }

    #[test]
    fn swapped_corners_build_identical_statements() {
        let a = build_road_statement(&viewport([152.0, -27.0], [153.0, -28.0])).unwrap();
        let b = build_road_statement(&viewport([153.0, -28.0], [152.0, -27.0])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn envelope_args_are_normalized_min_max() {
        let (_, args) = build_road_statement(&viewport([153.0, -27.0], [152.0, -28.0])).unwrap();
        assert_eq!(
            &args[..4],
            &[
                SqlValue::Float(152.0),
                SqlValue::Float(-28.0),
                SqlValue::Float(153.0),
                SqlValue::Float(-27.0),
            ]
        );
    }

    #[test]
    fn no_viewport_means_no_where_clause() {
        let (sql, args) = build_road_statement(&RoadQuery::default()).unwrap();
        assert!(!sql.contains("WHERE"));
        assert!(sql.contains("ORDER BY highway_class ASC"));
        assert_eq!(args, vec![SqlValue::Int(DEFAULT_ROAD_LIMIT)]);
    }

    #[test]
    fn non_finite_corner_fails_validation() {
        let err = build_road_statement(&viewport([f64::NAN, -27.0], [153.0, -28.0])).unwrap_err();
        assert!(matches!(err, DbError::Validation { .. }));
    }
}
