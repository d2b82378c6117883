#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geometry codec for the road map.
//!
//! The spatial store speaks WKT on the wire (`ST_GeomFromText` on insert,
//! `ST_AsText` on read); the API speaks `GeoJSON`. This crate converts
//! between the in-memory `geo-types` representation and both encodings,
//! so nothing else in the workspace touches geometry text directly.
//!
//! Only the two shapes the schema stores are supported: `POINT` for
//! census sites and `LINESTRING` for road centerlines. Coordinates are
//! `(longitude, latitude)` throughout, matching both WKT axis order and
//! the `GeoJSON` convention.

use geo_types::{Coord, LineString, Point};

/// Errors from geometry encoding or decoding.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// The geometry violates a structural invariant (e.g. a degenerate
    /// line string) and cannot be encoded.
    #[error("Invalid geometry: {message}")]
    InvalidGeometry {
        /// Description of what went wrong.
        message: String,
    },

    /// The WKT text could not be parsed.
    #[error("WKT parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },
}

/// Minimum vertex count for a valid line string.
const MIN_LINE_VERTICES: usize = 2;

/// Encodes a point as `POINT(lon lat)`.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidGeometry`] if either coordinate is not
/// finite.
pub fn point_to_wkt(point: &Point<f64>) -> Result<String, SpatialError> {
    require_finite(point.x(), point.y())?;
    Ok(format!("POINT({} {})", point.x(), point.y()))
}

/// Encodes a line string as `LINESTRING(lon lat, lon lat, ...)`.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidGeometry`] if the line has fewer than
/// two vertices or any non-finite coordinate.
pub fn line_string_to_wkt(line: &LineString<f64>) -> Result<String, SpatialError> {
    if line.0.len() < MIN_LINE_VERTICES {
        return Err(SpatialError::InvalidGeometry {
            message: format!(
                "line string has {} vertices, need at least {MIN_LINE_VERTICES}",
                line.0.len()
            ),
        });
    }

    let mut wkt = String::from("LINESTRING(");
    for (i, coord) in line.0.iter().enumerate() {
        require_finite(coord.x, coord.y)?;
        if i > 0 {
            wkt.push_str(", ");
        }
        wkt.push_str(&format!("{} {}", coord.x, coord.y));
    }
    wkt.push(')');
    Ok(wkt)
}

/// Decodes `LINESTRING(...)` text as produced by `ST_AsText`.
///
/// # Errors
///
/// Returns [`SpatialError::Parse`] if the text is not a well-formed
/// line string, or [`SpatialError::InvalidGeometry`] if it has fewer
/// than two vertices.
pub fn line_string_from_wkt(wkt: &str) -> Result<LineString<f64>, SpatialError> {
    let body = strip_tag(wkt, "LINESTRING")?;

    let mut coords = Vec::new();
    for pair in body.split(',') {
        coords.push(parse_coord(pair)?);
    }

    if coords.len() < MIN_LINE_VERTICES {
        return Err(SpatialError::InvalidGeometry {
            message: format!(
                "line string has {} vertices, need at least {MIN_LINE_VERTICES}",
                coords.len()
            ),
        });
    }

    Ok(LineString::new(coords))
}

/// Decodes `POINT(lon lat)` text as produced by `ST_AsText`.
///
/// # Errors
///
/// Returns [`SpatialError::Parse`] if the text is not a well-formed
/// point.
pub fn point_from_wkt(wkt: &str) -> Result<Point<f64>, SpatialError> {
    let body = strip_tag(wkt, "POINT")?;
    let coord = parse_coord(body)?;
    Ok(Point::from(coord))
}

/// Converts a line string into `GeoJSON` geometry, preserving vertex
/// order and `(longitude, latitude)` axis order.
#[must_use]
pub fn line_string_to_geojson(line: &LineString<f64>) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::from(line))
}

/// Extracts a line string from a `GeoJSON` geometry value.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidGeometry`] for any other geometry
/// type, a position with fewer than two ordinates, or a line with fewer
/// than two vertices.
pub fn line_string_from_geojson(value: &geojson::Value) -> Result<LineString<f64>, SpatialError> {
    let geojson::Value::LineString(positions) = value else {
        return Err(SpatialError::InvalidGeometry {
            message: format!("expected a LineString geometry, got {}", value.type_name()),
        });
    };

    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(positions.len());
    for position in positions {
        if position.len() < 2 {
            return Err(SpatialError::InvalidGeometry {
                message: format!("position has {} ordinates, need at least 2", position.len()),
            });
        }
        coords.push(Coord {
            x: position[0],
            y: position[1],
        });
    }

    if coords.len() < MIN_LINE_VERTICES {
        return Err(SpatialError::InvalidGeometry {
            message: format!(
                "line string has {} vertices, need at least {MIN_LINE_VERTICES}",
                coords.len()
            ),
        });
    }

    Ok(LineString::new(coords))
}

fn require_finite(x: f64, y: f64) -> Result<(), SpatialError> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(SpatialError::InvalidGeometry {
            message: format!("non-finite coordinate: ({x}, {y})"),
        })
    }
}

/// Strips `TAG(` ... `)` from a WKT string and returns the inner body.
fn strip_tag<'a>(wkt: &'a str, tag: &str) -> Result<&'a str, SpatialError> {
    let trimmed = wkt.trim();
    let rest = trimmed
        .strip_prefix(tag)
        .ok_or_else(|| SpatialError::Parse {
            message: format!("expected {tag} geometry, got: {trimmed}"),
        })?
        .trim_start();

    rest.strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .ok_or_else(|| SpatialError::Parse {
            message: format!("unbalanced parentheses in {tag} text"),
        })
}

/// Parses one `lon lat` coordinate pair.
fn parse_coord(pair: &str) -> Result<Coord<f64>, SpatialError> {
    let mut parts = pair.split_whitespace();

    let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(SpatialError::Parse {
            message: format!("expected 'lon lat' pair, got: {pair:?}"),
        });
    };

    let x: f64 = x.parse().map_err(|_| SpatialError::Parse {
        message: format!("invalid longitude: {x:?}"),
    })?;
    let y: f64 = y.parse().map_err(|_| SpatialError::Parse {
        message: format!("invalid latitude: {y:?}"),
    })?;

    require_finite(x, y)?;

    Ok(Coord { x, y })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_line() -> LineString<f64> {
        LineString::new(vec![
            Coord { x: 152.5, y: -27.5 },
            Coord { x: 152.6, y: -27.4 },
            Coord { x: 152.7, y: -27.3 },
        ])
    }

    #[test]
    fn encodes_point_wkt() {
        let wkt = point_to_wkt(&Point::new(153.02, -27.47)).unwrap();
        assert_eq!(wkt, "POINT(153.02 -27.47)");
    }

    #[test]
    fn rejects_non_finite_point() {
        assert!(point_to_wkt(&Point::new(f64::NAN, 0.0)).is_err());
    }

    #[test]
    fn encodes_line_string_wkt() {
        let wkt = line_string_to_wkt(&sample_line()).unwrap();
        assert_eq!(
            wkt,
            "LINESTRING(152.5 -27.5, 152.6 -27.4, 152.7 -27.3)"
        );
    }

    #[test]
    fn rejects_degenerate_line_string() {
        let line = LineString::new(vec![Coord { x: 1.0, y: 2.0 }]);
        assert!(line_string_to_wkt(&line).is_err());
    }

    #[test]
    fn wkt_round_trips_line_string() {
        let line = sample_line();
        let wkt = line_string_to_wkt(&line).unwrap();
        assert_eq!(line_string_from_wkt(&wkt).unwrap(), line);
    }

    #[test]
    fn parses_wkt_with_loose_whitespace() {
        let line = line_string_from_wkt("  LINESTRING (1 2,3 4)  ").unwrap();
        assert_eq!(
            line,
            LineString::new(vec![Coord { x: 1.0, y: 2.0 }, Coord { x: 3.0, y: 4.0 }])
        );
    }

    #[test]
    fn parses_point_wkt() {
        let point = point_from_wkt("POINT(153.02 -27.47)").unwrap();
        assert_eq!(point, Point::new(153.02, -27.47));
    }

    #[test]
    fn rejects_wrong_tag() {
        assert!(line_string_from_wkt("POLYGON((0 0, 1 1, 0 1, 0 0))").is_err());
        assert!(point_from_wkt("LINESTRING(0 0, 1 1)").is_err());
    }

    #[test]
    fn rejects_malformed_coordinates() {
        assert!(line_string_from_wkt("LINESTRING(1 2, x y)").is_err());
        assert!(line_string_from_wkt("LINESTRING(1 2 3, 4 5 6)").is_err());
        assert!(line_string_from_wkt("LINESTRING(1 2)").is_err());
    }

    #[test]
    fn geojson_conversion_preserves_axis_order() {
        let geometry = line_string_to_geojson(&sample_line());
        let geojson::Value::LineString(positions) = geometry.value else {
            panic!("expected LineString");
        };
        assert_eq!(positions[0], vec![152.5, -27.5]);
    }

    #[test]
    fn geojson_line_string_round_trips() {
        let line = sample_line();
        let geometry = line_string_to_geojson(&line);
        assert_eq!(line_string_from_geojson(&geometry.value).unwrap(), line);
    }

    #[test]
    fn geojson_rejects_point_geometry() {
        let value = geojson::Value::Point(vec![1.0, 2.0]);
        assert!(line_string_from_geojson(&value).is_err());
    }

    #[test]
    fn geojson_rejects_short_position_instead_of_dropping_it() {
        let value = geojson::Value::LineString(vec![
            vec![1.0, 2.0],
            vec![3.0],
            vec![4.0, 5.0],
        ]);
        assert!(line_string_from_geojson(&value).is_err());
    }
}
