#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Shared domain types for the road map.
//!
//! These types represent the shapes of data as stored in and retrieved
//! from the `PostGIS` database, plus the viewport geometry used to filter
//! spatial queries. They are distinct from the ingestion record types in
//! `road_map_ingest` and the `GeoJSON` response built by
//! `road_map_server`.

use geo_types::{LineString, Point};
use serde::{Deserialize, Serialize};

/// OpenStreetMap highway classification, ordered by importance.
///
/// Stored in the database as its integer rank (`motorway` = 0). Lower
/// ranks sort first in query results so the most significant roads are
/// kept when the result cap truncates a large viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighwayClass {
    /// Restricted-access major divided highway.
    Motorway = 0,
    /// Most important non-motorway roads.
    Trunk = 1,
    /// Primary roads linking large towns.
    Primary = 2,
    /// Secondary roads linking towns.
    Secondary = 3,
    /// Tertiary roads linking smaller towns and villages.
    Tertiary = 4,
}

impl HighwayClass {
    /// All classifications, in rank order.
    pub const ALL: [Self; 5] = [
        Self::Motorway,
        Self::Trunk,
        Self::Primary,
        Self::Secondary,
        Self::Tertiary,
    ];

    /// The integer rank stored in the `highway_class` column.
    #[must_use]
    pub const fn rank(self) -> i16 {
        self as i16
    }

    /// The OSM tag value for this classification.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Motorway => "motorway",
            Self::Trunk => "trunk",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
        }
    }

    /// Parses an OSM `highway` tag value, case-insensitively.
    ///
    /// Returns `None` for tag values outside the imported classes
    /// (`residential`, `service`, ...), which are out of scope rather
    /// than malformed.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "motorway" => Some(Self::Motorway),
            "trunk" => Some(Self::Trunk),
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            "tertiary" => Some(Self::Tertiary),
            _ => None,
        }
    }
}

impl TryFrom<i16> for HighwayClass {
    type Error = UnknownHighwayRank;

    fn try_from(rank: i16) -> Result<Self, Self::Error> {
        match rank {
            0 => Ok(Self::Motorway),
            1 => Ok(Self::Trunk),
            2 => Ok(Self::Primary),
            3 => Ok(Self::Secondary),
            4 => Ok(Self::Tertiary),
            _ => Err(UnknownHighwayRank(rank)),
        }
    }
}

/// A stored highway rank with no corresponding [`HighwayClass`].
///
/// Only trusted ingestion writes the `highway_class` column, so hitting
/// this means the store contains data this build does not understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownHighwayRank(pub i16);

impl std::fmt::Display for UnknownHighwayRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown highway class rank: {}", self.0)
    }
}

impl std::error::Error for UnknownHighwayRank {}

/// A road row as stored in and retrieved from the `roads` table.
///
/// Identity is the compound OSM id `(id, id_type)`. `highway_rank` is
/// kept as the raw stored integer; mapping it back to a [`HighwayClass`]
/// is the serializer's job so an unmapped rank can be skipped per row
/// instead of failing the whole result set.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadRow {
    /// Numeric OSM id.
    pub id: i64,
    /// OSM id category (`way`, `node`, `relation`).
    pub id_type: String,
    /// Stored classification rank.
    pub highway_rank: i16,
    /// Route number (the OSM `ref` tag), when signed.
    pub route_ref: Option<String>,
    /// Road centerline, `(longitude, latitude)` vertex order.
    pub geometry: LineString<f64>,
}

/// A traffic census observation as stored in `census_locations`.
#[derive(Debug, Clone, PartialEq)]
pub struct CensusRow {
    /// Census site number from the source data.
    pub site_id: i64,
    /// Census year.
    pub year: i16,
    /// Site location.
    pub location: Point<f64>,
    /// Annual average daily traffic.
    pub aadt: f64,
    /// Percentage of heavy vehicles, `0..=100`, when recorded.
    pub pcnt_hv: Option<f64>,
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Whether every boundary is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.west.is_finite()
            && self.south.is_finite()
            && self.east.is_finite()
            && self.north.is_finite()
    }
}

/// A viewport rectangle given as two `(longitude, latitude)` corners.
///
/// The request format does not guarantee which diagonal the corners
/// describe, so consumers must go through [`Viewport::normalize`] rather
/// than reading the corners directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Viewport {
    /// One corner of the rectangle.
    pub corner1: [f64; 2],
    /// The diagonally opposite corner.
    pub corner2: [f64; 2],
}

impl Viewport {
    /// Normalizes the corner pair into a [`BoundingBox`] by taking the
    /// min/max per axis, so swapped or mirrored corners describe the
    /// same rectangle.
    #[must_use]
    pub fn normalize(&self) -> BoundingBox {
        BoundingBox {
            west: self.corner1[0].min(self.corner2[0]),
            south: self.corner1[1].min(self.corner2[1]),
            east: self.corner1[0].max(self.corner2[0]),
            north: self.corner1[1].max(self.corner2[1]),
        }
    }
}
