//! Esri JSON geometry and its GeoJSON translation.
//!
//! ArcGIS services answer `f=json` queries with Esri geometry objects. These
//! carry no explicit type: the member present (`x`/`y`, `points`, `paths` or
//! `rings`) decides the shape. [`translate`] maps them onto GeoJSON.
//!
//! Rings are not classified into exteriors and holes. A single ring becomes a
//! `Polygon`; several rings become a `MultiPolygon` with one polygon per ring.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A coordinate: `[x, y]`, optionally followed by z and m.
pub type Position = Vec<f64>;

/// GeoJSON geometry.
///
/// Serializes as `{"type": "...", "coordinates": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    /// GeoJSON type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Parses a GeoJSON geometry value, returning `None` for null, unsupported
    /// types and malformed coordinates.
    pub fn from_geojson(value: &Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        let geometry: Geometry = serde_json::from_value(value.clone()).ok()?;
        geometry.is_well_formed().then_some(geometry)
    }

    fn is_well_formed(&self) -> bool {
        match self {
            Geometry::Point(p) => valid_position(p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => valid_positions(ps),
            Geometry::MultiLineString(parts) | Geometry::Polygon(parts) => {
                !parts.is_empty() && parts.iter().all(|p| valid_positions(p))
            }
            Geometry::MultiPolygon(polygons) => {
                !polygons.is_empty()
                    && polygons
                        .iter()
                        .all(|rings| !rings.is_empty() && rings.iter().all(|r| valid_positions(r)))
            }
        }
    }
}

/// Esri JSON geometry as returned by ArcGIS `f=json` queries.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EsriGeometry {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub points: Option<Vec<Position>>,
    #[serde(default)]
    pub paths: Option<Vec<Vec<Position>>>,
    #[serde(default)]
    pub rings: Option<Vec<Vec<Position>>>,
}

/// Translates Esri geometry into GeoJSON.
///
/// Returns `None` when no member is present, a member is empty, or a
/// coordinate is not a finite `[x, y, ...]` pair.
pub fn translate(native: &EsriGeometry) -> Option<Geometry> {
    if let (Some(x), Some(y)) = (native.x, native.y) {
        let point = vec![x, y];
        return valid_position(&point).then_some(Geometry::Point(point));
    }

    if let Some(points) = &native.points {
        if !valid_positions(points) {
            return None;
        }
        return Some(match points.as_slice() {
            [single] => Geometry::Point(single.clone()),
            _ => Geometry::MultiPoint(points.clone()),
        });
    }

    if let Some(paths) = &native.paths {
        if paths.is_empty() || !paths.iter().all(|p| valid_positions(p)) {
            return None;
        }
        return Some(match paths.as_slice() {
            [single] => Geometry::LineString(single.clone()),
            _ => Geometry::MultiLineString(paths.clone()),
        });
    }

    if let Some(rings) = &native.rings {
        if rings.is_empty() || !rings.iter().all(|r| valid_positions(r)) {
            return None;
        }
        return Some(match rings.as_slice() {
            [single] => Geometry::Polygon(vec![single.clone()]),
            _ => Geometry::MultiPolygon(rings.iter().map(|ring| vec![ring.clone()]).collect()),
        });
    }

    None
}

/// Translates an untyped Esri geometry value. Null and undecodable values yield `None`.
pub fn translate_value(value: &Value) -> Option<Geometry> {
    if value.is_null() {
        return None;
    }
    let native: EsriGeometry = serde_json::from_value(value.clone()).ok()?;
    translate(&native)
}

fn valid_position(position: &Position) -> bool {
    position.len() >= 2 && position.iter().all(|c| c.is_finite())
}

fn valid_positions(positions: &[Position]) -> bool {
    !positions.is_empty() && positions.iter().all(valid_position)
}
