use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::bounds::LatLngBounds;
use crate::core::geo::LatLng;

/// A GeoJSON position, `[lng, lat]` or `[lng, lat, alt]`.
///
/// Kept as a plain vector so that short or over-long positions still
/// deserialize; bounds computation skips anything shorter than two.
pub type Position = Vec<f64>;

/// Property bag of a feature or collection.
pub type Properties = Map<String, Value>;

/// GeoJSON geometry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Position,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
}

impl Geometry {
    /// Smallest rectangle enclosing the geometry.
    pub fn bounds(&self) -> LatLngBounds {
        match self {
            Geometry::Point { coordinates } => add_position(LatLngBounds::empty(), coordinates),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                line_bounds(coordinates)
            }
            Geometry::MultiLineString { coordinates } => coordinates
                .iter()
                .fold(LatLngBounds::empty(), |r, line| r.union(&line_bounds(line))),
            Geometry::Polygon { coordinates } => polygon_bounds(coordinates),
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .fold(LatLngBounds::empty(), |r, polygon| {
                    r.union(&polygon_bounds(polygon))
                }),
            Geometry::GeometryCollection { geometries } => geometries
                .iter()
                .fold(LatLngBounds::empty(), |r, geometry| r.union(&geometry.bounds())),
        }
    }
}

/// Bounds of an optional geometry; absent geometries have empty bounds.
pub fn geometry_bounds(geometry: Option<&Geometry>) -> LatLngBounds {
    geometry.map_or_else(LatLngBounds::empty, Geometry::bounds)
}

fn add_position(bounds: LatLngBounds, position: &[f64]) -> LatLngBounds {
    match LatLng::from_position(position) {
        Some(point) => bounds.add_point(point),
        None => bounds,
    }
}

fn line_bounds(line: &[Position]) -> LatLngBounds {
    line.iter()
        .fold(LatLngBounds::empty(), |r, position| add_position(r, position))
}

fn polygon_bounds(rings: &[Vec<Position>]) -> LatLngBounds {
    rings
        .iter()
        .fold(LatLngBounds::empty(), |r, ring| r.union(&line_bounds(ring)))
        .expand_for_subregions()
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Properties>,
    #[serde(flatten)]
    pub foreign_members: Properties,
}

fn feature_type() -> String {
    "Feature".to_string()
}

impl Feature {
    pub fn new(geometry: Option<Geometry>, properties: Option<Properties>) -> Self {
        Self {
            kind: feature_type(),
            id: None,
            geometry,
            properties,
            foreign_members: Properties::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Identifier used for lookups: the feature's own `id`, else a property
    /// named `id`, else a property named `.id`. First non-empty value wins.
    pub fn derived_id(&self) -> Option<String> {
        let from_properties = |key: &str| {
            self.properties
                .as_ref()
                .and_then(|props| props.get(key))
                .and_then(id_string)
        };
        self.id
            .as_ref()
            .and_then(id_string)
            .or_else(|| from_properties("id"))
            .or_else(|| from_properties(".id"))
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(key)
    }

    pub fn bounds(&self) -> LatLngBounds {
        geometry_bounds(self.geometry.as_ref())
    }
}

/// Strings and integral numbers are usable identifiers.
fn id_string(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

/// Root FeatureCollection document. Top-level `properties` is a foreign
/// member that some producers use for collection-wide metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
}

impl FeatureCollection {
    /// Collection timestamps from `<name>_timestamp` properties holding
    /// RFC 3339 strings. Malformed entries are ignored.
    pub fn timestamps(&self) -> Vec<(String, DateTime<Utc>)> {
        let Some(properties) = self.properties.as_ref() else {
            return Vec::new();
        };
        properties
            .iter()
            .filter_map(|(key, value)| {
                let name = key.strip_suffix("_timestamp")?;
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), timestamp_value(value)?))
            })
            .collect()
    }
}

/// String-typed property, or `None` when absent or of another type.
pub fn string_property<'a>(properties: &'a Properties, key: &str) -> Option<&'a str> {
    properties.get(key).and_then(Value::as_str)
}

/// RFC 3339 timestamp property, or `None` when absent or unparsable.
pub fn timestamp_property(properties: &Properties, key: &str) -> Option<DateTime<Utc>> {
    properties.get(key).and_then(timestamp_value)
}

fn timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
