//! Loosely typed features as they arrive from providers.
//!
//! Positions stay as raw JSON values so a single malformed coordinate counts
//! against its ring's validity ratio instead of failing the whole payload.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::geo::LonLat;

/// A GeoJSON-like feature before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFeature {
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl RawFeature {
    pub fn new(geometry: RawGeometry, properties: Map<String, Value>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: Some(properties),
        }
    }

    /// Returns the feature's properties, or an empty map.
    pub fn properties(&self) -> Map<String, Value> {
        self.properties.clone().unwrap_or_default()
    }
}

/// Geometry kinds the processor understands.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum RawGeometry {
    Polygon { coordinates: Vec<Vec<Value>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Value>>> },
    Point { coordinates: Value },
    #[serde(other)]
    Unsupported,
}

impl RawGeometry {
    /// Builds a single-ring polygon from typed points.
    pub fn polygon_from_points(points: &[LonLat]) -> Self {
        let ring = points.iter().map(|p| position_to_value(*p)).collect();
        RawGeometry::Polygon {
            coordinates: vec![ring],
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            RawGeometry::Polygon { .. } => "Polygon",
            RawGeometry::MultiPolygon { .. } => "MultiPolygon",
            RawGeometry::Point { .. } => "Point",
            RawGeometry::Unsupported => "Unsupported",
        }
    }
}

/// Reads a `[lon, lat, ...]` position. Range is not checked here.
pub fn position_from_value(value: &Value) -> Option<LonLat> {
    let arr = value.as_array()?;
    let lon = arr.first()?.as_f64()?;
    let lat = arr.get(1)?.as_f64()?;
    Some(LonLat::new(lon, lat))
}

pub fn position_to_value(p: LonLat) -> Value {
    Value::Array(vec![p.lon.into(), p.lat.into()])
}
