//! Boundary data model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::geo::{BoundingBox, LonLat};

/// Administrative tier a boundary polygon represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryType {
    Continent,
    Country,
    State,
    City,
    Neighborhood,
}

impl BoundaryType {
    /// All granularities, coarsest first.
    pub const ALL: [BoundaryType; 5] = [
        BoundaryType::Continent,
        BoundaryType::Country,
        BoundaryType::State,
        BoundaryType::City,
        BoundaryType::Neighborhood,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryType::Continent => "continent",
            BoundaryType::Country => "country",
            BoundaryType::State => "state",
            BoundaryType::City => "city",
            BoundaryType::Neighborhood => "neighborhood",
        }
    }

    /// The next coarser granularity, or `None` for continents.
    pub fn coarser(&self) -> Option<BoundaryType> {
        match self {
            BoundaryType::Continent => None,
            BoundaryType::Country => Some(BoundaryType::Continent),
            BoundaryType::State => Some(BoundaryType::Country),
            BoundaryType::City => Some(BoundaryType::State),
            BoundaryType::Neighborhood => Some(BoundaryType::City),
        }
    }
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continent" => Ok(BoundaryType::Continent),
            "country" => Ok(BoundaryType::Country),
            "state" => Ok(BoundaryType::State),
            "city" => Ok(BoundaryType::City),
            "neighborhood" | "neighbourhood" => Ok(BoundaryType::Neighborhood),
            other => Err(format!("unknown boundary type '{}'", other)),
        }
    }
}

/// A closed polygon ring: at least four points, first equal to last.
pub type Ring = Vec<LonLat>;

/// A validated boundary ready for rendering.
///
/// Only the geometry processor constructs these, so every ring is closed,
/// has at least the configured minimum number of points, and lies within
/// the valid lon/lat range. Values are immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedBoundary {
    name: String,
    #[serde(rename = "type")]
    kind: BoundaryType,
    coordinates: Vec<Ring>,
    properties: Map<String, Value>,
}

impl ProcessedBoundary {
    pub(crate) fn new(
        name: String,
        kind: BoundaryType,
        coordinates: Vec<Ring>,
        properties: Map<String, Value>,
    ) -> Self {
        Self {
            name,
            kind,
            coordinates,
            properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> BoundaryType {
        self.kind
    }

    pub fn coordinates(&self) -> &[Ring] {
        &self.coordinates
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Looks up a string property, trying each key in order.
    pub fn property_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|k| self.properties.get(*k).and_then(Value::as_str))
    }

    /// Total number of points across all rings.
    pub fn point_count(&self) -> usize {
        self.coordinates.iter().map(Vec::len).sum()
    }

    /// Bounding box of the outer ring.
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.coordinates
            .first()
            .and_then(|ring| BoundingBox::enclosing(ring.iter().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_type_parse_and_display() {
        for kind in BoundaryType::ALL {
            assert_eq!(kind.to_string().parse::<BoundaryType>().unwrap(), kind);
        }
        assert_eq!(
            "Neighbourhood".parse::<BoundaryType>().unwrap(),
            BoundaryType::Neighborhood
        );
        assert!("galaxy".parse::<BoundaryType>().is_err());
    }

    #[test]
    fn test_boundary_type_coarser_chain() {
        assert_eq!(BoundaryType::Neighborhood.coarser(), Some(BoundaryType::City));
        assert_eq!(BoundaryType::Country.coarser(), Some(BoundaryType::Continent));
        assert_eq!(BoundaryType::Continent.coarser(), None);
    }

    #[test]
    fn test_boundary_serializes_type_field() {
        let ring = vec![
            LonLat::new(0.0, 0.0),
            LonLat::new(1.0, 0.0),
            LonLat::new(1.0, 1.0),
            LonLat::new(0.0, 0.0),
        ];
        let boundary =
            ProcessedBoundary::new("Test".into(), BoundaryType::State, vec![ring], Map::new());
        let json = serde_json::to_value(&boundary).unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["name"], "Test");
        assert_eq!(boundary.point_count(), 4);
        assert_eq!(boundary.bbox(), Some(BoundingBox::new(0.0, 0.0, 1.0, 1.0)));
    }
}
