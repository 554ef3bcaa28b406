//! Geometry validation and normalisation.
//!
//! Turns raw provider features into [`ProcessedBoundary`] values. Rejection is
//! always feature-local: a bad feature is dropped and logged, the rest of the
//! batch continues.
//!
//! # Acceptance rules
//!
//! | Geometry     | Rule                                                             |
//! |--------------|------------------------------------------------------------------|
//! | Polygon      | outer ring ≥ `min_ring_points` and ≥ `min_valid_ratio` valid     |
//! | MultiPolygon | every ring validated, largest valid ring kept                     |
//! | Point        | synthetic square footprint sized by population                    |
//! | anything else| rejected                                                          |

use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, warn};

use super::raw::{position_from_value, RawFeature, RawGeometry};
use super::types::{BoundaryType, ProcessedBoundary, Ring};
use crate::geo::LonLat;

/// Default minimum points per ring (a closed triangle).
pub const DEFAULT_MIN_RING_POINTS: usize = 4;

/// Default fraction of a ring's points that must be valid coordinates.
pub const DEFAULT_MIN_VALID_RATIO: f64 = 0.8;

/// Half-width in degrees for point footprints without a population.
pub const DEFAULT_FOOTPRINT_HALF_WIDTH: f64 = 0.05;

/// Property keys consulted for a feature's display name, in order.
pub const NAME_KEYS: &[&str] = &["name", "NAME", "name:en", "NAME_EN", "ADMIN", "admin"];

/// One step of the population → footprint size table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootprintStep {
    pub min_population: u64,
    pub half_width_deg: f64,
}

/// Tunable thresholds for the geometry processor.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryConfig {
    pub min_ring_points: usize,
    pub min_valid_ratio: f64,
    /// Names dropped before any processing (compared case-insensitively).
    pub excluded_names: Vec<String>,
    /// Population steps, any order; the largest matching threshold wins.
    pub footprint_steps: Vec<FootprintStep>,
    pub default_half_width: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            min_ring_points: DEFAULT_MIN_RING_POINTS,
            min_valid_ratio: DEFAULT_MIN_VALID_RATIO,
            // Polar landmass whose geometry spans the antimeridian degenerately
            excluded_names: vec!["antarctica".to_string()],
            footprint_steps: vec![
                FootprintStep {
                    min_population: 5_000_000,
                    half_width_deg: 0.5,
                },
                FootprintStep {
                    min_population: 1_000_000,
                    half_width_deg: 0.3,
                },
                FootprintStep {
                    min_population: 500_000,
                    half_width_deg: 0.2,
                },
                FootprintStep {
                    min_population: 100_000,
                    half_width_deg: 0.1,
                },
            ],
            default_half_width: DEFAULT_FOOTPRINT_HALF_WIDTH,
        }
    }
}

/// Why a ring failed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RingRejection {
    TooFewPoints { points: usize, min: usize },
    TooManyInvalid { valid: usize, total: usize },
    Degenerate { points: usize },
}

impl fmt::Display for RingRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingRejection::TooFewPoints { points, min } => {
                write!(f, "ring has {} points (min {})", points, min)
            }
            RingRejection::TooManyInvalid { valid, total } => {
                write!(f, "only {}/{} ring points are valid", valid, total)
            }
            RingRejection::Degenerate { points } => {
                write!(f, "ring collapses to {} valid points", points)
            }
        }
    }
}

/// Result of processing a batch of features.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub boundaries: Vec<ProcessedBoundary>,
    pub dropped: usize,
}

/// Normalises raw geometry into validated boundaries.
#[derive(Debug, Clone, Default)]
pub struct GeometryProcessor {
    config: GeometryConfig,
}

impl GeometryProcessor {
    pub fn new(config: GeometryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeometryConfig {
        &self.config
    }

    /// Processes one feature, returning `None` if it is rejected.
    pub fn process(&self, feature: &RawFeature, target: BoundaryType) -> Option<ProcessedBoundary> {
        let properties = feature.properties();
        let name = feature_name(&properties);

        if self.is_excluded(&name) {
            debug!(name = %name, "Dropping excluded feature");
            return None;
        }

        let Some(geometry) = feature.geometry.as_ref() else {
            debug!(name = %name, "Dropping feature without geometry");
            return None;
        };

        let rings = match geometry {
            RawGeometry::Polygon { coordinates } => self.process_polygon(&name, coordinates)?,
            RawGeometry::MultiPolygon { coordinates } => {
                self.process_multi_polygon(&name, coordinates)?
            }
            RawGeometry::Point { coordinates } => {
                let center = position_from_value(coordinates).filter(LonLat::is_valid);
                let Some(center) = center else {
                    debug!(name = %name, "Dropping point feature with invalid position");
                    return None;
                };
                vec![self.point_footprint(center, population(&properties))]
            }
            RawGeometry::Unsupported => {
                debug!(name = %name, "Dropping unsupported geometry");
                return None;
            }
        };

        let mut properties = properties;
        if matches!(geometry, RawGeometry::Point { .. }) {
            properties.insert("synthetic".to_string(), Value::Bool(true));
        }

        Some(ProcessedBoundary::new(name, target, rings, properties))
    }

    /// Processes every feature, dropping the ones that fail.
    pub fn process_batch(&self, features: &[RawFeature], target: BoundaryType) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for feature in features {
            match self.process(feature, target) {
                Some(boundary) => outcome.boundaries.push(boundary),
                None => outcome.dropped += 1,
            }
        }

        if outcome.dropped > 0 {
            warn!(
                kept = outcome.boundaries.len(),
                dropped = outcome.dropped,
                granularity = %target,
                "Dropped malformed features"
            );
        }
        outcome
    }

    /// Validates a ring and returns it cleaned and closed.
    ///
    /// Invalid points are removed once the ring has passed the ratio check.
    pub fn validate_ring(&self, ring: &[Value]) -> Result<Ring, RingRejection> {
        let total = ring.len();
        if total < self.config.min_ring_points {
            return Err(RingRejection::TooFewPoints {
                points: total,
                min: self.config.min_ring_points,
            });
        }

        let mut points: Ring = ring
            .iter()
            .filter_map(position_from_value)
            .filter(LonLat::is_valid)
            .collect();

        let valid = points.len();
        if (valid as f64) / (total as f64) < self.config.min_valid_ratio {
            return Err(RingRejection::TooManyInvalid { valid, total });
        }

        if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
            if first != last {
                points.push(first);
            }
        }

        if points.len() < self.config.min_ring_points {
            return Err(RingRejection::Degenerate {
                points: points.len(),
            });
        }

        Ok(points)
    }

    fn process_polygon(&self, name: &str, rings: &[Vec<Value>]) -> Option<Vec<Ring>> {
        let Some((outer, holes)) = rings.split_first() else {
            debug!(name = %name, "Dropping polygon without rings");
            return None;
        };

        let outer = match self.validate_ring(outer) {
            Ok(ring) => ring,
            Err(reason) => {
                debug!(name = %name, %reason, "Dropping polygon");
                return None;
            }
        };

        let mut result = vec![outer];
        for hole in holes {
            match self.validate_ring(hole) {
                Ok(ring) => result.push(ring),
                Err(reason) => debug!(name = %name, %reason, "Dropping inner ring"),
            }
        }
        Some(result)
    }

    fn process_multi_polygon(&self, name: &str, polygons: &[Vec<Vec<Value>>]) -> Option<Vec<Ring>> {
        let mut largest: Option<Ring> = None;
        let mut rejected = 0usize;

        for ring in polygons.iter().flatten() {
            match self.validate_ring(ring) {
                Ok(ring) => {
                    // Strictly greater keeps the first ring on ties
                    if largest.as_ref().map_or(true, |l| ring.len() > l.len()) {
                        largest = Some(ring);
                    }
                }
                Err(_) => rejected += 1,
            }
        }

        match largest {
            Some(ring) => {
                if rejected > 0 {
                    debug!(name = %name, rejected, "Ignored invalid multipolygon rings");
                }
                Some(vec![ring])
            }
            None => {
                debug!(name = %name, "Dropping multipolygon with no valid ring");
                None
            }
        }
    }

    /// Synthesises a closed square around `center`.
    pub fn point_footprint(&self, center: LonLat, population: Option<u64>) -> Ring {
        let half = self.half_width_for(population);
        let corners = [
            LonLat::new(center.lon - half, center.lat - half),
            LonLat::new(center.lon + half, center.lat - half),
            LonLat::new(center.lon + half, center.lat + half),
            LonLat::new(center.lon - half, center.lat + half),
            LonLat::new(center.lon - half, center.lat - half),
        ];
        corners.iter().map(|p| p.clamped()).collect()
    }

    fn half_width_for(&self, population: Option<u64>) -> f64 {
        let Some(population) = population else {
            return self.config.default_half_width;
        };
        self.config
            .footprint_steps
            .iter()
            .filter(|step| population >= step.min_population)
            .max_by_key(|step| step.min_population)
            .map_or(self.config.default_half_width, |step| step.half_width_deg)
    }

    fn is_excluded(&self, name: &str) -> bool {
        let name = name.trim();
        self.config
            .excluded_names
            .iter()
            .any(|excluded| excluded.trim().eq_ignore_ascii_case(name))
    }
}

/// Picks a display name from the usual property keys.
pub fn feature_name(properties: &Map<String, Value>) -> String {
    NAME_KEYS
        .iter()
        .find_map(|k| properties.get(*k).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| "Unnamed".to_string())
}

/// Reads a `population` property given as a number or numeric string.
fn population(properties: &Map<String, Value>) -> Option<u64> {
    match properties.get("population")? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.replace([',', ' '], "").parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn processor() -> GeometryProcessor {
        GeometryProcessor::default()
    }

    fn polygon(name: &str, ring: Value) -> RawFeature {
        serde_json::from_value(json!({
            "properties": {"name": name},
            "geometry": {"type": "Polygon", "coordinates": [ring]}
        }))
        .unwrap()
    }

    #[test]
    fn test_two_point_ring_rejected() {
        let feature = polygon("Line", json!([[0, 0], [1, 1]]));
        assert!(processor().process(&feature, BoundaryType::State).is_none());
    }

    #[test]
    fn test_ring_with_83_percent_valid_accepted() {
        let feature = polygon(
            "Mostly valid",
            json!([[0, 0], [1, 0], [1, 1], [0, 1], [0, 0], [200, 0]]),
        );
        let boundary = processor().process(&feature, BoundaryType::State).unwrap();
        let ring = &boundary.coordinates()[0];
        assert_eq!(ring.len(), 5);
        assert!(ring.iter().all(LonLat::is_valid));
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_ring_with_60_percent_valid_rejected() {
        let feature = polygon(
            "Mostly invalid",
            json!([[0, 0], [1, 0], [1, 1], [500, 0], [0, -95]]),
        );
        assert!(processor().process(&feature, BoundaryType::State).is_none());
    }

    #[test]
    fn test_ring_at_exact_threshold_accepted() {
        // 4 of 5 valid = 80%
        let feature = polygon("Edge", json!([[0, 0], [1, 0], [1, 1], [0, 1], ["x", 0]]));
        let boundary = processor().process(&feature, BoundaryType::City).unwrap();
        // Open ring gets closed
        assert_eq!(boundary.coordinates()[0].len(), 5);
    }

    #[test]
    fn test_malformed_positions_count_as_invalid() {
        let p = processor();
        let ring = vec![json!([0, 0]), json!(null), json!("bad"), json!([1, 1]), json!([0, 0])];
        assert_eq!(
            p.validate_ring(&ring),
            Err(RingRejection::TooManyInvalid { valid: 3, total: 5 })
        );
    }

    #[test]
    fn test_degenerate_ring_after_cleaning_rejected() {
        let config = GeometryConfig {
            min_valid_ratio: 0.5,
            ..Default::default()
        };
        let p = GeometryProcessor::new(config);
        // 3 valid points, already closed: 3 < 4 after cleaning
        let ring = vec![json!([0, 0]), json!([1, 1]), json!([0, 0]), json!([999, 0])];
        assert_eq!(
            p.validate_ring(&ring),
            Err(RingRejection::Degenerate { points: 3 })
        );
    }

    #[test]
    fn test_invalid_hole_dropped_outer_kept() {
        let feature: RawFeature = serde_json::from_value(json!({
            "properties": {"name": "Donut"},
            "geometry": {"type": "Polygon", "coordinates": [
                [[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]],
                [[1, 1], [2, 1]]
            ]}
        }))
        .unwrap();
        let boundary = processor().process(&feature, BoundaryType::Country).unwrap();
        assert_eq!(boundary.coordinates().len(), 1);
    }

    #[test]
    fn test_multipolygon_keeps_largest_valid_ring() {
        let feature: RawFeature = serde_json::from_value(json!({
            "properties": {"NAME": "Islands"},
            "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[0, 0], [1, 0], [1, 1], [0, 0]]],
                [[[10, 10], [12, 10], [12, 12], [11, 13], [10, 12], [10, 10]]],
                [[[300, 0], [300, 1], [301, 1], [301, 0], [20, 20], [300, 0], [300, 0]]]
            ]}
        }))
        .unwrap();
        let boundary = processor().process(&feature, BoundaryType::Country).unwrap();
        assert_eq!(boundary.name(), "Islands");
        assert_eq!(boundary.coordinates().len(), 1);
        assert_eq!(boundary.coordinates()[0].len(), 6);
        assert_eq!(boundary.coordinates()[0][0], LonLat::new(10.0, 10.0));
    }

    #[test]
    fn test_multipolygon_without_valid_ring_rejected() {
        let feature: RawFeature = serde_json::from_value(json!({
            "geometry": {"type": "MultiPolygon", "coordinates": [[[[0, 0], [1, 1]]]]}
        }))
        .unwrap();
        assert!(processor().process(&feature, BoundaryType::Country).is_none());
    }

    #[test]
    fn test_point_footprint_scales_with_population() {
        let p = processor();
        let center = LonLat::new(10.0, 50.0);
        let width = |pop: Option<u64>| {
            let ring = p.point_footprint(center, pop);
            ring[1].lon - ring[0].lon
        };
        assert!((width(None) - 0.1).abs() < 1e-9);
        assert!((width(Some(50_000)) - 0.1).abs() < 1e-9);
        assert!((width(Some(150_000)) - 0.2).abs() < 1e-9);
        assert!((width(Some(750_000)) - 0.4).abs() < 1e-9);
        assert!((width(Some(2_000_000)) - 0.6).abs() < 1e-9);
        assert!((width(Some(9_000_000)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_feature_becomes_closed_box() {
        let feature: RawFeature = serde_json::from_value(json!({
            "properties": {"name": "Lagos", "population": "15,388,000"},
            "geometry": {"type": "Point", "coordinates": [3.3792, 6.5244]}
        }))
        .unwrap();
        let boundary = processor().process(&feature, BoundaryType::City).unwrap();
        let ring = &boundary.coordinates()[0];
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(boundary.properties()["synthetic"], true);
    }

    #[test]
    fn test_point_footprint_clamped_near_pole() {
        let ring = processor().point_footprint(LonLat::new(179.99, 89.99), Some(10_000_000));
        assert!(ring.iter().all(LonLat::is_valid));
    }

    #[test]
    fn test_excluded_name_dropped_case_insensitive() {
        let feature = polygon("ANTARCTICA", json!([[0, 0], [1, 0], [1, 1], [0, 0]]));
        assert!(processor().process(&feature, BoundaryType::Continent).is_none());
    }

    #[test]
    fn test_unsupported_geometry_rejected() {
        let feature: RawFeature = serde_json::from_value(json!({
            "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}
        }))
        .unwrap();
        assert!(processor().process(&feature, BoundaryType::City).is_none());
    }

    #[test]
    fn test_batch_drops_bad_features_only() {
        let good = polygon("Good", json!([[0, 0], [1, 0], [1, 1], [0, 0]]));
        let bad = polygon("Bad", json!([[0, 0]]));
        let outcome = processor().process_batch(&[good, bad], BoundaryType::State);
        assert_eq!(outcome.boundaries.len(), 1);
        assert_eq!(outcome.dropped, 1);
        assert_eq!(outcome.boundaries[0].name(), "Good");
    }

    #[test]
    fn test_feature_name_fallback() {
        assert_eq!(feature_name(&Map::new()), "Unnamed");
    }
}
