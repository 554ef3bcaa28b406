//! Point and bounding box types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::is_valid_lon_lat;

/// Minimum longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum longitude in degrees.
pub const MAX_LON: f64 = 180.0;
/// Minimum latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// A longitude/latitude pair in degrees.
///
/// Order follows GeoJSON: longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Returns true if both components are finite and in range.
    pub fn is_valid(&self) -> bool {
        super::is_valid_lon_lat(self.lon, self.lat)
    }

    /// Clamps both components into the valid range.
    pub fn clamped(self) -> Self {
        Self {
            lon: self.lon.clamp(MIN_LON, MAX_LON),
            lat: self.lat.clamp(MIN_LAT, MAX_LAT),
        }
    }
}

impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lon, self.lat)
    }
}

/// Axis-aligned bounding box in degrees.
///
/// Field order mirrors the Overpass `(south, west, north, east)` convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Returns true if the point lies inside the box (edges inclusive).
    pub fn contains(&self, p: LonLat) -> bool {
        (self.south..=self.north).contains(&p.lat) && (self.west..=self.east).contains(&p.lon)
    }

    /// Returns true if the two boxes overlap (touching edges count).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.south <= other.north
            && other.south <= self.north
            && self.west <= other.east
            && other.west <= self.east
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LonLat>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first.lat, first.lon, first.lat, first.lon);
        for p in iter {
            bbox.south = bbox.south.min(p.lat);
            bbox.north = bbox.north.max(p.lat);
            bbox.west = bbox.west.min(p.lon);
            bbox.east = bbox.east.max(p.lon);
        }
        Some(bbox)
    }

    /// Textual form used in Overpass queries, rounded to 4 decimals.
    pub fn to_query_string(&self) -> String {
        format!(
            "{:.4},{:.4},{:.4},{:.4}",
            self.south, self.west, self.north, self.east
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl FromStr for BoundingBox {
    type Err = String;

    /// Parses `south,west,north,east`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid bounding box '{}': {}", s, e))?;

        match parts.as_slice() {
            [south, west, north, east]
                if !is_valid_lon_lat(*west, *south) || !is_valid_lon_lat(*east, *north) =>
            {
                Err(format!(
                    "invalid bounding box '{}': outside valid coordinates",
                    s
                ))
            }
            [south, west, north, east] if south <= north && west <= east => {
                Ok(Self::new(*south, *west, *north, *east))
            }
            [_, _, _, _] => Err(format!(
                "invalid bounding box '{}': south/west must not exceed north/east",
                s
            )),
            _ => Err(format!(
                "invalid bounding box '{}': expected south,west,north,east",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_contains_edges() {
        let bbox = BoundingBox::new(10.0, 20.0, 11.0, 21.0);
        assert!(bbox.contains(LonLat::new(20.0, 10.0)));
        assert!(bbox.contains(LonLat::new(21.0, 11.0)));
        assert!(!bbox.contains(LonLat::new(21.1, 10.5)));
    }

    #[test]
    fn test_bbox_intersects() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_bbox_enclosing() {
        let bbox = BoundingBox::enclosing(vec![
            LonLat::new(1.0, 2.0),
            LonLat::new(-3.0, 5.0),
            LonLat::new(4.0, -1.0),
        ])
        .unwrap();
        assert_eq!(bbox, BoundingBox::new(-1.0, -3.0, 5.0, 4.0));
        assert!(BoundingBox::enclosing(Vec::new()).is_none());
    }

    #[test]
    fn test_bbox_parse() {
        let bbox: BoundingBox = "47.2, 5.8, 55.1, 15.0".parse().unwrap();
        assert_eq!(bbox, BoundingBox::new(47.2, 5.8, 55.1, 15.0));
        assert!("1,2,3".parse::<BoundingBox>().is_err());
        assert!("5,0,1,1".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());

        let err = "-91,0,1,1".parse::<BoundingBox>().unwrap_err();
        assert!(err.contains("outside valid coordinates"));
        assert!("0,0,1,181".parse::<BoundingBox>().is_err());
        assert!("0,0,NaN,1".parse::<BoundingBox>().is_err());
    }

    #[test]
    fn test_lon_lat_clamped() {
        let p = LonLat::new(190.0, -95.0).clamped();
        assert_eq!(p, LonLat::new(180.0, -90.0));
    }
}
