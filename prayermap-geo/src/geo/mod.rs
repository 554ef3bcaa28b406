//! Geographic primitives
//!
//! Provides longitude/latitude points, bounding boxes, and great-circle
//! distance used by the hierarchy resolver and the geometry processor.
//!
//! # Coordinate System
//!
//! - Longitude: degrees east (-180 to 180)
//! - Latitude: degrees north (-90 to 90)
//! - Distance: kilometres on a spherical earth

mod types;

pub use types::{BoundingBox, LonLat, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Mean earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Degrees to radians conversion factor.
const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Great-circle distance between two points using the haversine formula.
///
/// # Example
///
/// ```
/// use prayermap_geo::geo::{haversine_km, LonLat};
///
/// let london = LonLat::new(-0.1278, 51.5074);
/// let paris = LonLat::new(2.3522, 48.8566);
/// let d = haversine_km(london, paris);
/// assert!((d - 343.5).abs() < 2.0);
/// ```
pub fn haversine_km(a: LonLat, b: LonLat) -> f64 {
    let lat1 = a.lat * DEG_TO_RAD;
    let lat2 = b.lat * DEG_TO_RAD;
    let d_lat = (b.lat - a.lat) * DEG_TO_RAD;
    let d_lon = (b.lon - a.lon) * DEG_TO_RAD;

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Clamp guards against rounding pushing h past 1.0 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Returns true if the pair is a finite lon/lat inside the valid range.
#[inline]
pub fn is_valid_lon_lat(lon: f64, lat: f64) -> bool {
    lon.is_finite()
        && lat.is_finite()
        && (MIN_LON..=MAX_LON).contains(&lon)
        && (MIN_LAT..=MAX_LAT).contains(&lat)
}
