//! Boundary model and geometry processing
//!
//! Raw provider features ([`RawFeature`]) are normalised by the
//! [`GeometryProcessor`] into immutable [`ProcessedBoundary`] values that the
//! map layer can render without further checks.

mod geometry;
mod raw;
mod types;

pub use geometry::{
    feature_name, BatchOutcome, FootprintStep, GeometryConfig, GeometryProcessor, RingRejection,
    DEFAULT_FOOTPRINT_HALF_WIDTH, DEFAULT_MIN_RING_POINTS, DEFAULT_MIN_VALID_RATIO, NAME_KEYS,
};
pub use raw::{position_from_value, position_to_value, RawFeature, RawGeometry};
pub use types::{BoundaryType, ProcessedBoundary, Ring};
