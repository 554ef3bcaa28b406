//! PrayerMap Geo - tiered boundary acquisition for the prayer map
//!
//! This library decides which administrative boundaries to draw for a map
//! viewport and fetches them without overloading free public providers:
//!
//! - [`hierarchy`] maps zoom and position to a level of the entity tree
//! - [`source`] plans which provider to ask and validates what comes back
//! - [`gateway`] paces every upstream request and trips a circuit breaker
//! - [`boundary`] turns raw features into renderable polygons
//! - [`cache`] keeps processed boundaries with a per-entry TTL
//! - [`acquisition`] ties them together behind one call per viewport

pub mod acquisition;
pub mod boundary;
pub mod cache;
pub mod config;
pub mod gateway;
pub mod geo;
pub mod hierarchy;
pub mod logging;
pub mod source;
pub mod telemetry;
