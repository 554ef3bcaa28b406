//! Administrative hierarchy resolution
//!
//! Maps a viewport (zoom, center, optional selection) onto the
//! world → continent → country → state → city → neighborhood hierarchy and
//! aggregates entity counters over the resolved subtree.
//!
//! # Example
//!
//! ```
//! use prayermap_geo::boundary::BoundaryType;
//! use prayermap_geo::geo::LonLat;
//! use prayermap_geo::hierarchy::{Entity, EntityDirectory, HierarchyLevelKind, HierarchyResolver};
//!
//! let directory = EntityDirectory::new(vec![
//!     Entity::new("af", "Africa", BoundaryType::Continent, LonLat::new(20.0, 5.0), None),
//!     Entity::new("ke", "Kenya", BoundaryType::Country, LonLat::new(37.9, 0.0), Some("af"))
//!         .with_value(12),
//! ]);
//! let resolver = HierarchyResolver::new(directory);
//!
//! let level = resolver.resolve(4.0, LonLat::new(25.0, 2.0), None);
//! assert_eq!(level.level, HierarchyLevelKind::Continent);
//! assert_eq!(level.aggregated.total, 12);
//! ```

mod entity;
mod resolver;

pub use entity::{Entity, EntityDirectory};
pub use resolver::{
    AggregatedStats, AggregationPredicates, HierarchyLevel, HierarchyLevelKind, HierarchyResolver,
    LevelThresholds,
};
