//! Zoom → source plan selection.
//!
//! One fixed table maps zoom ranges to a boundary granularity. Each
//! granularity has a primary query and up to two fallbacks, tried strictly in
//! order: an alternate provider or a coarser dataset used as a degraded
//! substitute.
//!
//! | Zoom   | Granularity  | Primary                | Fallbacks                                   |
//! |--------|--------------|------------------------|---------------------------------------------|
//! | ≤ 3    | continent    | dataset (CDN)          | dataset (mirror)                            |
//! | ≤ 6    | country      | dataset (CDN)          | dataset (mirror), Overpass admin_level 2    |
//! | ≤ 10   | state        | Overpass admin_level 4 | dataset admin-1, dataset countries (coarser)|
//! | ≤ 14   | city         | Overpass admin_level 8 | Overpass place=city points, admin_level 4   |
//! | > 14   | neighborhood | Overpass admin_level 10| Overpass admin_level 8 (coarser)            |

use super::query::{OverpassSelector, QueryScope, SourceQuery};
use crate::boundary::BoundaryType;

/// Default Overpass interpreter endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Default static dataset base (Natural Earth GeoJSON via jsDelivr).
pub const DEFAULT_DATASET_BASE_URL: &str =
    "https://cdn.jsdelivr.net/gh/nvkelso/natural-earth-vector@master/geojson";

/// Mirror of the static dataset on a second host.
pub const DEFAULT_DATASET_MIRROR_URL: &str =
    "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson";

const CONTINENTS_FILE: &str = "ne_110m_geography_regions_polys.geojson";
const COUNTRIES_FILE: &str = "ne_50m_admin_0_countries.geojson";
const STATES_FILE: &str = "ne_10m_admin_1_states_provinces.geojson";

/// Upstream endpoints used to build queries.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEndpoints {
    pub overpass_url: String,
    pub dataset_base_url: String,
    pub dataset_mirror_url: String,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            dataset_base_url: DEFAULT_DATASET_BASE_URL.to_string(),
            dataset_mirror_url: DEFAULT_DATASET_MIRROR_URL.to_string(),
        }
    }
}

/// Upper zoom bound (inclusive) for each boundary granularity.
///
/// Zoom values above `city` resolve to neighborhoods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GranularityThresholds {
    pub continent: f64,
    pub country: f64,
    pub state: f64,
    pub city: f64,
}

impl Default for GranularityThresholds {
    fn default() -> Self {
        Self {
            continent: 3.0,
            country: 6.0,
            state: 10.0,
            city: 14.0,
        }
    }
}

impl GranularityThresholds {
    /// Boundaries at exactly a threshold belong to the coarser granularity.
    pub fn granularity_for(&self, zoom: f64) -> BoundaryType {
        if zoom <= self.continent {
            BoundaryType::Continent
        } else if zoom <= self.country {
            BoundaryType::Country
        } else if zoom <= self.state {
            BoundaryType::State
        } else if zoom <= self.city {
            BoundaryType::City
        } else {
            BoundaryType::Neighborhood
        }
    }
}

/// Cache lifetime for a granularity, in minutes.
pub fn cache_ttl_minutes(granularity: BoundaryType) -> u64 {
    match granularity {
        BoundaryType::Continent | BoundaryType::Country => 24 * 60,
        BoundaryType::State => 12 * 60,
        BoundaryType::City => 60,
        BoundaryType::Neighborhood => 30,
    }
}

/// The ordered list of queries for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePlan {
    pub granularity: BoundaryType,
    pub primary: SourceQuery,
    pub fallbacks: Vec<SourceQuery>,
    pub cache_ttl_minutes: u64,
}

impl SourcePlan {
    /// Primary followed by fallbacks, in attempt order.
    pub fn attempts(&self) -> impl Iterator<Item = &SourceQuery> {
        std::iter::once(&self.primary).chain(self.fallbacks.iter())
    }
}

/// Selects the primary source and fallbacks for a zoom level.
#[derive(Debug, Clone, Default)]
pub struct FallbackSourceResolver {
    endpoints: SourceEndpoints,
    thresholds: GranularityThresholds,
}

impl FallbackSourceResolver {
    pub fn new(endpoints: SourceEndpoints, thresholds: GranularityThresholds) -> Self {
        Self {
            endpoints,
            thresholds,
        }
    }

    pub fn endpoints(&self) -> &SourceEndpoints {
        &self.endpoints
    }

    pub fn thresholds(&self) -> &GranularityThresholds {
        &self.thresholds
    }

    /// Builds the plan for `zoom`, with every query narrowed by `scope`.
    pub fn select_source(&self, zoom: f64, scope: &QueryScope) -> SourcePlan {
        let granularity = self.thresholds.granularity_for(zoom);
        let (primary, fallbacks) = self.queries_for(granularity, scope);
        SourcePlan {
            granularity,
            primary,
            fallbacks,
            cache_ttl_minutes: cache_ttl_minutes(granularity),
        }
    }

    fn queries_for(
        &self,
        granularity: BoundaryType,
        scope: &QueryScope,
    ) -> (SourceQuery, Vec<SourceQuery>) {
        let base = &self.endpoints.dataset_base_url;
        let mirror = &self.endpoints.dataset_mirror_url;
        let admin = |g: BoundaryType, level: u8| {
            SourceQuery::overpass(g, OverpassSelector::AdminLevel(level), scope)
        };

        match granularity {
            BoundaryType::Continent => (
                SourceQuery::dataset(granularity, base, CONTINENTS_FILE, scope),
                vec![SourceQuery::dataset(granularity, mirror, CONTINENTS_FILE, scope)],
            ),
            BoundaryType::Country => (
                SourceQuery::dataset(granularity, base, COUNTRIES_FILE, scope),
                vec![
                    SourceQuery::dataset(granularity, mirror, COUNTRIES_FILE, scope),
                    admin(BoundaryType::Country, 2),
                ],
            ),
            BoundaryType::State => (
                admin(BoundaryType::State, 4),
                vec![
                    SourceQuery::dataset(BoundaryType::State, base, STATES_FILE, scope),
                    SourceQuery::dataset(BoundaryType::Country, base, COUNTRIES_FILE, scope),
                ],
            ),
            BoundaryType::City => (
                admin(BoundaryType::City, 8),
                vec![
                    SourceQuery::overpass(
                        BoundaryType::City,
                        OverpassSelector::Place("city"),
                        scope,
                    ),
                    admin(BoundaryType::State, 4),
                ],
            ),
            BoundaryType::Neighborhood => (
                admin(BoundaryType::Neighborhood, 10),
                vec![admin(BoundaryType::City, 8)],
            ),
        }
    }
}
