//! Provider queries and request scoping.

use std::fmt;

use crate::boundary::BoundaryType;
use crate::geo::BoundingBox;

/// Server-side timeout requested from Overpass, in seconds.
pub const OVERPASS_TIMEOUT_SECS: u32 = 25;

/// Upstream service a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Overpass API (OSM relations, POSTed QL)
    Overpass,
    /// Static GeoJSON dataset served from a CDN
    Dataset,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Overpass => "overpass",
            ProviderKind::Dataset => "dataset",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional narrowing supplied by the caller.
///
/// `region` is an ISO 3166-2 subdivision code and takes precedence over
/// `country` (ISO 3166-1 alpha-2) when both are set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryScope {
    pub bbox: Option<BoundingBox>,
    pub country: Option<String>,
    pub region: Option<String>,
}

impl QueryScope {
    pub fn is_unscoped(&self) -> bool {
        self.bbox.is_none() && self.country.is_none() && self.region.is_none()
    }

    /// Normalises codes to upper case and drops empty strings.
    pub fn normalized(mut self) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
        };
        self.country = clean(self.country);
        self.region = clean(self.region);
        self
    }
}

/// What an Overpass query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverpassSelector {
    /// `relation["boundary"="administrative"]["admin_level"=N]`
    AdminLevel(u8),
    /// `node["place"=...]`, returned as points
    Place(&'static str),
}

/// The provider-specific request body.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryRequest {
    /// Overpass QL text, POSTed as the `data` form field
    Overpass(String),
    /// Dataset URL, fetched with GET
    Dataset { url: String },
}

/// A single attempt in a fallback chain.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuery {
    pub provider: ProviderKind,
    /// Granularity the returned features represent
    pub granularity: BoundaryType,
    pub request: QueryRequest,
    /// Scope applied to this query (server-side for Overpass, as a
    /// post-fetch filter for datasets)
    pub scope: QueryScope,
    /// Short label for logs and error reports
    pub label: String,
}

impl SourceQuery {
    /// Builds a scoped Overpass query.
    pub fn overpass(
        granularity: BoundaryType,
        selector: OverpassSelector,
        scope: &QueryScope,
    ) -> Self {
        let label = match selector {
            OverpassSelector::AdminLevel(level) => format!("overpass:admin_level={}", level),
            OverpassSelector::Place(place) => format!("overpass:place={}", place),
        };
        Self {
            provider: ProviderKind::Overpass,
            granularity,
            request: QueryRequest::Overpass(build_overpass_ql(selector, scope)),
            scope: scope.clone(),
            label,
        }
    }

    /// Builds a dataset query for `file` under `base_url`.
    pub fn dataset(
        granularity: BoundaryType,
        base_url: &str,
        file: &str,
        scope: &QueryScope,
    ) -> Self {
        let url = format!("{}/{}", base_url.trim_end_matches('/'), file);
        Self {
            provider: ProviderKind::Dataset,
            granularity,
            label: format!("dataset:{}", url),
            request: QueryRequest::Dataset { url },
            scope: scope.clone(),
        }
    }
}

/// Generates Overpass QL for a selector, narrowed by the scope.
///
/// The bounding box becomes a global `[bbox:...]` setting so it applies to
/// every statement; country/region filters become a search area.
pub fn build_overpass_ql(selector: OverpassSelector, scope: &QueryScope) -> String {
    let mut ql = format!("[out:json][timeout:{}]", OVERPASS_TIMEOUT_SECS);
    if let Some(bbox) = scope.bbox {
        ql.push_str(&format!("[bbox:{}]", bbox.to_query_string()));
    }
    ql.push_str(";\n");

    let area_filter = match (&scope.region, &scope.country) {
        (Some(region), _) => Some(format!("area[\"ISO3166-2\"=\"{}\"]", escape_ql(region))),
        (None, Some(country)) => Some(format!(
            "area[\"ISO3166-1\"=\"{}\"][\"admin_level\"=\"2\"]",
            escape_ql(country)
        )),
        (None, None) => None,
    };
    let area_suffix = if let Some(area) = &area_filter {
        ql.push_str(&format!("{}->.searchArea;\n", area));
        "(area.searchArea)"
    } else {
        ""
    };

    match selector {
        OverpassSelector::AdminLevel(level) => {
            ql.push_str(&format!(
                "relation[\"boundary\"=\"administrative\"][\"admin_level\"=\"{}\"]{};\nout geom;",
                level, area_suffix
            ));
        }
        OverpassSelector::Place(place) => {
            ql.push_str(&format!(
                "node[\"place\"=\"{}\"]{};\nout body;",
                escape_ql(place),
                area_suffix
            ));
        }
    }
    ql
}

fn escape_ql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
