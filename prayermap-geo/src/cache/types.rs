//! Cache keys, entries, and statistics.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::boundary::{BoundaryType, ProcessedBoundary};
use crate::geo::BoundingBox;
use crate::source::QueryScope;

/// Exact-match key for a boundary request.
///
/// Zoom and bbox edges are stored by bit pattern so the key is hashable and
/// viewports never share an entry through rounding; `-0.0` is folded into
/// `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    granularity: BoundaryType,
    zoom_bits: u64,
    bbox_bits: Option<[u64; 4]>,
    region: Option<String>,
    country: Option<String>,
}

impl CacheKey {
    pub fn new(granularity: BoundaryType, zoom: f64, scope: &QueryScope) -> Self {
        let scope = scope.clone().normalized();
        Self {
            granularity,
            zoom_bits: key_bits(zoom),
            bbox_bits: scope.bbox.map(|b| {
                [
                    key_bits(b.south),
                    key_bits(b.west),
                    key_bits(b.north),
                    key_bits(b.east),
                ]
            }),
            region: scope.region,
            country: scope.country,
        }
    }

    pub fn granularity(&self) -> BoundaryType {
        self.granularity
    }

    pub fn zoom(&self) -> f64 {
        f64::from_bits(self.zoom_bits)
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.bbox_bits.map(|[s, w, n, e]| {
            BoundingBox::new(
                f64::from_bits(s),
                f64::from_bits(w),
                f64::from_bits(n),
                f64::from_bits(e),
            )
        })
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }
}

fn key_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full precision, so distinct keys never render alike
        let bbox = self
            .bbox()
            .map(|b| format!("{},{},{},{}", b.south, b.west, b.north, b.east))
            .unwrap_or_else(|| "none".to_string());
        write!(
            f,
            "{}:z{}:bbox={}:region={}:country={}",
            self.granularity,
            self.zoom(),
            bbox,
            self.region.as_deref().unwrap_or("none"),
            self.country.as_deref().unwrap_or("none"),
        )
    }
}

/// A cached boundary set.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Arc<Vec<ProcessedBoundary>>,
    /// Monotonic insertion time, used for expiry
    pub created_at: Instant,
    /// Wall-clock insertion time, for inspection
    pub created_wall: DateTime<Utc>,
    pub ttl_minutes: u64,
}

impl CacheEntry {
    pub fn new(data: Arc<Vec<ProcessedBoundary>>, ttl_minutes: u64) -> Self {
        Self {
            data,
            created_at: Instant::now(),
            created_wall: Utc::now(),
            ttl_minutes,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes.saturating_mul(60))
    }

    /// An entry is expired once `now - created_at > ttl`.
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Inspection view of one cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntryInfo {
    pub key: CacheKey,
    pub boundary_count: usize,
    pub created_wall: DateTime<Utc>,
    pub ttl_minutes: u64,
    pub age: Duration,
    pub expired: bool,
}

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries removed lazily on read
    pub expirations: u64,
    pub entry_count: usize,
}

impl CacheStats {
    /// Hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_exact_match() {
        let scope = QueryScope {
            bbox: Some(BoundingBox::new(40.0, -75.0, 41.0, -73.0)),
            country: Some("us".into()),
            region: None,
        };
        let a = CacheKey::new(BoundaryType::State, 9.0, &scope);
        let b = CacheKey::new(BoundaryType::State, 9.0, &scope);
        assert_eq!(a, b);
        assert_eq!(a.country(), Some("US"));

        assert_ne!(a, CacheKey::new(BoundaryType::State, 9.5, &scope));
        assert_ne!(a, CacheKey::new(BoundaryType::State, 9.0, &QueryScope::default()));
        assert_ne!(a, CacheKey::new(BoundaryType::City, 9.0, &scope));
    }

    #[test]
    fn test_negative_zero_zoom_matches_zero() {
        let scope = QueryScope::default();
        assert_eq!(
            CacheKey::new(BoundaryType::Continent, -0.0, &scope),
            CacheKey::new(BoundaryType::Continent, 0.0, &scope)
        );
    }

    #[test]
    fn test_bbox_differing_past_fourth_decimal_is_distinct() {
        let scope = |east: f64| QueryScope {
            bbox: Some(BoundingBox::new(0.0, 9.0, 1.0, east)),
            ..Default::default()
        };
        let a = CacheKey::new(BoundaryType::City, 12.0, &scope(10.00004));
        let b = CacheKey::new(BoundaryType::City, 12.0, &scope(10.00001));
        assert_ne!(a, b);
        assert_ne!(a.to_string(), b.to_string());
        assert_eq!(a.bbox().unwrap().east, 10.00004);

        // -0.0 edges fold like zoom does
        let neg = CacheKey::new(
            BoundaryType::City,
            12.0,
            &QueryScope {
                bbox: Some(BoundingBox::new(-0.0, 9.0, 1.0, 10.00004)),
                ..Default::default()
            },
        );
        let pos = CacheKey::new(
            BoundaryType::City,
            12.0,
            &QueryScope {
                bbox: Some(BoundingBox::new(0.0, 9.0, 1.0, 10.00004)),
                ..Default::default()
            },
        );
        assert_eq!(neg, pos);
    }

    #[test]
    fn test_cache_key_display() {
        let key = CacheKey::new(BoundaryType::Country, 5.0, &QueryScope::default());
        assert_eq!(
            key.to_string(),
            "country:z5:bbox=none:region=none:country=none"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiry_is_strictly_after_ttl() {
        let entry = CacheEntry::new(Arc::new(Vec::new()), 1);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!entry.is_expired());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired());
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < 0.001);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
