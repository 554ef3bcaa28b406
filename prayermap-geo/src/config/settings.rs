//! Typed sections of `config.ini`.

use std::path::PathBuf;
use std::time::Duration;

use crate::boundary::{GeometryConfig, DEFAULT_MIN_RING_POINTS, DEFAULT_MIN_VALID_RATIO};
use crate::gateway::{
    CircuitBreakerConfig, GatewayConfig, RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER,
    DEFAULT_COOLDOWN, DEFAULT_FAILURE_THRESHOLD, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_DELAY_SECS,
    DEFAULT_MAX_RETRIES, DEFAULT_MIN_DELAY_MS,
};
use crate::hierarchy::LevelThresholds;
use crate::source::{
    GranularityThresholds, SourceEndpoints, DEFAULT_DATASET_BASE_URL, DEFAULT_DATASET_MIRROR_URL,
    DEFAULT_OVERPASS_URL, DEFAULT_TIMEOUT_SECS,
};

use super::file::config_directory;

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "prayermap-geo.log";

/// Complete contents of the configuration file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub gateway: GatewaySettings,
    pub retry: RetrySettings,
    pub geometry: GeometrySettings,
    pub hierarchy: HierarchySettings,
    pub granularity: GranularitySettings,
    pub sources: SourceSettings,
    pub logging: LoggingSettings,
}

/// `[gateway]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySettings {
    pub min_delay_ms: u64,
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown_secs: DEFAULT_COOLDOWN.as_secs(),
        }
    }
}

/// `[retry]` section. `max_retries = 0` disables retries.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay_ms: DEFAULT_MAX_DELAY_SECS * 1000,
        }
    }
}

/// `[geometry]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometrySettings {
    pub min_ring_points: usize,
    pub min_valid_ratio: f64,
    pub excluded_names: Vec<String>,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            min_ring_points: DEFAULT_MIN_RING_POINTS,
            min_valid_ratio: DEFAULT_MIN_VALID_RATIO,
            excluded_names: GeometryConfig::default().excluded_names,
        }
    }
}

/// `[hierarchy]` section: inclusive upper zoom of each hierarchy level.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchySettings {
    pub world_max_zoom: f64,
    pub continent_max_zoom: f64,
    pub country_max_zoom: f64,
    pub state_max_zoom: f64,
    pub city_max_zoom: f64,
}

impl Default for HierarchySettings {
    fn default() -> Self {
        let levels = LevelThresholds::default();
        Self {
            world_max_zoom: levels.world,
            continent_max_zoom: levels.continent,
            country_max_zoom: levels.country,
            state_max_zoom: levels.state,
            city_max_zoom: levels.city,
        }
    }
}

/// `[granularity]` section: inclusive upper zoom of each boundary dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct GranularitySettings {
    pub continent_max_zoom: f64,
    pub country_max_zoom: f64,
    pub state_max_zoom: f64,
    pub city_max_zoom: f64,
}

impl Default for GranularitySettings {
    fn default() -> Self {
        let thresholds = GranularityThresholds::default();
        Self {
            continent_max_zoom: thresholds.continent,
            country_max_zoom: thresholds.country,
            state_max_zoom: thresholds.state,
            city_max_zoom: thresholds.city,
        }
    }
}

/// `[sources]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub overpass_url: String,
    pub dataset_base_url: String,
    pub dataset_mirror_url: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            dataset_base_url: DEFAULT_DATASET_BASE_URL.to_string(),
            dataset_mirror_url: DEFAULT_DATASET_MIRROR_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: config_directory().join("logs"),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl ConfigFile {
    /// Gateway pacing, breaker, and default retry policy.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            min_delay: Duration::from_millis(self.gateway.min_delay_ms),
            circuit: CircuitBreakerConfig {
                failure_threshold: self.gateway.failure_threshold,
                cooldown: Duration::from_secs(self.gateway.cooldown_secs),
            },
            retry: self.retry_policy(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        if self.retry.max_retries == 0 {
            return RetryPolicy::None;
        }
        RetryPolicy::ExponentialBackoff {
            max_retries: self.retry.max_retries,
            initial_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            multiplier: self.retry.multiplier,
        }
    }

    /// Geometry thresholds; footprint steps keep their defaults.
    pub fn geometry_config(&self) -> GeometryConfig {
        GeometryConfig {
            min_ring_points: self.geometry.min_ring_points,
            min_valid_ratio: self.geometry.min_valid_ratio,
            excluded_names: self.geometry.excluded_names.clone(),
            ..GeometryConfig::default()
        }
    }

    pub fn level_thresholds(&self) -> LevelThresholds {
        LevelThresholds {
            world: self.hierarchy.world_max_zoom,
            continent: self.hierarchy.continent_max_zoom,
            country: self.hierarchy.country_max_zoom,
            state: self.hierarchy.state_max_zoom,
            city: self.hierarchy.city_max_zoom,
        }
    }

    pub fn granularity_thresholds(&self) -> GranularityThresholds {
        GranularityThresholds {
            continent: self.granularity.continent_max_zoom,
            country: self.granularity.country_max_zoom,
            state: self.granularity.state_max_zoom,
            city: self.granularity.city_max_zoom,
        }
    }

    pub fn source_endpoints(&self) -> SourceEndpoints {
        SourceEndpoints {
            overpass_url: self.sources.overpass_url.clone(),
            dataset_base_url: self.sources.dataset_base_url.clone(),
            dataset_mirror_url: self.sources.dataset_mirror_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_component_defaults() {
        let config = ConfigFile::default();

        assert_eq!(config.gateway_config(), GatewayConfig::default());
        assert_eq!(config.geometry_config(), GeometryConfig::default());
        assert_eq!(config.level_thresholds(), LevelThresholds::default());
        assert_eq!(
            config.granularity_thresholds(),
            GranularityThresholds::default()
        );
        assert_eq!(config.source_endpoints(), SourceEndpoints::default());
    }

    #[test]
    fn test_zero_retries_disables_retry() {
        let mut config = ConfigFile::default();
        config.retry.max_retries = 0;
        assert_eq!(config.retry_policy(), RetryPolicy::None);
    }
}
