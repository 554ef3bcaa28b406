//! [`ConfigFile`] → INI text.

use super::settings::ConfigFile;

pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[gateway]
; Minimum delay between two upstream requests (milliseconds)
min_delay_ms = {}
; Consecutive failures before requests are rejected
failure_threshold = {}
; How long the circuit stays open (seconds)
cooldown_secs = {}

[retry]
; Retries after an HTTP 429 (0 disables retrying)
max_retries = {}
base_delay_ms = {}
multiplier = {}
max_delay_ms = {}

[geometry]
; Minimum points per ring, closing point included
min_ring_points = {}
; Share of ring points that must be valid coordinates
min_valid_ratio = {}
; Comma-separated feature names to drop
excluded_names = {}

[hierarchy]
; Highest zoom shown at each hierarchy level
world_max_zoom = {}
continent_max_zoom = {}
country_max_zoom = {}
state_max_zoom = {}
city_max_zoom = {}

[granularity]
; Highest zoom served by each boundary dataset
continent_max_zoom = {}
country_max_zoom = {}
state_max_zoom = {}
city_max_zoom = {}

[sources]
overpass_url = {}
dataset_base_url = {}
dataset_mirror_url = {}
; HTTP request timeout (seconds)
timeout_secs = {}

[logging]
directory = {}
file = {}
"#,
        config.gateway.min_delay_ms,
        config.gateway.failure_threshold,
        config.gateway.cooldown_secs,
        config.retry.max_retries,
        config.retry.base_delay_ms,
        config.retry.multiplier,
        config.retry.max_delay_ms,
        config.geometry.min_ring_points,
        config.geometry.min_valid_ratio,
        config.geometry.excluded_names.join(", "),
        config.hierarchy.world_max_zoom,
        config.hierarchy.continent_max_zoom,
        config.hierarchy.country_max_zoom,
        config.hierarchy.state_max_zoom,
        config.hierarchy.city_max_zoom,
        config.granularity.continent_max_zoom,
        config.granularity.country_max_zoom,
        config.granularity.state_max_zoom,
        config.granularity.city_max_zoom,
        config.sources.overpass_url,
        config.sources.dataset_base_url,
        config.sources.dataset_mirror_url,
        config.sources.timeout_secs,
        config.logging.directory.display(),
        config.logging.file,
    )
}
