//! INI → [`ConfigFile`] parsing.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::gateway::{MAX_COOLDOWN, MAX_RETRY_LIMIT};

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// One INI section with its name attached for error reporting.
struct Section<'a> {
    name: &'static str,
    props: &'a Properties,
}

impl Section<'_> {
    /// Parses `key` if present, leaving `target` untouched otherwise.
    fn read<T: FromStr>(
        &self,
        key: &str,
        reason: &str,
        target: &mut T,
    ) -> Result<(), ConfigFileError> {
        if let Some(v) = self.props.get(key) {
            *target = v
                .trim()
                .parse()
                .map_err(|_| invalid(self.name, key, v, reason))?;
        }
        Ok(())
    }

    fn read_url(&self, key: &str, target: &mut String) -> Result<(), ConfigFileError> {
        if let Some(v) = self.props.get(key) {
            let v = v.trim();
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(invalid(self.name, key, v, "must be an http(s) URL"));
            }
            *target = v.trim_end_matches('/').to_string();
        }
        Ok(())
    }
}

fn section<'a>(ini: &'a Ini, name: &'static str) -> Option<Section<'a>> {
    ini.section(Some(name)).map(|props| Section { name, props })
}

pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(s) = section(ini, "gateway") {
        let g = &mut config.gateway;
        s.read("min_delay_ms", "must be milliseconds", &mut g.min_delay_ms)?;
        s.read("failure_threshold", "must be a positive integer", &mut g.failure_threshold)?;
        s.read("cooldown_secs", "must be seconds", &mut g.cooldown_secs)?;
        if g.failure_threshold == 0 {
            return Err(invalid("gateway", "failure_threshold", "0", "must be at least 1"));
        }
        if g.cooldown_secs > MAX_COOLDOWN.as_secs() {
            return Err(invalid(
                "gateway",
                "cooldown_secs",
                &g.cooldown_secs.to_string(),
                format!("must not exceed {}", MAX_COOLDOWN.as_secs()),
            ));
        }
    }

    if let Some(s) = section(ini, "retry") {
        let r = &mut config.retry;
        s.read("max_retries", "must be a non-negative integer", &mut r.max_retries)?;
        s.read("base_delay_ms", "must be milliseconds", &mut r.base_delay_ms)?;
        s.read("multiplier", "must be a number", &mut r.multiplier)?;
        s.read("max_delay_ms", "must be milliseconds", &mut r.max_delay_ms)?;
        if r.max_retries > MAX_RETRY_LIMIT {
            return Err(invalid(
                "retry",
                "max_retries",
                &r.max_retries.to_string(),
                format!("must not exceed {}", MAX_RETRY_LIMIT),
            ));
        }
        if r.multiplier.is_nan() || r.multiplier < 1.0 {
            return Err(invalid(
                "retry",
                "multiplier",
                &r.multiplier.to_string(),
                "must be at least 1.0",
            ));
        }
        if r.max_delay_ms < r.base_delay_ms {
            return Err(invalid(
                "retry",
                "max_delay_ms",
                &r.max_delay_ms.to_string(),
                "must not be below base_delay_ms",
            ));
        }
    }

    if let Some(s) = section(ini, "geometry") {
        let g = &mut config.geometry;
        s.read("min_ring_points", "must be an integer", &mut g.min_ring_points)?;
        s.read("min_valid_ratio", "must be a number", &mut g.min_valid_ratio)?;
        if let Some(v) = s.props.get("excluded_names") {
            g.excluded_names = v
                .split(',')
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect();
        }
        // A closed ring needs three distinct points plus the closing one
        if g.min_ring_points < 4 {
            return Err(invalid(
                "geometry",
                "min_ring_points",
                &g.min_ring_points.to_string(),
                "must be at least 4",
            ));
        }
        let ratio = g.min_valid_ratio;
        if ratio.is_nan() || ratio <= 0.0 || ratio > 1.0 {
            return Err(invalid(
                "geometry",
                "min_valid_ratio",
                &g.min_valid_ratio.to_string(),
                "must be in (0, 1]",
            ));
        }
    }

    if let Some(s) = section(ini, "hierarchy") {
        let h = &mut config.hierarchy;
        s.read("world_max_zoom", "must be a zoom level", &mut h.world_max_zoom)?;
        s.read("continent_max_zoom", "must be a zoom level", &mut h.continent_max_zoom)?;
        s.read("country_max_zoom", "must be a zoom level", &mut h.country_max_zoom)?;
        s.read("state_max_zoom", "must be a zoom level", &mut h.state_max_zoom)?;
        s.read("city_max_zoom", "must be a zoom level", &mut h.city_max_zoom)?;
        ascending(
            "hierarchy",
            &[
                ("world_max_zoom", h.world_max_zoom),
                ("continent_max_zoom", h.continent_max_zoom),
                ("country_max_zoom", h.country_max_zoom),
                ("state_max_zoom", h.state_max_zoom),
                ("city_max_zoom", h.city_max_zoom),
            ],
        )?;
    }

    if let Some(s) = section(ini, "granularity") {
        let g = &mut config.granularity;
        s.read("continent_max_zoom", "must be a zoom level", &mut g.continent_max_zoom)?;
        s.read("country_max_zoom", "must be a zoom level", &mut g.country_max_zoom)?;
        s.read("state_max_zoom", "must be a zoom level", &mut g.state_max_zoom)?;
        s.read("city_max_zoom", "must be a zoom level", &mut g.city_max_zoom)?;
        ascending(
            "granularity",
            &[
                ("continent_max_zoom", g.continent_max_zoom),
                ("country_max_zoom", g.country_max_zoom),
                ("state_max_zoom", g.state_max_zoom),
                ("city_max_zoom", g.city_max_zoom),
            ],
        )?;
    }

    if let Some(s) = section(ini, "sources") {
        let src = &mut config.sources;
        s.read_url("overpass_url", &mut src.overpass_url)?;
        s.read_url("dataset_base_url", &mut src.dataset_base_url)?;
        s.read_url("dataset_mirror_url", &mut src.dataset_mirror_url)?;
        s.read("timeout_secs", "must be seconds", &mut src.timeout_secs)?;
        if src.timeout_secs == 0 {
            return Err(invalid("sources", "timeout_secs", "0", "must be at least 1"));
        }
    }

    if let Some(s) = section(ini, "logging") {
        if let Some(v) = s.props.get("directory") {
            config.logging.directory = expand_tilde(v.trim());
        }
        if let Some(v) = s.props.get("file") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("logging", "file", v, "must not be empty"));
            }
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

/// Zoom thresholds must be finite and strictly increasing.
fn ascending(section: &str, levels: &[(&str, f64)]) -> Result<(), ConfigFileError> {
    let mut previous = f64::NEG_INFINITY;
    for (key, zoom) in levels {
        if !zoom.is_finite() || *zoom <= previous {
            return Err(invalid(
                section,
                key,
                &zoom.to_string(),
                "zoom thresholds must increase level by level",
            ));
        }
        previous = *zoom;
    }
    Ok(())
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(path),
    }
}
