use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV: &str = "ATTACK_LENS_CONFIG";
/// Config file looked up in the working directory otherwise.
pub const CONFIG_FILE: &str = "attack-lens.toml";

/// Range and starting position of a "minimum usage count" slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SliderConfig {
    pub max: usize,
    pub default: usize,
}

/// Tunables for the dashboard. Every field has a default, so an empty or
/// partial TOML file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Minimum-uses slider on the techniques page.
    pub technique_usage: SliderConfig,
    /// Minimum-uses slider on the software page.
    pub software_usage: SliderConfig,
    /// Sources listed on the detection and mitigation pages need more than
    /// this many relationships.
    pub coverage_threshold: usize,
    /// Rows shown in data previews.
    pub preview_rows: usize,
    /// Words drawn in the TF-IDF cloud.
    pub word_cloud_terms: usize,
    /// Entries listed under "top targets".
    pub top_targets: usize,
    /// Initial window size `[width, height]`.
    pub window_size: [f32; 2],
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            technique_usage: SliderConfig {
                max: 200,
                default: 100,
            },
            software_usage: SliderConfig {
                max: 100,
                default: 10,
            },
            coverage_threshold: 20,
            preview_rows: 500,
            word_cloud_terms: 150,
            top_targets: 5,
            window_size: [1400.0, 900.0],
        }
    }
}

impl DashboardConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing dashboard config")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&text)
    }

    /// Load from `$ATTACK_LENS_CONFIG` or `./attack-lens.toml`.
    ///
    /// A missing file means defaults; an unreadable or malformed one is
    /// logged and also falls back to defaults.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::from_file(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring config {}: {e:#}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(DashboardConfig::from_toml("").unwrap(), DashboardConfig::default());
    }

    #[test]
    fn partial_file_overrides_named_fields_only() {
        let config = DashboardConfig::from_toml(
            "coverage_threshold = 5\n[software_usage]\nmax = 50\ndefault = 3\n",
        )
        .unwrap();
        assert_eq!(config.coverage_threshold, 5);
        assert_eq!(config.software_usage, SliderConfig { max: 50, default: 3 });
        assert_eq!(config.technique_usage, DashboardConfig::default().technique_usage);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(DashboardConfig::from_toml("preview_rows = \"many\"").is_err());
    }

    #[test]
    fn missing_file_is_an_error_for_from_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DashboardConfig::from_file(&dir.path().join("absent.toml")).is_err());
    }
}
