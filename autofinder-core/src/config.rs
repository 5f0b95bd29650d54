use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::model::CityId;

pub const DEFAULT_API_BASE_URL: &str = "https://restapifrontoffice.reservauto.net";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);
pub const DEFAULT_MARGIN_KM: f64 = 1.0;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_base_url = "https://restapifrontoffice.reservauto.net"
/// poll_interval_secs = 1.5
/// default_city_id = 59
/// default_margin_km = 1.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_base_url: Option<String>,

    /// Delay between two availability calls, in seconds.
    pub poll_interval_secs: Option<f64>,

    pub default_city_id: Option<CityId>,

    pub default_margin_km: Option<f64>,
}

impl Config {
    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_secs
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    pub fn margin_km(&self) -> f64 {
        self.default_margin_km.unwrap_or(DEFAULT_MARGIN_KM)
    }

    /// City to search when none is given explicitly.
    pub fn default_city_id(&self) -> Result<CityId> {
        self.default_city_id.ok_or_else(|| {
            anyhow!(
                "No city configured.\n\
                 Hint: pass `--city <id>` or run `autofinder configure` first."
            )
        })
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "autofinder", "autofinder-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
