use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow, bail};
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{
    fetcher::smhi::{DEFAULT_BASE_URL, DEFAULT_PRODUCT},
    model::Coordinates,
};

/// How and how often the SMHI API is called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Forecast product, e.g. "snow1g".
    #[serde(default = "default_product")]
    pub product: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_refresh_interval_minutes")]
    pub refresh_interval_minutes: u64,

    /// IANA zone whose midnights delimit forecast days.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_product() -> String {
    DEFAULT_PRODUCT.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_refresh_interval_minutes() -> u64 {
    60
}

fn default_timezone() -> String {
    "Europe/Stockholm".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            product: default_product(),
            timeout_secs: default_timeout_secs(),
            refresh_interval_minutes: default_refresh_interval_minutes(),
            timezone: default_timezone(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_minutes.max(1) * 60)
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid timezone '{}' in configuration: {e}", self.timezone))
    }
}

/// A configured forecast point as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationConfig {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [[locations]]
/// name = "home"
/// latitude = 59.3293
/// longitude = 18.0686
///
/// [provider]
/// timezone = "Europe/Stockholm"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub locations: Vec<LocationConfig>,

    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.provider.timezone()?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("se", "smhi-odp", "smhi-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Record a new location. Names and coordinates must both be unique.
    pub fn add_location(&mut self, location: LocationConfig) -> Result<()> {
        if self.location(&location.name).is_some() {
            bail!("A location named '{}' is already configured.", location.name);
        }

        let key = location.coordinates().key();
        if let Some(existing) = self
            .locations
            .iter()
            .find(|l| l.coordinates().key() == key)
        {
            bail!(
                "Coordinates {} are already configured as '{}'.",
                location.coordinates(),
                existing.name
            );
        }

        self.locations.push(location);
        Ok(())
    }

    pub fn remove_location(&mut self, name: &str) -> Option<LocationConfig> {
        let idx = self.locations.iter().position(|l| l.name == name)?;
        Some(self.locations.remove(idx))
    }

    pub fn location(&self, name: &str) -> Option<&LocationConfig> {
        self.locations.iter().find(|l| l.name == name)
    }

    /// Named location, or the first configured one when `name` is `None`.
    pub fn resolve_location(&self, name: Option<&str>) -> Result<&LocationConfig> {
        match name {
            Some(name) => self.location(name).ok_or_else(|| {
                anyhow!(
                    "No location named '{name}'.\n\
                     Hint: run `smhi list` to see configured locations."
                )
            }),
            None => self.locations.first().ok_or_else(|| {
                anyhow!(
                    "No location configured.\n\
                     Hint: run `smhi add <name> --lat <latitude> --lon <longitude>` first."
                )
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_defaults() {
        let cfg = ProviderConfig::default();
        assert_eq!(cfg.base_url, "https://opendata-download-metfcst.smhi.se/api");
        assert_eq!(cfg.product, "snow1g");
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(3600));
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.timezone().expect("valid zone"), chrono_tz::Europe::Stockholm);
    }

    #[test]
    fn partial_provider_table_uses_defaults() {
        let cfg: Config = toml::from_str("[provider]\ntimezone = \"UTC\"\n").expect("parse");
        assert_eq!(cfg.provider.timezone().expect("valid zone"), chrono_tz::UTC);
        assert_eq!(cfg.provider.product, "snow1g");
        assert!(cfg.locations.is_empty());
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        let cfg = ProviderConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..ProviderConfig::default()
        };
        let err = cfg.timezone().unwrap_err();
        assert!(err.to_string().contains("Invalid timezone"));
    }

    #[test]
    fn add_location_rejects_duplicate_coordinates() {
        let mut cfg = Config::default();
        cfg.add_location(LocationConfig::new("home", 59.3293, 18.0686))
            .expect("first add succeeds");

        let err = cfg
            .add_location(LocationConfig::new("office", 59.3293, 18.0686))
            .unwrap_err();

        assert!(err.to_string().contains("already configured as 'home'"));
        assert_eq!(cfg.locations.len(), 1);
    }

    #[test]
    fn add_location_rejects_duplicate_names() {
        let mut cfg = Config::default();
        cfg.add_location(LocationConfig::new("home", 59.3293, 18.0686))
            .expect("first add succeeds");

        let err = cfg
            .add_location(LocationConfig::new("home", 57.7, 11.97))
            .unwrap_err();

        assert!(err.to_string().contains("named 'home'"));
    }

    #[test]
    fn resolve_location_defaults_to_first() {
        let mut cfg = Config::default();
        let err = cfg.resolve_location(None).unwrap_err();
        assert!(err.to_string().contains("Hint: run `smhi add"));

        cfg.add_location(LocationConfig::new("home", 59.3293, 18.0686)).unwrap();
        cfg.add_location(LocationConfig::new("cabin", 63.1, 14.6)).unwrap();

        assert_eq!(cfg.resolve_location(None).unwrap().name, "home");
        assert_eq!(cfg.resolve_location(Some("cabin")).unwrap().name, "cabin");
        assert!(cfg.resolve_location(Some("nowhere")).is_err());
    }

    #[test]
    fn remove_location_by_name() {
        let mut cfg = Config::default();
        cfg.add_location(LocationConfig::new("home", 59.3293, 18.0686)).unwrap();

        assert!(cfg.remove_location("nowhere").is_none());
        let removed = cfg.remove_location("home").expect("removed");
        assert_eq!(removed.name, "home");
        assert!(cfg.locations.is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.provider.timezone = "UTC".to_string();
        cfg.add_location(LocationConfig::new("home", 59.3293, 18.0686)).unwrap();
        cfg.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_missing_file_gives_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(cfg, Config::default());
    }
}
