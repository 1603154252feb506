use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::model::Coordinate;

const APP_QUALIFIER: &str = "dev";
const APP_ORGANIZATION: &str = "geoweather";
const APP_NAME: &str = "geoweather";

/// Lifetimes of the three kinds of cache entries, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub weather_secs: u64,
    pub reverse_secs: u64,
    pub forward_secs: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            weather_secs: 300,
            reverse_secs: 86_400 * 7,
            forward_secs: 86_400 * 30,
        }
    }
}

impl TtlConfig {
    pub fn weather(&self) -> Duration {
        Duration::from_secs(self.weather_secs)
    }

    pub fn reverse(&self) -> Duration {
        Duration::from_secs(self.reverse_secs)
    }

    pub fn forward(&self) -> Duration {
        Duration::from_secs(self.forward_secs)
    }
}

/// Location used when nothing better can be resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
}

impl Default for DefaultLocation {
    fn default() -> Self {
        Self {
            latitude: 13.7563,
            longitude: 100.5018,
            label: "กรุงเทพมหานคร".to_string(),
        }
    }
}

impl DefaultLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Upstream endpoints. Overridable so tests can point at a local mock server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub open_meteo_geocoding: String,
    pub nominatim_search: String,
    pub reverse_geocode: String,
    pub forecast: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            open_meteo_geocoding: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            nominatim_search: "https://nominatim.openstreetmap.org/search".to_string(),
            reverse_geocode: "https://api.bigdatacloud.net/data/reverse-geocode-client"
                .to_string(),
            forecast: "https://api.open-meteo.com/v1/forecast".to_string(),
        }
    }
}

impl Endpoints {
    /// All endpoints rooted at `base`, keeping the upstream paths.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            open_meteo_geocoding: format!("{base}/v1/search"),
            nominatim_search: format!("{base}/search"),
            reverse_geocode: format!("{base}/data/reverse-geocode-client"),
            forecast: format!("{base}/v1/forecast"),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// cache_dir = "/var/cache/geoweather"
/// contact = "ops@example.com"
///
/// [ttl]
/// weather_secs = 300
///
/// [default_location]
/// latitude = 13.7563
/// longitude = 100.5018
/// label = "กรุงเทพมหานคร"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding cache files. `None`, when no platform cache dir exists, disables caching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    /// ISO country code every geocoding lookup is restricted to.
    pub country_code: String,
    /// Country name appended to free-text searches.
    pub country_name: String,
    /// Language for place names returned by upstream services.
    pub language: String,
    /// Contact string embedded in the User-Agent header.
    pub contact: String,
    pub timeout_secs: u64,
    pub ttl: TtlConfig,
    pub default_location: DefaultLocation,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: Self::platform_cache_dir(),
            country_code: "TH".to_string(),
            country_name: "Thailand".to_string(),
            language: "th".to_string(),
            contact: "local-dev".to_string(),
            timeout_secs: 10,
            ttl: TtlConfig::default(),
            default_location: DefaultLocation::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Identifying User-Agent; Nominatim's usage policy rejects anonymous clients.
    pub fn user_agent(&self) -> String {
        format!("GeoWeather/{} (contact: {})", env!("CARGO_PKG_VERSION"), self.contact)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
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
        let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    fn platform_cache_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.cache_dir().to_path_buf())
    }
}
