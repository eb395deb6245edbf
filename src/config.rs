//! TOML settings at ~/.zonefee/config.toml (or `--config <path>`).
//!
//! Every section and key is optional; a missing file means defaults.
//!
//! ```toml
//! [policy]
//! unmatched = "reject"
//! on_gateway_error = "fail"
//! geocode_timeout_secs = 6
//! neighborhood_city_filter = true
//!
//! [geocoder]
//! country_codes = ["br"]
//! offline = false
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, ZoneError};
use crate::geocoding::nominatim::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use crate::geocoding::NominatimConfig;
use crate::policy::{GatewayErrorPolicy, ResolutionPolicy, UnmatchedPolicy, DEFAULT_MARKERS};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub policy: PolicySettings,
    pub geocoder: GeocoderSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    pub unmatched: UnmatchedPolicy,
    pub on_gateway_error: GatewayErrorPolicy,
    pub default_markers: Vec<String>,
    pub geocode_timeout_secs: u64,
    pub neighborhood_city_filter: bool,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            unmatched: UnmatchedPolicy::default(),
            on_gateway_error: GatewayErrorPolicy::default(),
            default_markers: DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
            geocode_timeout_secs: 8,
            neighborhood_city_filter: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderSettings {
    pub base_url: String,
    pub user_agent: String,
    pub country_codes: Vec<String>,
    pub timeout_secs: u64,
    /// Never call the provider; every lookup is "not found".
    pub offline: bool,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            country_codes: Vec::new(),
            timeout_secs: 8,
            offline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
}

impl Settings {
    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from `path`. A missing file is not an error; a malformed one is.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let settings: Settings = toml::from_str(&text)?;
        settings.check()?;
        Ok(settings)
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".zonefee")
            .join("config.toml")
    }

    fn check(&self) -> Result<()> {
        if self.policy.geocode_timeout_secs == 0 {
            return Err(ZoneError::Config("policy.geocode_timeout_secs must be at least 1".into()));
        }
        if self.geocoder.timeout_secs == 0 {
            return Err(ZoneError::Config("geocoder.timeout_secs must be at least 1".into()));
        }
        if !self.geocoder.offline && self.geocoder.base_url.trim().is_empty() {
            return Err(ZoneError::Config("geocoder.base_url is empty".into()));
        }
        Ok(())
    }

    pub fn policy(&self) -> ResolutionPolicy {
        ResolutionPolicy {
            unmatched: self.policy.unmatched,
            on_gateway_error: self.policy.on_gateway_error,
            default_markers: self
                .policy
                .default_markers
                .iter()
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
            geocode_timeout: Duration::from_secs(self.policy.geocode_timeout_secs),
            neighborhood_city_filter: self.policy.neighborhood_city_filter,
        }
    }

    pub fn nominatim(&self) -> NominatimConfig {
        NominatimConfig {
            base_url: self.geocoder.base_url.clone(),
            user_agent: self.geocoder.user_agent.clone(),
            country_codes: self.geocoder.country_codes.clone(),
            timeout: Duration::from_secs(self.geocoder.timeout_secs),
        }
    }
}
