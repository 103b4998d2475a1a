use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::ClientError;
use crate::forecast::{ForecastParams, WeatherState};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_STORAGE_KEY: &str = "token";
pub const API_URL_ENV: &str = "WEATHERITE_API_URL";

/// Client settings. Every field has a default so a partial TOML file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the remote service, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Key the credential is persisted under.
    pub storage_key: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Parameters of the automatic forecast issued when the dashboard mounts.
    pub forecast: ForecastDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastDefaults {
    pub current_state: WeatherState,
    pub horizon_days: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            request_timeout_secs: 30,
            user_agent: "Weatherite/1.0".to_string(),
            forecast: ForecastDefaults::default(),
        }
    }
}

impl Default for ForecastDefaults {
    fn default() -> Self {
        let params = ForecastParams::default();
        Self {
            current_state: params.current_state(),
            horizon_days: params.horizon_days(),
        }
    }
}

impl ClientConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ClientError> {
        let config: ClientConfig = toml::from_str(raw)
            .map_err(|e| ClientError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        let config = Self::from_toml_str(&raw)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// `$WEATHERITE_API_URL` wins over the file value.
    pub fn with_env_overrides(mut self) -> Result<Self, ClientError> {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                debug!("Using {} = {}", API_URL_ENV, url);
                self.base_url = url.trim().to_string();
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        self.base_url()?;
        if self.storage_key.trim().is_empty() {
            return Err(ClientError::Config("storage_key must not be empty".into()));
        }
        self.default_forecast()?;
        Ok(())
    }

    /// The base URL, normalized to end with `/` so endpoint paths join under it.
    pub fn base_url(&self) -> Result<Url, ClientError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| ClientError::Config(format!("Invalid base_url '{}': {}", self.base_url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ClientError::Config(format!(
                "Unsupported base_url scheme '{}'",
                other
            ))),
        }
    }

    pub fn default_forecast(&self) -> Result<ForecastParams, ClientError> {
        ForecastParams::new(self.forecast.current_state, self.forecast.horizon_days)
            .map_err(|e| ClientError::Config(format!("forecast defaults: {}", e)))
    }

    /// `<config dir>/weatherite/config.toml`
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weatherite").join("config.toml"))
    }
}
