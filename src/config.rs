use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const CONFIG_PATH_ENV: &str = "POWER_FORECAST_CONFIG";
pub const API_KEY_ENV: &str = "OWM_API_KEY";
pub const DEFAULT_SERVER_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_SERVER_PORT: u16 = 5000;
pub const DEFAULT_CITY: &str = "Darbhanga";
pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_CACHE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_REAL_MODEL_PATH: &str = "models/real_rf_model.json";
pub const DEFAULT_SYNTHETIC_MODEL_PATH: &str = "models/rf_model.json";
pub const DEFAULT_TELEMETRY_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub weather: Option<WeatherSection>,
    #[serde(default)]
    pub model: Option<ModelSection>,
    #[serde(default)]
    pub telemetry: Option<TelemetrySection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Address to bind (default: 127.0.0.1)
    pub host: Option<IpAddr>,
    /// Port to listen on (default: 5000)
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherSection {
    pub city: Option<String>,
    pub base_url: Option<String>,
    /// Maximum age of a cached temperature, in seconds (default: 300)
    pub cache_timeout_secs: Option<u64>,
    /// Bound on a single provider call, in seconds (default: 5)
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelSection {
    pub real_path: Option<PathBuf>,
    pub synthetic_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySection {
    #[serde(default)]
    pub enabled: bool,
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads the configuration from `POWER_FORECAST_CONFIG`, or the default path.
pub fn load_default() -> Result<Config, ConfigError> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => load_from_path(path),
        _ => load_from_path(DEFAULT_CONFIG_PATH),
    }
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

/// Reads the weather provider credential from the environment.
///
/// An unset or blank variable means the service runs in default-weather mode.
pub fn weather_api_key() -> Option<String> {
    non_blank(std::env::var(API_KEY_ENV).ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn log_level(&self) -> tracing::Level {
        self.logging.level.parse().unwrap_or(tracing::Level::INFO)
    }

    /// Returns the socket address to bind (default: 127.0.0.1:5000)
    pub fn server_addr(&self) -> SocketAddr {
        let host = self
            .server
            .as_ref()
            .and_then(|s| s.host)
            .unwrap_or(DEFAULT_SERVER_HOST);
        let port = self
            .server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT);
        SocketAddr::new(host, port)
    }

    pub fn city(&self) -> String {
        self.weather
            .as_ref()
            .and_then(|w| non_blank(w.city.clone()))
            .unwrap_or_else(|| DEFAULT_CITY.to_string())
    }

    pub fn weather_base_url(&self) -> String {
        self.weather
            .as_ref()
            .and_then(|w| non_blank(w.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_WEATHER_URL.to_string())
    }

    pub fn cache_timeout(&self) -> Duration {
        let secs = self
            .weather
            .as_ref()
            .and_then(|w| w.cache_timeout_secs)
            .unwrap_or(DEFAULT_CACHE_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .weather
            .as_ref()
            .and_then(|w| w.request_timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    /// Trained artifact candidates in preference order, each with its reported tag.
    pub fn model_candidates(&self) -> Vec<(&'static str, PathBuf)> {
        let section = self.model.as_ref();
        let real = section
            .and_then(|m| m.real_path.clone())
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REAL_MODEL_PATH));
        let synthetic = section
            .and_then(|m| m.synthetic_path.clone())
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SYNTHETIC_MODEL_PATH));
        vec![("real", real), ("synthetic", synthetic)]
    }

    pub fn telemetry_enabled(&self) -> bool {
        self.telemetry.as_ref().is_some_and(|t| t.enabled)
    }

    /// Returns the synthetic feed interval (default: 5 seconds)
    pub fn telemetry_interval(&self) -> Duration {
        let secs = self
            .telemetry
            .as_ref()
            .and_then(|t| t.interval_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TELEMETRY_INTERVAL_SECS);
        Duration::from_secs(secs)
    }
}
