//! Current-weather lookup with a temperature cache and a safe default.
//!
//! Provider failures never leave this module: callers always get a usable
//! temperature (cached, fresh, or [`DEFAULT_TEMPERATURE_C`]).

use crate::config::Config;
use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod openweather;

use openweather::OpenWeatherProvider;

pub const DEFAULT_TEMPERATURE_C: f64 = 22.0;
pub const DEFAULT_DESCRIPTION: &str = "Clear";
pub const UNKNOWN_DESCRIPTION: &str = "Unknown";
pub const NO_API_KEY_ERROR: &str = "No API key";

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("http error: {0}")]
    Http(reqwest::Error),
    #[error("provider returned status {0}: {1}")]
    Status(u16, String),
    #[error("invalid provider response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("provider response missing {0}")]
    MissingField(&'static str),
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the credential.
        WeatherError::Http(err.without_url())
    }
}

/// Conditions as reported by a provider; fields the provider omitted stay `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurrentConditions {
    pub temperature_c: Option<f64>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub humidity: Option<i64>,
    pub feels_like_c: Option<f64>,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + fmt::Debug {
    async fn current(&self, city: &str) -> Result<CurrentConditions, WeatherError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReading {
    pub temperature: f64,
    pub description: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<f64>,
    pub error: Option<String>,
}

impl WeatherReading {
    fn unconfigured(city: String) -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE_C,
            description: DEFAULT_DESCRIPTION.to_string(),
            city,
            humidity: None,
            feels_like: None,
            error: Some(NO_API_KEY_ERROR.to_string()),
        }
    }

    fn failed(city: String, err: &WeatherError) -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE_C,
            description: UNKNOWN_DESCRIPTION.to_string(),
            city,
            humidity: None,
            feels_like: None,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherCacheEntry {
    pub value: f64,
    pub fetched_at: Instant,
}

impl WeatherCacheEntry {
    pub fn is_fresh(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < timeout
    }
}

/// Weather lookups for the configured city.
///
/// The cache only backs [`WeatherClient::get_temperature`] and is not cleared
/// by [`WeatherClient::set_city`]: a reading for the previous city may be
/// served until it expires.
pub struct WeatherClient {
    provider: Option<Arc<dyn WeatherProvider>>,
    city: RwLock<String>,
    cache: Mutex<Option<WeatherCacheEntry>>,
    cache_timeout: Duration,
    request_timeout: Duration,
}

impl WeatherClient {
    pub fn new(
        provider: Option<Arc<dyn WeatherProvider>>,
        city: impl Into<String>,
        cache_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            city: RwLock::new(city.into()),
            cache: Mutex::new(None),
            cache_timeout,
            request_timeout,
        }
    }

    /// Builds the client for the configured city; without a credential no
    /// provider is attached and every lookup returns the default reading.
    pub fn from_config(config: &Config, api_key: Option<String>) -> Result<Self, WeatherError> {
        let provider: Option<Arc<dyn WeatherProvider>> = match api_key {
            Some(api_key) => Some(Arc::new(OpenWeatherProvider::new(
                api_key,
                config.weather_base_url(),
                config.request_timeout(),
            )?)),
            None => {
                warn!("No weather API key configured, using default temperature");
                None
            }
        };
        Ok(Self::new(
            provider,
            config.city(),
            config.cache_timeout(),
            config.request_timeout(),
        ))
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn city(&self) -> String {
        match self.city.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Switches the location for all later lookups. Blank names are rejected.
    pub fn set_city(&self, city: &str) -> Result<String, AppError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(AppError::Validation("city is required".to_string()));
        }
        let mut guard = self.city.write().map_err(|_| AppError::StateLock)?;
        *guard = city.to_string();
        info!(city, "Weather city updated");
        Ok(city.to_string())
    }

    pub async fn get_temperature(&self) -> f64 {
        self.get_temperature_at(Instant::now()).await
    }

    /// Temperature lookup with `now` injected for cache-age checks.
    pub async fn get_temperature_at(&self, now: Instant) -> f64 {
        let Some(provider) = self.provider.as_ref() else {
            debug!("No weather API key, using default temperature");
            return DEFAULT_TEMPERATURE_C;
        };

        if let Some(entry) = self.cached_entry()
            && entry.is_fresh(now, self.cache_timeout)
        {
            debug!(temperature = entry.value, "Using cached temperature");
            return entry.value;
        }

        let city = self.city();
        let fetched = self
            .fetch(provider.as_ref(), &city)
            .await
            .and_then(|conditions| {
                conditions
                    .temperature_c
                    .filter(|t| t.is_finite())
                    .ok_or(WeatherError::MissingField("main.temp"))
            });

        match fetched {
            Ok(temperature) => {
                self.store_entry(WeatherCacheEntry {
                    value: temperature,
                    fetched_at: now,
                });
                info!(city = %city, temperature, "Fetched current temperature");
                temperature
            }
            Err(err) => {
                warn!(city = %city, error = %err, "Weather lookup failed, using default temperature");
                DEFAULT_TEMPERATURE_C
            }
        }
    }

    /// Full conditions for the current city. Always fetches; never fails.
    pub async fn get_full_reading(&self) -> WeatherReading {
        let city = self.city();
        let Some(provider) = self.provider.as_ref() else {
            return WeatherReading::unconfigured(city);
        };

        let result = self
            .fetch(provider.as_ref(), &city)
            .await
            .and_then(|conditions| full_reading(conditions, &city));

        match result {
            Ok(reading) => reading,
            Err(err) => {
                warn!(city = %city, error = %err, "Weather lookup failed");
                WeatherReading::failed(city, &err)
            }
        }
    }

    async fn fetch(
        &self,
        provider: &dyn WeatherProvider,
        city: &str,
    ) -> Result<CurrentConditions, WeatherError> {
        tokio::time::timeout(self.request_timeout, provider.current(city))
            .await
            .map_err(|_| WeatherError::Timeout(self.request_timeout))?
    }

    fn cached_entry(&self) -> Option<WeatherCacheEntry> {
        match self.cache.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn store_entry(&self, entry: WeatherCacheEntry) {
        match self.cache.lock() {
            Ok(mut guard) => *guard = Some(entry),
            Err(poisoned) => *poisoned.into_inner() = Some(entry),
        }
    }
}

impl fmt::Debug for WeatherClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherClient")
            .field("city", &self.city())
            .field("configured", &self.is_configured())
            .field("cache_timeout", &self.cache_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn full_reading(conditions: CurrentConditions, city: &str) -> Result<WeatherReading, WeatherError> {
    let temperature = conditions
        .temperature_c
        .filter(|t| t.is_finite())
        .ok_or(WeatherError::MissingField("main.temp"))?;
    let description = conditions
        .description
        .ok_or(WeatherError::MissingField("weather[0].description"))?;
    Ok(WeatherReading {
        temperature,
        description,
        city: conditions.city.unwrap_or_else(|| city.to_string()),
        humidity: Some(conditions.humidity.unwrap_or(0)),
        feels_like: Some(conditions.feels_like_c.unwrap_or(temperature)),
        error: None,
    })
}
