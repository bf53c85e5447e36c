//! Usage forecasting with a hard ceiling relative to the current draw.
//!
//! The returned forecast never exceeds `max(current − buffer, 0)` where
//! `buffer = clamp(0.15 · current, 10, 60)` kW.

use crate::error::AppError;
use crate::forecast::model::{ForecastInput, ForecastModel};
use crate::state::SensorStateStore;
use crate::weather::WeatherClient;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

pub const BUFFER_RATIO: f64 = 0.15;
pub const MIN_BUFFER_KW: f64 = 10.0;
pub const MAX_BUFFER_KW: f64 = 60.0;

/// Validated `/predict` input. Temperature is resolved from weather when absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionRequest {
    pub hour: u8,
    pub temperature: Option<f64>,
    pub occupancy: u32,
    pub is_weekend: bool,
}

impl PredictionRequest {
    pub fn from_value(value: &Value) -> Result<Self, AppError> {
        let body = value
            .as_object()
            .ok_or_else(|| invalid("request body must be a JSON object"))?;

        let hour = integral(required(body, "hour")?)
            .filter(|h| (0.0..=23.0).contains(h))
            .ok_or_else(|| invalid("hour must be an integer between 0 and 23"))?;
        let occupancy = integral(required(body, "occupancy")?)
            .filter(|o| (0.0..=f64::from(u32::MAX)).contains(o))
            .ok_or_else(|| invalid("occupancy must be a non-negative integer"))?;
        let is_weekend = match required(body, "is_weekend")? {
            Value::Bool(flag) => *flag,
            other => integral(other)
                .map(|flag| flag != 0.0)
                .ok_or_else(|| invalid("is_weekend must be 0, 1 or a boolean"))?,
        };
        let temperature = match body.get("temperature") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => Some(
                s.trim()
                    .parse::<f64>()
                    .map_err(|_| invalid("temperature must be a number"))?,
            ),
            Some(_) => return Err(invalid("temperature must be a number")),
        };
        if temperature.is_some_and(|t| !t.is_finite()) {
            return Err(invalid("temperature must be a finite number"));
        }

        Ok(Self {
            hour: hour as u8,
            temperature,
            occupancy: occupancy as u32,
            is_weekend,
        })
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Validation(message.to_string())
}

fn required<'a>(body: &'a Map<String, Value>, field: &str) -> Result<&'a Value, AppError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(AppError::Validation(format!(
            "missing required field: {field}"
        ))),
        Some(value) => Ok(value),
    }
}

fn integral(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite() && v.fract() == 0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    #[serde(rename = "predicted_usage_kW")]
    pub predicted_usage_kw: f64,
    pub model_type: String,
    pub temperature_used: f64,
}

pub fn safety_buffer(current_power_kw: f64) -> f64 {
    (BUFFER_RATIO * current_power_kw.max(0.0)).clamp(MIN_BUFFER_KW, MAX_BUFFER_KW)
}

pub fn max_allowed_usage(current_power_kw: f64) -> f64 {
    (current_power_kw - safety_buffer(current_power_kw)).max(0.0)
}

/// Clamps a raw forecast down to the ceiling derived from current draw.
pub fn apply_safety_cap(raw_kw: f64, current_power_kw: f64) -> f64 {
    let max_allowed = max_allowed_usage(current_power_kw);
    if raw_kw > max_allowed || raw_kw.is_nan() {
        max_allowed
    } else {
        raw_kw
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Clone)]
pub struct PredictionService {
    model: Arc<dyn ForecastModel>,
    weather: Arc<WeatherClient>,
    sensors: Arc<SensorStateStore>,
}

impl PredictionService {
    pub fn new(
        model: Arc<dyn ForecastModel>,
        weather: Arc<WeatherClient>,
        sensors: Arc<SensorStateStore>,
    ) -> Self {
        Self {
            model,
            weather,
            sensors,
        }
    }

    pub fn model_type(&self) -> &str {
        self.model.model_type()
    }

    pub async fn predict(&self, request: PredictionRequest) -> Result<ForecastResult, AppError> {
        let temperature_c = match request.temperature {
            Some(temperature) => temperature,
            None => self.weather.get_temperature().await,
        };

        let input = ForecastInput {
            hour: request.hour,
            temperature_c,
            occupancy: request.occupancy,
            is_weekend: request.is_weekend,
        };
        let raw = self.model.predict(&input);

        let current_power_kw = self.sensors.read()?.current_power_kw();
        let capped = apply_safety_cap(raw, current_power_kw);
        if capped < raw {
            debug!(
                raw_kw = raw,
                capped_kw = capped,
                current_power_kw,
                "Forecast capped by safety buffer"
            );
        }

        Ok(ForecastResult {
            predicted_usage_kw: round_to(capped, 2),
            model_type: self.model.model_type().to_string(),
            temperature_used: round_to(temperature_c, 1),
        })
    }
}
