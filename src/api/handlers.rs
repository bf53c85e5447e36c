use crate::api::responses::{
    CityResponse, ErrorCode, ErrorResponse, HealthResponse, HealthStatus, STATUS_OK,
    StatusResponse,
};
use crate::error::AppError;
use crate::prediction::{ForecastResult, PredictionRequest};
use crate::state::{AppState, SensorSnapshot};
use crate::weather::WeatherReading;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, error};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

pub enum ApiResponse<T> {
    Success(T),
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            ApiResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    build_predict_response(&state, &body).await
}

pub async fn sensor_update(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    build_sensor_update_response(&state, payload)
}

pub async fn current_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    build_current_status_response(&state)
}

pub async fn weather(State(state): State<Arc<AppState>>) -> Json<WeatherReading> {
    Json(state.weather.get_full_reading().await)
}

pub async fn set_city(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    build_set_city_response(&state, &body)
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    build_health_response(&state, SystemTime::now())
}

async fn build_predict_response(state: &AppState, body: &[u8]) -> ApiResponse<ForecastResult> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => return invalid_request(&format!("invalid JSON body: {err}")),
    };
    let request = match PredictionRequest::from_value(&value) {
        Ok(request) => request,
        Err(err) => return app_error(err, "/predict"),
    };
    match state.predictor.predict(request).await {
        Ok(result) => ApiResponse::Success(result),
        Err(err) => app_error(err, "/predict"),
    }
}

fn build_sensor_update_response(state: &AppState, payload: Value) -> ApiResponse<StatusResponse> {
    match state.sensors.replace(SensorSnapshot::from_value(payload)) {
        Ok(()) => ApiResponse::Success(StatusResponse { status: STATUS_OK }),
        Err(err) => app_error(err, "/sensor_update"),
    }
}

fn build_current_status_response(state: &AppState) -> ApiResponse<Value> {
    match state.sensors.read() {
        Ok(snapshot) => ApiResponse::Success(snapshot.as_value().clone()),
        Err(err) => app_error(err, "/current_status"),
    }
}

fn build_set_city_response(state: &AppState, body: &[u8]) -> ApiResponse<CityResponse> {
    // An unreadable body is treated like a missing city.
    let requested = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| value.get("city").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_default();
    match state.weather.set_city(&requested) {
        Ok(city) => ApiResponse::Success(CityResponse {
            status: STATUS_OK,
            city,
        }),
        Err(err) => app_error(err, "/set_city"),
    }
}

fn build_health_response(state: &AppState, now: SystemTime) -> ApiResponse<HealthResponse> {
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("timestamp formatting failure", "/health"),
    };
    ApiResponse::Success(HealthResponse {
        status: HealthStatus::Ok,
        model_type: state.predictor.model_type().to_string(),
        weather_configured: state.weather.is_configured(),
        city: state.weather.city(),
        timestamp,
    })
}

fn app_error<T>(err: AppError, route: &str) -> ApiResponse<T> {
    match err {
        AppError::Validation(message) => {
            debug!(route, message = %message, "Rejected invalid request");
            invalid_request(&message)
        }
        AppError::StateLock => internal_error("state lock poisoned", route),
    }
}

fn invalid_request<T>(message: &str) -> ApiResponse<T> {
    ApiResponse::Error {
        status: StatusCode::BAD_REQUEST,
        body: ErrorResponse {
            error_code: ErrorCode::InvalidRequest,
            error_message: message.to_string(),
            timestamp: now_timestamp(),
        },
    }
}

fn internal_error<T>(message: &str, route: &str) -> ApiResponse<T> {
    error!(message = message, route, "Internal error while handling request");
    ApiResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error_code: ErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: now_timestamp(),
        },
    }
}

fn now_timestamp() -> String {
    format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format error timestamp");
        "1970-01-01T00:00:00Z".to_string()
    })
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    let datetime = OffsetDateTime::from(timestamp);
    datetime.format(&Rfc3339).map_err(TimestampError::Format)
}
