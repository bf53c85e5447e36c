use serde::Serialize;

pub const STATUS_OK: &str = "ok";

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CityResponse {
    pub status: &'static str,
    pub city: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub model_type: String,
    pub weather_configured: bool,
    pub city: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    InternalError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn city_response_serializes_status_and_city() {
        let response = CityResponse {
            status: STATUS_OK,
            city: "Paris".to_string(),
        };

        let value = serde_json::to_value(response).expect("serialize city response");
        assert_eq!(value, json!({ "status": "ok", "city": "Paris" }));
    }

    #[test]
    fn health_response_serializes_lowercase_status() {
        let response = HealthResponse {
            status: HealthStatus::Ok,
            model_type: "rule-based".to_string(),
            weather_configured: false,
            city: "Darbhanga".to_string(),
            timestamp: "2026-01-11T12:33:00Z".to_string(),
        };

        let value = serde_json::to_value(response).expect("serialize health response");
        assert_eq!(
            value,
            json!({
                "status": "ok",
                "model_type": "rule-based",
                "weather_configured": false,
                "city": "Darbhanga",
                "timestamp": "2026-01-11T12:33:00Z"
            })
        );
    }

    #[test]
    fn error_response_uses_screaming_snake_case_code() {
        let response = ErrorResponse {
            error_code: ErrorCode::InvalidRequest,
            error_message: "city is required".to_string(),
            timestamp: "2026-01-11T12:32:00Z".to_string(),
        };

        let value = serde_json::to_value(response).expect("serialize error response");
        assert_eq!(
            value,
            json!({
                "error_code": "INVALID_REQUEST",
                "error_message": "city is required",
                "timestamp": "2026-01-11T12:32:00Z"
            })
        );
    }
}
