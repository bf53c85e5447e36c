use crate::weather::{CurrentConditions, WeatherError, WeatherProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// OpenWeatherMap "current weather" endpoint, metric units.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_key,
            base_url,
            http,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, city: &str) -> Result<CurrentConditions, WeatherError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Status(status.as_u16(), truncate_body(&body)));
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)?;
        let main = parsed.main.unwrap_or_default();

        Ok(CurrentConditions {
            temperature_c: main.temp,
            description: parsed.weather.first().map(|w| title_case(&w.description)),
            city: parsed.name.filter(|name| !name.is_empty()),
            humidity: main.humidity,
            feels_like_c: main.feels_like,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    main: Option<OwMain>,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

/// "scattered clouds" -> "Scattered Clouds"
fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use serde_json::json;
    use std::collections::HashMap;
    use std::net::SocketAddr;

    async fn fake_weather(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
        if params.get("appid").map(String::as_str) != Some("test-key") {
            return (
                StatusCode::UNAUTHORIZED,
                axum::Json(json!({"cod": 401, "message": "Invalid API key"})),
            );
        }
        if params.get("units").map(String::as_str) != Some("metric") {
            return (StatusCode::BAD_REQUEST, axum::Json(json!({"cod": 400})));
        }
        match params.get("q").map(String::as_str) {
            Some("Paris") => (
                StatusCode::OK,
                axum::Json(json!({
                    "name": "Arrondissement de Paris",
                    "main": {"temp": 17.3, "feels_like": 16.8, "humidity": 72},
                    "weather": [{"description": "light rain"}]
                })),
            ),
            Some("Nowhere") => (StatusCode::OK, axum::Json(json!({"name": "Nowhere"}))),
            _ => (
                StatusCode::NOT_FOUND,
                axum::Json(json!({"cod": "404", "message": "city not found"})),
            ),
        }
    }

    async fn spawn_fake_provider() -> Result<SocketAddr, std::io::Error> {
        let app = Router::new().route("/data/2.5/weather", get(fake_weather));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(addr)
    }

    fn provider(addr: SocketAddr, api_key: &str) -> Result<OpenWeatherProvider, WeatherError> {
        OpenWeatherProvider::new(
            api_key.to_string(),
            format!("http://{addr}/data/2.5/weather"),
            Duration::from_secs(2),
        )
    }

    #[tokio::test]
    async fn parses_current_conditions() -> Result<(), Box<dyn std::error::Error>> {
        let addr = spawn_fake_provider().await?;

        let conditions = provider(addr, "test-key")?.current("Paris").await?;

        assert_eq!(conditions.temperature_c, Some(17.3));
        assert_eq!(conditions.feels_like_c, Some(16.8));
        assert_eq!(conditions.humidity, Some(72));
        assert_eq!(conditions.description.as_deref(), Some("Light Rain"));
        assert_eq!(conditions.city.as_deref(), Some("Arrondissement de Paris"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_sections_parse_as_absent() -> Result<(), Box<dyn std::error::Error>> {
        let addr = spawn_fake_provider().await?;

        let conditions = provider(addr, "test-key")?.current("Nowhere").await?;

        assert_eq!(conditions.temperature_c, None);
        assert_eq!(conditions.description, None);
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_reported() -> Result<(), Box<dyn std::error::Error>> {
        let addr = spawn_fake_provider().await?;

        let result = provider(addr, "test-key")?.current("Atlantis").await;

        assert!(matches!(result, Err(WeatherError::Status(404, _))));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_provider_hides_credential() -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let result = provider(addr, "secret-key")?.current("Paris").await;

        match result {
            Err(err @ WeatherError::Http(_)) => {
                assert!(!err.to_string().contains("secret-key"));
            }
            other => panic!("expected http error, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn title_case_capitalizes_each_word() {
        assert_eq!(title_case("scattered clouds"), "Scattered Clouds");
        assert_eq!(title_case("HEAVY intensity rain"), "Heavy Intensity Rain");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn truncate_body_limits_length() {
        let long = "x".repeat(250);
        assert_eq!(truncate_body(&long).len(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
