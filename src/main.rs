use power_forecast::{api, config, forecast, state, telemetry, weather};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn init_tracing(level: tracing::Level) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; the credential may come from the real environment.
    let _ = dotenvy::dotenv();
    let config = config::load_default()?;
    init_tracing(config.log_level());
    tracing::info!(app = %config.app.name, "power-forecast starting");

    let model = forecast::select_model(&config.model_candidates());
    tracing::info!(model_type = model.model_type(), "Forecast model selected");

    let weather = weather::WeatherClient::from_config(&config, config::weather_api_key())?;
    tracing::info!(
        city = %weather.city(),
        configured = weather.is_configured(),
        "Weather client ready"
    );

    let state = Arc::new(state::AppState::new(weather, model));

    let stop_flag = Arc::new(AtomicBool::new(false));
    let _feed_handle = if config.telemetry_enabled() {
        Some(telemetry::spawn_feed(
            Arc::clone(&state),
            config.telemetry_interval(),
            Arc::clone(&stop_flag),
        ))
    } else {
        tracing::info!("Synthetic telemetry disabled, waiting for /sensor_update");
        None
    };

    let app = api::router(Arc::clone(&state));
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    stop_flag.store(true, Ordering::Relaxed);

    Ok(())
}
