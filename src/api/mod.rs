use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

pub mod handlers;
pub mod responses;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict))
        .route("/sensor_update", post(handlers::sensor_update))
        .route("/current_status", get(handlers::current_status))
        .route("/weather", get(handlers::weather))
        .route("/set_city", post(handlers::set_city))
        .route("/health", get(handlers::health))
        .with_state(state)
}
