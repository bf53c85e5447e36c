pub mod api;
pub mod config;
pub mod error;
pub mod forecast;
pub mod prediction;
pub mod state;
pub mod telemetry;
pub mod weather;
