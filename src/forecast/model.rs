//! Forecast model trait shared by the trained and rule-based predictors.
//!
//! One implementation is chosen at startup (see `forecast::select_model`) and
//! kept for the lifetime of the process.

/// Inputs for a single usage forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastInput {
    /// Hour of day, 0-23.
    pub hour: u8,
    pub temperature_c: f64,
    pub occupancy: u32,
    pub is_weekend: bool,
}

impl ForecastInput {
    /// Number of features a trained artifact must accept.
    pub const FEATURE_COUNT: usize = 4;

    /// Feature vector in training order: `[hour, temperature, occupancy, is_weekend]`.
    pub fn features(&self) -> [f64; Self::FEATURE_COUNT] {
        [
            f64::from(self.hour),
            self.temperature_c,
            f64::from(self.occupancy),
            if self.is_weekend { 1.0 } else { 0.0 },
        ]
    }
}

/// Trait for usage predictors.
pub trait ForecastModel: Send + Sync + std::fmt::Debug {
    /// Predicted usage in kW.
    fn predict(&self, input: &ForecastInput) -> f64;

    /// Tag reported with every prediction (`real`, `synthetic` or `rule-based`).
    fn model_type(&self) -> &str;
}
