//! Deterministic fallback used when no trained artifact loads.
//!
//! Formula:
//! `usage = 200 + 5·temperature + 2·occupancy + 20·is_weekend + 10·sin(2π·(hour − 12)/24)`
//!
//! The dashboard applies the same formula client-side when the service is
//! unreachable, so the constants must not drift.

use crate::forecast::model::{ForecastInput, ForecastModel};
use std::f64::consts::PI;

pub const MODEL_TYPE: &str = "rule-based";

pub const BASE_LOAD_KW: f64 = 200.0;
pub const TEMPERATURE_KW_PER_C: f64 = 5.0;
pub const OCCUPANCY_KW_PER_PERSON: f64 = 2.0;
pub const WEEKEND_UPLIFT_KW: f64 = 20.0;
pub const HOURLY_AMPLITUDE_KW: f64 = 10.0;

pub fn rule_based_usage(hour: f64, temperature_c: f64, occupancy: f64, is_weekend: bool) -> f64 {
    let base = BASE_LOAD_KW;
    let temp_component = TEMPERATURE_KW_PER_C * temperature_c;
    let occ_component = OCCUPANCY_KW_PER_PERSON * occupancy;
    let weekend_component = WEEKEND_UPLIFT_KW * if is_weekend { 1.0 } else { 0.0 };
    // Zero at noon.
    let hour_component = HOURLY_AMPLITUDE_KW * (2.0 * PI * (hour - 12.0) / 24.0).sin();
    base + temp_component + occ_component + weekend_component + hour_component
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedModel;

impl ForecastModel for RuleBasedModel {
    fn predict(&self, input: &ForecastInput) -> f64 {
        rule_based_usage(
            f64::from(input.hour),
            input.temperature_c,
            f64::from(input.occupancy),
            input.is_weekend,
        )
    }

    fn model_type(&self) -> &str {
        MODEL_TYPE
    }
}
