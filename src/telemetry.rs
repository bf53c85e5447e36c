//! In-process synthetic telemetry source.
//!
//! Mimics a store's sensor gateway: occupancy follows opening hours and the
//! weather, power draw follows occupancy and HVAC load. Snapshots go through
//! [`SensorStateStore::replace`](crate::state::SensorStateStore::replace)
//! exactly like an external `/sensor_update`.

use crate::error::AppError;
use crate::state::{AppState, SensorSnapshot};
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};

const BASE_POWER_KW: f64 = 250.0;
const IDEAL_TEMPERATURE_C: f64 = 22.0;
const HVAC_KW_PER_DEGREE: f64 = 15.0;
const MAX_HVAC_KW: f64 = 200.0;
const KW_PER_PERSON: f64 = 1.2;
const MIN_POWER_KW: f64 = 200.0;
const MAX_POWER_KW: f64 = 800.0;

fn base_occupancy<R: Rng + ?Sized>(rng: &mut R, hour: u8) -> i64 {
    match hour {
        8..=11 => 120 + rng.random_range(-30..=30),
        13..=16 => 100 + rng.random_range(-25..=25),
        18..=21 => 160 + rng.random_range(-40..=40),
        6..=23 => 60 + rng.random_range(-20..=20),
        _ => 0,
    }
}

/// Extreme weather keeps shoppers away, mild weather brings more in.
fn weather_factor(temperature_c: f64) -> f64 {
    if !(5.0..=35.0).contains(&temperature_c) {
        0.7
    } else if (15.0..=25.0).contains(&temperature_c) {
        1.2
    } else {
        1.0
    }
}

pub fn generate_snapshot<R: Rng + ?Sized>(
    rng: &mut R,
    hour: u8,
    temperature_c: f64,
    timestamp: String,
) -> SensorSnapshot {
    let base = base_occupancy(rng, hour) as f64;
    let noise = f64::from(rng.random_range(-10..=10_i32));
    let occupancy = ((base * weather_factor(temperature_c) + noise).trunc() as i64).max(0);

    let hvac_kw = ((temperature_c - IDEAL_TEMPERATURE_C).abs() * HVAC_KW_PER_DEGREE).min(MAX_HVAC_KW);
    let jitter = f64::from(rng.random_range(-20..=20_i32));
    let power_kw = BASE_POWER_KW + hvac_kw + occupancy as f64 * KW_PER_PERSON + jitter;
    let power_kw = ((power_kw * 100.0).round() / 100.0).clamp(MIN_POWER_KW, MAX_POWER_KW);

    SensorSnapshot::from_value(json!({
        "occupancy": occupancy,
        "power_kW": power_kw,
        "temperature": (temperature_c * 10.0).round() / 10.0,
        "timestamp": timestamp,
    }))
}

/// Generates one snapshot for the current time and publishes it.
pub async fn run_feed_cycle(state: &AppState) -> Result<SensorSnapshot, AppError> {
    let temperature_c = state.weather.get_temperature().await;
    let now = OffsetDateTime::now_utc();
    let timestamp = now
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string());
    let snapshot = {
        let mut rng = rand::rng();
        generate_snapshot(&mut rng, now.hour(), temperature_c, timestamp)
    };
    state.sensors.replace(snapshot.clone())?;
    debug!(
        occupancy = snapshot.occupancy(),
        power_kw = snapshot.current_power_kw(),
        temperature_c,
        "Synthetic sensor update"
    );
    Ok(snapshot)
}

pub fn spawn_feed(
    state: Arc<AppState>,
    interval: Duration,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    info!(
        interval_ms = interval.as_millis() as u64,
        "Starting synthetic telemetry feed"
    );
    tokio::spawn(async move {
        while !stop.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();

            if let Err(e) = run_feed_cycle(&state).await {
                warn!("Error publishing synthetic telemetry: {}", e);
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::rule_based::RuleBasedModel;
    use crate::weather::WeatherClient;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn generate(seed: u64, hour: u8, temperature_c: f64) -> SensorSnapshot {
        let mut rng = StdRng::seed_from_u64(seed);
        generate_snapshot(&mut rng, hour, temperature_c, "2025-07-09T12:00:00Z".to_string())
    }

    #[test]
    fn closed_hours_have_little_or_no_occupancy() {
        for seed in 0..50 {
            for hour in [0, 3, 5] {
                let snapshot = generate(seed, hour, 22.0);
                assert!(snapshot.occupancy() <= 10, "hour {hour}: {}", snapshot.occupancy());
            }
        }
    }

    #[test]
    fn evening_peak_is_busier_than_night() {
        for seed in 0..50 {
            let evening = generate(seed, 19, 20.0);
            // (160 - 40) * 1.2 - 10
            assert!(evening.occupancy() >= 134, "seed {seed}: {}", evening.occupancy());
        }
    }

    #[test]
    fn power_stays_within_bounds() {
        for seed in 0..50 {
            for (hour, temperature) in [(2, 22.0), (19, 45.0), (10, -15.0), (14, 18.0)] {
                let power = generate(seed, hour, temperature).current_power_kw();
                assert!((200.0..=800.0).contains(&power), "power {power}");
            }
        }
    }

    #[test]
    fn snapshot_carries_rounded_temperature_and_timestamp() {
        let snapshot = generate(7, 12, 21.37);

        assert_eq!(snapshot.temperature_c(), Some(21.4));
        assert_eq!(snapshot.timestamp(), Some("2025-07-09T12:00:00Z"));
        assert!(snapshot.power_kw().is_some());
    }

    #[test]
    fn weather_factor_matches_comfort_bands() {
        assert_eq!(weather_factor(-2.0), 0.7);
        assert_eq!(weather_factor(36.0), 0.7);
        assert_eq!(weather_factor(10.0), 1.0);
        assert_eq!(weather_factor(20.0), 1.2);
        assert_eq!(weather_factor(30.0), 1.0);
    }

    #[tokio::test]
    async fn feed_cycle_replaces_snapshot() -> Result<(), AppError> {
        let weather = WeatherClient::new(
            None,
            "Darbhanga",
            Duration::from_secs(300),
            Duration::from_secs(5),
        );
        let state = AppState::new(weather, Arc::new(RuleBasedModel));

        let published = run_feed_cycle(&state).await?;

        let stored = state.sensors.read()?;
        assert_eq!(*stored, published);
        assert_eq!(stored.temperature_c(), Some(22.0));
        Ok(())
    }
}
