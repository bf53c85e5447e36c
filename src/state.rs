use crate::error::AppError;
use crate::forecast::model::ForecastModel;
use crate::prediction::PredictionService;
use crate::weather::WeatherClient;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::{Arc, RwLock};

/// The latest sensor reading, stored exactly as the producer sent it.
///
/// The producer is trusted, so no schema is enforced: the accessors default
/// missing or non-numeric fields instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorSnapshot(Value);

impl SensorSnapshot {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// The all-zero/null snapshot served before any update arrives.
    pub fn initial() -> Self {
        Self(json!({
            "occupancy": 0,
            "power_kW": null,
            "temperature": null,
            "timestamp": null,
        }))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn occupancy(&self) -> u64 {
        match self.0.get("occupancy") {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|v| v.is_finite() && *v > 0.0).map(|v| v as u64))
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub fn power_kw(&self) -> Option<f64> {
        self.number("power_kW")
    }

    /// Current draw for capping; absent or non-numeric reads as zero.
    pub fn current_power_kw(&self) -> f64 {
        self.power_kw().unwrap_or(0.0)
    }

    pub fn temperature_c(&self) -> Option<f64> {
        self.number("temperature")
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.0.get("timestamp").and_then(Value::as_str)
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.0
            .get(key)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    }
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

/// Holder for the single latest snapshot.
///
/// Updates swap the whole `Arc`, so readers see either the previous or the
/// new snapshot, never a mix of both.
#[derive(Debug)]
pub struct SensorStateStore {
    current: RwLock<Arc<SensorSnapshot>>,
}

impl SensorStateStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(SensorSnapshot::initial())),
        }
    }

    pub fn replace(&self, snapshot: SensorSnapshot) -> Result<(), AppError> {
        let mut guard = self.current.write().map_err(|_| AppError::StateLock)?;
        *guard = Arc::new(snapshot);
        Ok(())
    }

    pub fn read(&self) -> Result<Arc<SensorSnapshot>, AppError> {
        let guard = self.current.read().map_err(|_| AppError::StateLock)?;
        Ok(Arc::clone(&*guard))
    }
}

impl Default for SensorStateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide state shared by every request handler.
#[derive(Debug)]
pub struct AppState {
    pub sensors: Arc<SensorStateStore>,
    pub weather: Arc<WeatherClient>,
    pub predictor: PredictionService,
}

impl AppState {
    pub fn new(weather: WeatherClient, model: Arc<dyn ForecastModel>) -> Self {
        let sensors = Arc::new(SensorStateStore::new());
        let weather = Arc::new(weather);
        let predictor = PredictionService::new(model, Arc::clone(&weather), Arc::clone(&sensors));
        Self {
            sensors,
            weather,
            predictor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_before_any_update_returns_initial_snapshot() -> Result<(), AppError> {
        let store = SensorStateStore::new();

        let snapshot = store.read()?;

        assert_eq!(*snapshot, SensorSnapshot::initial());
        assert_eq!(snapshot.occupancy(), 0);
        assert_eq!(snapshot.power_kw(), None);
        assert_eq!(snapshot.current_power_kw(), 0.0);
        assert_eq!(snapshot.timestamp(), None);
        Ok(())
    }

    #[test]
    fn replace_swaps_whole_snapshot_without_merging() -> Result<(), AppError> {
        let store = SensorStateStore::new();
        store.replace(SensorSnapshot::from_value(json!({
            "occupancy": 120,
            "power_kW": 412.5,
            "temperature": 31.2,
            "timestamp": "2025-07-09T12:00:00",
        })))?;

        let partial = SensorSnapshot::from_value(json!({ "occupancy": 7 }));
        store.replace(partial.clone())?;

        let snapshot = store.read()?;
        assert_eq!(*snapshot, partial);
        assert_eq!(snapshot.as_value(), &json!({ "occupancy": 7 }));
        assert_eq!(snapshot.power_kw(), None);
        assert_eq!(snapshot.temperature_c(), None);
        Ok(())
    }

    #[test]
    fn accessors_default_malformed_fields() {
        let snapshot = SensorSnapshot::from_value(json!({
            "occupancy": "lots",
            "power_kW": "300",
            "temperature": 18.5,
            "timestamp": 42,
        }));

        assert_eq!(snapshot.occupancy(), 0);
        assert_eq!(snapshot.power_kw(), None);
        assert_eq!(snapshot.current_power_kw(), 0.0);
        assert_eq!(snapshot.temperature_c(), Some(18.5));
        assert_eq!(snapshot.timestamp(), None);
    }

    #[test]
    fn non_object_payload_is_stored_as_is() -> Result<(), AppError> {
        let store = SensorStateStore::new();
        store.replace(SensorSnapshot::from_value(json!([1, 2, 3])))?;

        let snapshot = store.read()?;
        assert_eq!(snapshot.as_value(), &json!([1, 2, 3]));
        assert_eq!(snapshot.occupancy(), 0);
        Ok(())
    }

    #[test]
    fn fractional_and_negative_occupancy_are_defaulted() {
        let fractional = SensorSnapshot::from_value(json!({ "occupancy": 12.7 }));
        let negative = SensorSnapshot::from_value(json!({ "occupancy": -3 }));

        assert_eq!(fractional.occupancy(), 12);
        assert_eq!(negative.occupancy(), 0);
    }

    #[test]
    fn concurrent_readers_never_observe_partial_snapshot() -> Result<(), AppError> {
        let store = Arc::new(SensorStateStore::new());
        let a = SensorSnapshot::from_value(json!({ "occupancy": 1, "power_kW": 100.0 }));
        let b = SensorSnapshot::from_value(json!({ "occupancy": 2, "power_kW": 200.0 }));

        let writer = {
            let store = Arc::clone(&store);
            let (a, b) = (a.clone(), b.clone());
            std::thread::spawn(move || {
                for i in 0..500 {
                    let next = if i % 2 == 0 { a.clone() } else { b.clone() };
                    store.replace(next).expect("replace snapshot");
                }
            })
        };

        for _ in 0..500 {
            let snapshot = store.read()?;
            let seen = (snapshot.occupancy(), snapshot.power_kw());
            assert!(
                seen == (0, None) || seen == (1, Some(100.0)) || seen == (2, Some(200.0)),
                "observed mixed snapshot: {seen:?}"
            );
        }
        writer.join().expect("writer thread");
        Ok(())
    }

    #[test]
    fn read_fails_when_lock_poisoned() {
        let store = Arc::new(SensorStateStore::new());
        let store_for_thread = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = store_for_thread.current.write().expect("lock for poison");
            panic!("poison lock");
        })
        .join();

        assert!(matches!(store.read(), Err(AppError::StateLock)));
    }
}
