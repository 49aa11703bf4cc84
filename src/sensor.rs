//! The sensor: one reading store plus a rise and a drop registry.
//!
//! `Sensor::set_reading` is the dispatch driver. It stores the value, then runs
//! a dispatch pass over the drop registry and one over the rise registry, and
//! returns only after every qualifying observer has run.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExecutionError, ThermoResult, ValidationError};
use crate::monitor::dispatcher::{Observation, ObservationRegistry};
use crate::monitor::observer::{FnObserver, ThresholdObserver};
use crate::monitor::stream::{self, ThresholdStream};
use crate::monitor::subscription::Subscription;
use crate::monitor::triggers::{Direction, ObservationId, ThresholdSnapshot, ThresholdSpec};
use crate::reading::{Reading, ReadingStore};
use crate::scale::TemperatureScale;

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Name used in log fields.
    pub label: String,
    /// Native scale of readings.
    pub scale: TemperatureScale,
    /// Per-stream snapshot buffer capacity.
    pub stream_capacity: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            label: "thermometer".to_string(),
            scale: TemperatureScale::Celsius,
            stream_capacity: 256,
        }
    }
}

impl SensorConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ThermoResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            ValidationError::InvalidConfig {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// Outcome of a successful `set_reading`.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    /// The stored reading.
    pub reading: Reading,
    /// Observations evaluated across both directions.
    pub evaluated: usize,
    /// Observers notified.
    pub notified: usize,
}

/// A single temperature sensor with threshold observations.
#[derive(Debug)]
pub struct Sensor {
    cfg: SensorConfig,
    readings: ReadingStore,
    drops: Arc<ObservationRegistry>,
    rises: Arc<ObservationRegistry>,
}

impl Sensor {
    /// A sensor reading in `scale` with default configuration otherwise.
    #[must_use]
    pub fn new(scale: TemperatureScale) -> Self {
        Self::with_config(SensorConfig {
            scale,
            ..SensorConfig::default()
        })
    }

    #[must_use]
    pub fn with_config(cfg: SensorConfig) -> Self {
        Self {
            readings: ReadingStore::new(cfg.scale),
            drops: ObservationRegistry::new(Direction::Drop),
            rises: ObservationRegistry::new(Direction::Rise),
            cfg,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SensorConfig {
        &self.cfg
    }

    /// Native scale of readings.
    #[must_use]
    pub const fn scale(&self) -> TemperatureScale {
        self.cfg.scale
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.cfg.label
    }

    /// Store a new reading in the native scale and notify every observation
    /// it fires.
    ///
    /// If any observer fails, the others are still notified and the call
    /// returns `ExecutionError::CallbackFailures` listing each failure. The
    /// reading is stored either way.
    pub fn set_reading(&self, value: f64) -> ThermoResult<DispatchReport> {
        let reading = self.readings.set(value)?;
        debug!(sensor = %self.cfg.label, reading = %reading, "reading received");

        let mut evaluated = 0;
        let mut notified = 0;
        let mut failures = Vec::new();
        for direction in Direction::ALL {
            let pass = self.registry(direction).dispatch(&reading);
            evaluated += pass.evaluated;
            notified += pass.notified;
            failures.extend(pass.failures);
        }

        debug!(
            sensor = %self.cfg.label,
            evaluated,
            notified,
            failed = failures.len(),
            "reading dispatched"
        );

        if !failures.is_empty() {
            return Err(ExecutionError::CallbackFailures { notified, failures }.into());
        }

        Ok(DispatchReport {
            reading,
            evaluated,
            notified,
        })
    }

    /// Current reading in `scale`, or `None` before the first reading.
    pub fn reading(&self, scale: TemperatureScale) -> ThermoResult<Option<f64>> {
        self.readings.get(scale)
    }

    /// Current reading with its native scale and timestamp.
    pub fn latest(&self) -> ThermoResult<Option<Reading>> {
        self.readings.latest()
    }

    /// Register `observer` for `spec`.
    ///
    /// The observation is not evaluated against the current reading; the
    /// next `set_reading` is the first chance for it to fire.
    pub fn register<O>(&self, spec: ThresholdSpec, observer: O) -> ThermoResult<Subscription>
    where
        O: ThresholdObserver + 'static,
    {
        self.register_boxed(ObservationId::new(), spec, Box::new(observer))
    }

    /// Call `callback` whenever the reading crosses `threshold` in
    /// `direction`, gated by `sensitivity`.
    pub fn notify_on<F>(
        &self,
        direction: Direction,
        name: impl Into<String>,
        threshold: f64,
        sensitivity: f64,
        callback: F,
    ) -> ThermoResult<Subscription>
    where
        F: Fn(&ThresholdSnapshot) + Send + Sync + 'static,
    {
        let spec = ThresholdSpec::new(direction, name, threshold).with_sensitivity(sensitivity);
        self.register(spec, FnObserver(callback))
    }

    /// Register `spec` and receive its snapshots on a stream.
    ///
    /// Dropping the stream releases the observation.
    pub fn subscribe(&self, spec: ThresholdSpec) -> ThermoResult<(Subscription, ThresholdStream)> {
        let id = ObservationId::new();
        let registry = Arc::downgrade(self.registry(spec.direction));
        let (observer, stream) = stream::channel(id, self.cfg.stream_capacity, registry);
        let subscription = self.register_boxed(id, spec, Box::new(observer))?;
        Ok((subscription, stream))
    }

    /// Number of observations registered for `direction`.
    #[must_use]
    pub fn observation_count(&self, direction: Direction) -> usize {
        self.registry(direction).len()
    }

    /// The registered observation with `id`, if any.
    #[must_use]
    pub fn observation(&self, id: ObservationId) -> Option<Arc<Observation>> {
        Direction::ALL
            .into_iter()
            .find_map(|direction| self.registry(direction).get(id))
    }

    fn registry(&self, direction: Direction) -> &Arc<ObservationRegistry> {
        match direction {
            Direction::Drop => &self.drops,
            Direction::Rise => &self.rises,
        }
    }

    fn register_boxed(
        &self,
        id: ObservationId,
        spec: ThresholdSpec,
        observer: Box<dyn ThresholdObserver>,
    ) -> ThermoResult<Subscription> {
        let observation = Observation::with_id(id, spec, self.cfg.scale, observer)?;
        self.registry(observation.direction()).add(Arc::new(observation))
    }
}
