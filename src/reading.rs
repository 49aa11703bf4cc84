//! Reading store.
//!
//! Holds the most recent scalar reading of a sensor together with the scale it
//! was recorded in. No history is retained: every `set` overwrites.

use std::fmt;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ThermoError, ThermoResult, ValidationError};
use crate::scale::TemperatureScale;

/// A single recorded value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    pub scale: TemperatureScale,
    pub recorded_at: DateTime<Utc>,
}

impl Reading {
    /// Records `value` now.
    #[must_use]
    pub fn new(value: f64, scale: TemperatureScale) -> Self {
        Self {
            value,
            scale,
            recorded_at: Utc::now(),
        }
    }

    /// The value expressed in `target`.
    #[must_use]
    pub fn in_scale(&self, target: TemperatureScale) -> f64 {
        self.scale.convert(self.value, target)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.scale.symbol())
    }
}

fn lock_err(context: &'static str) -> ThermoError {
    ThermoError::internal(format!("poisoned lock: {context}"))
}

/// Current reading of one sensor, in its native scale.
#[derive(Debug)]
pub struct ReadingStore {
    scale: TemperatureScale,
    current: RwLock<Option<Reading>>,
}

impl ReadingStore {
    #[must_use]
    pub fn new(scale: TemperatureScale) -> Self {
        Self {
            scale,
            current: RwLock::new(None),
        }
    }

    /// Native scale of stored readings.
    #[must_use]
    pub const fn scale(&self) -> TemperatureScale {
        self.scale
    }

    /// Overwrite the current reading.
    ///
    /// Any finite value is accepted. NaN and infinities are rejected and leave
    /// the previous reading in place.
    pub fn set(&self, value: f64) -> ThermoResult<Reading> {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteReading { value }.into());
        }

        let reading = Reading::new(value, self.scale);
        let mut guard = self.current.write().map_err(|_| lock_err("readings"))?;
        *guard = Some(reading);
        Ok(reading)
    }

    /// The most recent reading, if any.
    pub fn latest(&self) -> ThermoResult<Option<Reading>> {
        let guard = self.current.read().map_err(|_| lock_err("readings"))?;
        Ok(*guard)
    }

    /// The most recent value converted into `target`, or `None` before the
    /// first `set`.
    pub fn get(&self, target: TemperatureScale) -> ThermoResult<Option<f64>> {
        Ok(self.latest()?.map(|r| r.in_scale(target)))
    }
}
