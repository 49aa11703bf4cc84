//! Threshold and snapshot types for the monitor subsystem.
//!
//! These types are serializable so thresholds can be declared in configuration
//! and snapshots can be forwarded by observers unchanged.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::scale::TemperatureScale;

/// Unique identifier for an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationId(Uuid);

impl ObservationId {
    /// Create a new random observation id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of change an observation watches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Fires when the reading is at or above the threshold.
    Rise,
    /// Fires when the reading is at or below the threshold.
    Drop,
}

impl Direction {
    /// Both directions, in dispatch order.
    pub const ALL: [Self; 2] = [Self::Drop, Self::Rise];

    /// Comparison applied as `cmp(reading, threshold)`.
    #[must_use]
    pub const fn comparator(self) -> fn(f64, f64) -> bool {
        match self {
            Self::Rise => at_or_above,
            Self::Drop => at_or_below,
        }
    }

    /// Whether `reading` has reached `threshold` in this direction.
    #[must_use]
    pub fn reached(self, reading: f64, threshold: f64) -> bool {
        (self.comparator())(reading, threshold)
    }
}

fn at_or_above(reading: f64, threshold: f64) -> bool {
    reading >= threshold
}

fn at_or_below(reading: f64, threshold: f64) -> bool {
    reading <= threshold
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rise => write!(f, "rise"),
            Self::Drop => write!(f, "drop"),
        }
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rise" | "up" => Ok(Self::Rise),
            "drop" | "down" => Ok(Self::Drop),
            _ => Err(ValidationError::InvalidDirection {
                value: s.to_string(),
            }),
        }
    }
}

/// A request to watch a threshold.
///
/// `scale` is optional; when absent the threshold is read in the sensor's
/// native scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub direction: Direction,
    pub name: String,
    pub threshold: f64,
    #[serde(default)]
    pub sensitivity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<TemperatureScale>,
}

impl ThresholdSpec {
    /// A threshold with zero sensitivity in the sensor's native scale.
    #[must_use]
    pub fn new(direction: Direction, name: impl Into<String>, threshold: f64) -> Self {
        Self {
            direction,
            name: name.into(),
            threshold,
            sensitivity: 0.0,
            scale: None,
        }
    }

    /// Shorthand for `new(Direction::Rise, ..)`.
    #[must_use]
    pub fn rise(name: impl Into<String>, threshold: f64) -> Self {
        Self::new(Direction::Rise, name, threshold)
    }

    /// Shorthand for `new(Direction::Drop, ..)`.
    #[must_use]
    pub fn drop(name: impl Into<String>, threshold: f64) -> Self {
        Self::new(Direction::Drop, name, threshold)
    }

    #[must_use]
    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    #[must_use]
    pub fn in_scale(mut self, scale: TemperatureScale) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Check the threshold can be registered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyThresholdName);
        }
        if !self.threshold.is_finite() {
            return Err(ValidationError::NonFiniteThreshold {
                value: self.threshold,
            });
        }
        if !self.sensitivity.is_finite() || self.sensitivity < 0.0 {
            return Err(ValidationError::InvalidSensitivity {
                value: self.sensitivity,
            });
        }
        Ok(())
    }
}

/// Public state of an observation handed to its observer when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSnapshot {
    pub observation_id: ObservationId,
    pub direction: Direction,
    pub name: String,
    pub threshold: f64,
    pub scale: TemperatureScale,
    pub sensitivity: f64,
    /// Value of the previous notification; `None` on the first one.
    pub last_notified: Option<f64>,
    pub current_reading: f64,
    pub notified_at: DateTime<Utc>,
}

impl ThresholdSnapshot {
    /// Whether this is the observation's first notification.
    #[must_use]
    pub const fn is_first(&self) -> bool {
        self.last_notified.is_none()
    }

    /// Change since the previous notification.
    #[must_use]
    pub fn delta(&self) -> Option<f64> {
        self.last_notified.map(|last| self.current_reading - last)
    }
}
