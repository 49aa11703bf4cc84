//! Temperature scales and linear conversion between them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Scale a reading or threshold is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureScale {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureScale {
    /// Unit symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    /// Convert a point value expressed in `self` into `target`.
    ///
    /// The same scale returns `value` untouched, so readings in the native
    /// scale are never subject to rounding.
    #[must_use]
    pub fn convert(self, value: f64, target: Self) -> f64 {
        match (self, target) {
            (Self::Celsius, Self::Celsius) | (Self::Fahrenheit, Self::Fahrenheit) => value,
            (Self::Celsius, Self::Fahrenheit) => celsius_to_fahrenheit(value),
            (Self::Fahrenheit, Self::Celsius) => fahrenheit_to_celsius(value),
        }
    }
}

impl fmt::Display for TemperatureScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Celsius => write!(f, "celsius"),
            Self::Fahrenheit => write!(f, "fahrenheit"),
        }
    }
}

impl FromStr for TemperatureScale {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "celsius" | "c" | "°c" => Ok(Self::Celsius),
            "fahrenheit" | "f" | "°f" => Ok(Self::Fahrenheit),
            _ => Err(ValidationError::InvalidScale {
                value: s.to_string(),
            }),
        }
    }
}

/// F = C × 9/5 + 32
#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// C = (F − 32) × 5/9
#[must_use]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}
