//! Error types for thermowatch.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! specific conditions. Validation errors reject an operation before any state
//! changes; execution errors are raised while a reading is dispatched or a
//! stream is drained.

use std::fmt;

use thiserror::Error;

use crate::monitor::triggers::{Direction, ObservationId};

/// Validation errors that occur during input validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unsupported temperature scale '{value}': only Celsius and Fahrenheit are supported")]
    InvalidScale {
        value: String,
    },

    #[error("Unrecognized change direction '{value}': expected 'rise' or 'drop'")]
    InvalidDirection {
        value: String,
    },

    #[error("Reading {value} is not a finite number")]
    NonFiniteReading {
        value: f64,
    },

    #[error("Threshold {value} is not a finite number")]
    NonFiniteThreshold {
        value: f64,
    },

    #[error("Sensitivity {value} must be finite and >= 0")]
    InvalidSensitivity {
        value: f64,
    },

    #[error("Threshold name cannot be empty")]
    EmptyThresholdName,

    #[error("Observation direction {actual} does not match registry direction {expected}")]
    DirectionMismatch {
        expected: Direction,
        actual: Direction,
    },

    #[error("Invalid sensor configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// One observer that failed while a reading was being dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    pub observation_id: ObservationId,
    pub name: String,
    pub direction: Direction,
    pub reason: String,
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} observer '{}' ({}): {}",
            self.direction, self.name, self.observation_id, self.reason
        )
    }
}

/// Execution errors that occur while dispatching or streaming.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    /// At least one observer failed. Every other observation was still
    /// evaluated and notified.
    #[error("{} observer callback(s) failed during dispatch ({notified} notified)", .failures.len())]
    CallbackFailures {
        notified: usize,
        failures: Vec<CallbackFailure>,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

/// Error returned by a fallible observer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ObserverError {
    message: String,
}

impl ObserverError {
    /// Creates an observer error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Top-level error type for thermowatch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ThermoError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ThermoError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Observer failures carried by this error, if it came from a dispatch.
    #[must_use]
    pub fn callback_failures(&self) -> &[CallbackFailure] {
        match self {
            Self::Execution(ExecutionError::CallbackFailures { failures, .. }) => failures,
            _ => &[],
        }
    }
}

/// Result type alias for thermowatch operations.
pub type ThermoResult<T> = Result<T, ThermoError>;
