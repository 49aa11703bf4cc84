//! Threshold decision logic for the monitor subsystem.
//!
//! The matcher decides, for one observation and one incoming reading, whether
//! the observation must be notified. It is pure: state lives with the
//! observation and is committed by the dispatcher.

use serde::{Deserialize, Serialize};

use super::triggers::Direction;

/// Value of the last notification sent for an observation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum LastNotified {
    /// No notification has fired yet.
    #[default]
    Never,
    /// The reading of the most recent notification.
    At(f64),
}

impl LastNotified {
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Never => None,
            Self::At(v) => Some(v),
        }
    }

    #[must_use]
    pub const fn is_never(self) -> bool {
        matches!(self, Self::Never)
    }
}

/// Why a reading did not notify.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hold {
    ThresholdNotReached,
    /// Reading equals the last notified value.
    Unchanged,
    /// Moved less than the sensitivity band since the last notification.
    WithinSensitivity { delta: f64 },
}

/// Outcome of evaluating one reading against one observation.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Notify { previous: LastNotified },
    Hold(Hold),
}

impl Decision {
    #[must_use]
    pub const fn is_notify(&self) -> bool {
        matches!(self, Self::Notify { .. })
    }
}

/// Parameters of an observation the matcher needs.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdGate {
    pub direction: Direction,
    pub threshold: f64,
    pub sensitivity: f64,
}

impl ThresholdGate {
    /// Decide whether `reading` notifies given the observation's last
    /// notification.
    ///
    /// Fires iff the threshold is reached in `direction` and either nothing
    /// has been notified yet, or the reading differs from the last notified
    /// value by at least `sensitivity`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn evaluate(&self, last: LastNotified, reading: f64) -> Decision {
        if !self.direction.reached(reading, self.threshold) {
            return Decision::Hold(Hold::ThresholdNotReached);
        }

        match last {
            LastNotified::Never => Decision::Notify { previous: last },
            LastNotified::At(prev) if reading == prev => Decision::Hold(Hold::Unchanged),
            LastNotified::At(prev) => {
                let delta = (reading - prev).abs();
                if delta >= self.sensitivity {
                    Decision::Notify { previous: last }
                } else {
                    Decision::Hold(Hold::WithinSensitivity { delta })
                }
            }
        }
    }
}
