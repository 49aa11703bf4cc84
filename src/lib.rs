//! # thermowatch - threshold notifications for a temperature sensor
//!
//! A `Sensor` holds the latest reading of one physical thing. Clients register
//! named thresholds ("rise above 100", "drop below 0") with a sensitivity band
//! and are called back when a new reading crosses the threshold in the
//! requested direction. The sensitivity band keeps values hovering near the
//! threshold from notifying over and over.
//!
//! ## Core Concepts
//!
//! - **Reading**: the current scalar value and its scale
//! - **Observation**: a threshold, a direction, a sensitivity and an observer
//! - **Subscription**: the handle that cancels one observation
//! - **Snapshot**: what an observer receives when its observation fires
//!
//! ## Usage
//!
//! ```rust
//! use thermowatch::{Direction, Sensor, TemperatureScale};
//!
//! let sensor = Sensor::new(TemperatureScale::Celsius);
//! let boiling = sensor
//!     .notify_on(Direction::Rise, "boiling", 100.0, 10.0, |snapshot| {
//!         println!("{} reached {}", snapshot.name, snapshot.current_reading);
//!     })
//!     .unwrap();
//!
//! sensor.set_reading(105.0).unwrap(); // fires
//! sensor.set_reading(112.0).unwrap(); // within the 10 degree band, held
//! sensor.set_reading(115.0).unwrap(); // fires
//!
//! boiling.release();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod monitor;
pub mod reading;
pub mod scale;
pub mod sensor;

// Re-export primary types at crate root for convenience
pub use error::{CallbackFailure, ExecutionError, ObserverError, ThermoError, ThermoResult, ValidationError};
pub use monitor::{
    Direction, FnObserver, LastNotified, ObservationId, Subscription, SubscriptionGuard, ThresholdObserver,
    ThresholdSnapshot, ThresholdSpec, ThresholdStream, TryFnObserver,
};
pub use reading::Reading;
pub use scale::TemperatureScale;
pub use sensor::{DispatchReport, Sensor, SensorConfig};
