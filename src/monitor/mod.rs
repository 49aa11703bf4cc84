//! MONITOR subsystem: threshold observations and their dispatch.
//!
//! Observations are registered per direction, evaluated against every new
//! reading and notified synchronously. A `Subscription` cancels one
//! observation; a `ThresholdStream` receives snapshots over a channel instead
//! of a callback.

/// Observation registry and dispatch pass.
pub mod dispatcher;
/// Threshold decision logic.
pub mod matcher;
/// Observer trait and closure adapters.
pub mod observer;
/// Snapshot stream handle.
pub mod stream;
/// Cancellation handles.
pub mod subscription;
/// Threshold and snapshot type definitions.
pub mod triggers;

pub use dispatcher::{Observation, ObservationRegistry, PassOutcome};
pub use matcher::{Decision, Hold, LastNotified, ThresholdGate};
pub use observer::{FnObserver, ThresholdObserver, TryFnObserver};
pub use stream::ThresholdStream;
pub use subscription::{Subscription, SubscriptionGuard};
pub use triggers::{Direction, ObservationId, ThresholdSnapshot, ThresholdSpec};
