//! Observers receive snapshots when an observation fires.

use crate::error::ObserverError;

use super::triggers::ThresholdSnapshot;

/// Receiver of threshold notifications.
///
/// Called synchronously from `Sensor::set_reading`. Returning an error (or
/// panicking) is reported back to the caller of `set_reading` and does not
/// stop other observers from being notified.
pub trait ThresholdObserver: Send + Sync {
    fn on_threshold(&self, snapshot: &ThresholdSnapshot) -> Result<(), ObserverError>;
}

/// Observer backed by an infallible closure.
pub struct FnObserver<F>(pub F)
where
    F: Fn(&ThresholdSnapshot) + Send + Sync;

impl<F> ThresholdObserver for FnObserver<F>
where
    F: Fn(&ThresholdSnapshot) + Send + Sync,
{
    fn on_threshold(&self, snapshot: &ThresholdSnapshot) -> Result<(), ObserverError> {
        (self.0)(snapshot);
        Ok(())
    }
}

/// Observer backed by a closure that may fail.
pub struct TryFnObserver<F>(pub F)
where
    F: Fn(&ThresholdSnapshot) -> Result<(), ObserverError> + Send + Sync;

impl<F> ThresholdObserver for TryFnObserver<F>
where
    F: Fn(&ThresholdSnapshot) -> Result<(), ObserverError> + Send + Sync,
{
    fn on_threshold(&self, snapshot: &ThresholdSnapshot) -> Result<(), ObserverError> {
        (self.0)(snapshot)
    }
}
