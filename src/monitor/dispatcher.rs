//! Observation registry and dispatch pass.
//!
//! Each sensor owns one registry per direction. A registry keeps its
//! observations in registration order behind a mutex that only guards list
//! membership; observers are always invoked with the lock released so they
//! may register or release from inside a callback.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, trace, warn};

use crate::error::{CallbackFailure, ThermoResult, ValidationError};
use crate::reading::Reading;
use crate::scale::TemperatureScale;

use super::matcher::{Decision, LastNotified, ThresholdGate};
use super::observer::ThresholdObserver;
use super::subscription::Subscription;
use super::triggers::{Direction, ObservationId, ThresholdSnapshot, ThresholdSpec};

#[derive(Debug, Default)]
struct ObservationState {
    last_notified: LastNotified,
    current_reading: Option<f64>,
    notifications: u64,
}

/// One registered watch: a threshold gate, its mutable notification state and
/// the observer to call.
pub struct Observation {
    id: ObservationId,
    name: String,
    scale: TemperatureScale,
    gate: ThresholdGate,
    observer: Box<dyn ThresholdObserver>,
    state: Mutex<ObservationState>,
    active: AtomicBool,
}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observation")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("scale", &self.scale)
            .field("gate", &self.gate)
            .field("state", &self.state)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl Observation {
    /// Build an observation from a validated spec.
    ///
    /// `native_scale` is used when the spec does not name a scale.
    pub fn new(
        spec: ThresholdSpec,
        native_scale: TemperatureScale,
        observer: Box<dyn ThresholdObserver>,
    ) -> Result<Self, ValidationError> {
        Self::with_id(ObservationId::new(), spec, native_scale, observer)
    }

    pub(crate) fn with_id(
        id: ObservationId,
        spec: ThresholdSpec,
        native_scale: TemperatureScale,
        observer: Box<dyn ThresholdObserver>,
    ) -> Result<Self, ValidationError> {
        spec.validate()?;

        Ok(Self {
            id,
            scale: spec.scale.unwrap_or(native_scale),
            gate: ThresholdGate {
                direction: spec.direction,
                threshold: spec.threshold,
                sensitivity: spec.sensitivity,
            },
            name: spec.name,
            observer,
            state: Mutex::new(ObservationState::default()),
            active: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub const fn id(&self) -> ObservationId {
        self.id
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.gate.direction
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.gate.threshold
    }

    #[must_use]
    pub const fn sensitivity(&self) -> f64 {
        self.gate.sensitivity
    }

    #[must_use]
    pub const fn scale(&self) -> TemperatureScale {
        self.scale
    }

    #[must_use]
    pub fn last_notified(&self) -> LastNotified {
        self.state().last_notified
    }

    /// Reading of the most recent notification, in this observation's scale.
    #[must_use]
    pub fn current_reading(&self) -> Option<f64> {
        self.state().current_reading
    }

    #[must_use]
    pub fn notifications(&self) -> u64 {
        self.state().notifications
    }

    /// Whether the observation is currently held by a registry.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    // State updates never panic halfway, so a poisoned guard still holds a
    // consistent value.
    fn state(&self) -> MutexGuard<'_, ObservationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide on `reading` and, when it notifies, commit the new state.
    ///
    /// The returned snapshot carries the pre-update `last_notified`. A
    /// cancelled observation never notifies: `active` is rechecked under the
    /// state lock, which `ObservationRegistry::cancel` also takes.
    fn evaluate(&self, reading: &Reading) -> Option<ThresholdSnapshot> {
        let value = reading.in_scale(self.scale);
        let mut state = self.state();
        if !self.is_active() {
            return None;
        }

        match self.gate.evaluate(state.last_notified, value) {
            Decision::Hold(reason) => {
                trace!(
                    observation_id = %self.id,
                    name = %self.name,
                    value,
                    ?reason,
                    "observation held"
                );
                None
            }
            Decision::Notify { previous } => {
                state.current_reading = Some(value);
                state.last_notified = LastNotified::At(value);
                state.notifications += 1;

                Some(ThresholdSnapshot {
                    observation_id: self.id,
                    direction: self.gate.direction,
                    name: self.name.clone(),
                    threshold: self.gate.threshold,
                    scale: self.scale,
                    sensitivity: self.gate.sensitivity,
                    last_notified: previous.value(),
                    current_reading: value,
                    notified_at: Utc::now(),
                })
            }
        }
    }

    fn notify(&self, snapshot: &ThresholdSnapshot) -> Result<(), CallbackFailure> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.observer.on_threshold(snapshot)));

        let reason = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => err.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        Err(CallbackFailure {
            observation_id: self.id,
            name: self.name.clone(),
            direction: self.gate.direction,
            reason,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("observer panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("observer panicked: {msg}")
    } else {
        "observer panicked".to_string()
    }
}

/// Result of one dispatch pass over a registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassOutcome {
    /// Observations evaluated against the reading.
    pub evaluated: usize,
    /// Observers notified successfully.
    pub notified: usize,
    /// Observers that returned an error or panicked.
    pub failures: Vec<CallbackFailure>,
}

/// Observations registered for one direction.
///
/// The entry list is only ever changed by a single push or remove, so a
/// poisoned lock still guards a consistent list and every method recovers it.
#[derive(Debug)]
pub struct ObservationRegistry {
    direction: Direction,
    entries: Mutex<Vec<Arc<Observation>>>,
}

impl ObservationRegistry {
    #[must_use]
    pub fn new(direction: Direction) -> Arc<Self> {
        Arc::new(Self {
            direction,
            entries: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Insert `observation` unless it is already registered.
    ///
    /// A duplicate add leaves the registry unchanged and returns a handle
    /// bound to the existing entry.
    pub fn add(self: &Arc<Self>, observation: Arc<Observation>) -> ThermoResult<Subscription> {
        if observation.direction() != self.direction {
            return Err(ValidationError::DirectionMismatch {
                expected: self.direction,
                actual: observation.direction(),
            }
            .into());
        }

        let id = observation.id();
        {
            let mut entries = self.entries();
            if entries.iter().any(|e| e.id() == id) {
                debug!(observation_id = %id, "observation already registered");
            } else {
                observation.active.store(true, Ordering::Release);
                entries.push(Arc::clone(&observation));
                info!(
                    observation_id = %id,
                    direction = %self.direction,
                    name = %observation.name(),
                    threshold = observation.threshold(),
                    sensitivity = observation.sensitivity(),
                    "observation registered"
                );
            }
        }

        Ok(Subscription::new(id, self.direction, Arc::downgrade(self)))
    }

    /// Remove the observation with `id`. Returns whether it was present.
    ///
    /// Once this returns, no evaluation that has not yet committed can notify
    /// the observation. A snapshot already committed by a concurrent pass may
    /// still be delivered.
    pub fn cancel(&self, id: ObservationId) -> bool {
        let removed = {
            let mut entries = self.entries();
            let Some(pos) = entries.iter().position(|e| e.id() == id) else {
                return false;
            };
            entries.remove(pos)
        };

        let _state = removed.state();
        removed.active.store(false, Ordering::Release);
        true
    }

    #[must_use]
    pub fn contains(&self, id: ObservationId) -> bool {
        self.entries().iter().any(|e| e.id() == id)
    }

    #[must_use]
    pub fn get(&self, id: ObservationId) -> Option<Arc<Observation>> {
        self.entries().iter().find(|e| e.id() == id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate every registered observation against `reading` and notify the
    /// ones that fire.
    ///
    /// Observations released before their turn are skipped. A failing observer
    /// is recorded in the outcome and the pass continues.
    pub fn dispatch(&self, reading: &Reading) -> PassOutcome {
        let entries: Vec<Arc<Observation>> = self.entries().clone();

        let mut outcome = PassOutcome::default();
        for observation in &entries {
            if !observation.is_active() {
                continue;
            }
            outcome.evaluated += 1;

            let Some(snapshot) = observation.evaluate(reading) else {
                continue;
            };

            match observation.notify(&snapshot) {
                Ok(()) => outcome.notified += 1,
                Err(failure) => {
                    warn!(
                        observation_id = %failure.observation_id,
                        direction = %failure.direction,
                        name = %failure.name,
                        reason = %failure.reason,
                        "observer failed"
                    );
                    outcome.failures.push(failure);
                }
            }
        }

        outcome
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Arc<Observation>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
