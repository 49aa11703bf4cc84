use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

use tracing::info;

use super::dispatcher::ObservationRegistry;
use super::triggers::{Direction, ObservationId};

/// Cancellation handle for a registered observation.
///
/// The handle holds only a weak reference to the registry, so it may outlive
/// the sensor. Dropping a `Subscription` does not release it; call
/// [`Subscription::release`] or convert it with [`Subscription::into_guard`].
#[derive(Debug)]
pub struct Subscription {
    observation_id: ObservationId,
    direction: Direction,
    registry: Weak<ObservationRegistry>,
    released: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(
        observation_id: ObservationId,
        direction: Direction,
        registry: Weak<ObservationRegistry>,
    ) -> Self {
        Self {
            observation_id,
            direction,
            registry,
            released: AtomicBool::new(false),
        }
    }

    /// The observation this handle is bound to.
    #[must_use]
    pub const fn observation_id(&self) -> ObservationId {
        self.observation_id
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the bound observation is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.released.load(Ordering::Acquire)
            && self
                .registry
                .upgrade()
                .is_some_and(|r| r.contains(self.observation_id))
    }

    /// Stop all future notifications to the bound observation.
    ///
    /// Idempotent. A no-op if the observation is already gone or the sensor
    /// has been dropped. A snapshot that a concurrent `set_reading` committed
    /// before this call may still be delivered once.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if registry.cancel(self.observation_id) {
            info!(
                observation_id = %self.observation_id,
                direction = %self.direction,
                "observation released"
            );
        }
    }

    /// Release automatically when the returned guard is dropped.
    #[must_use]
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard(self)
    }
}

/// A [`Subscription`] that releases itself on drop.
#[derive(Debug)]
pub struct SubscriptionGuard(Subscription);

impl Deref for SubscriptionGuard {
    type Target = Subscription;

    fn deref(&self) -> &Subscription {
        &self.0
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::monitor::dispatcher::Observation;
    use crate::monitor::observer::FnObserver;
    use crate::monitor::triggers::{ThresholdSnapshot, ThresholdSpec};
    use crate::scale::TemperatureScale;

    fn registered(registry: &Arc<ObservationRegistry>) -> Subscription {
        let obs = Observation::new(
            ThresholdSpec::drop("freezing", 0.0),
            TemperatureScale::Celsius,
            Box::new(FnObserver(|_: &ThresholdSnapshot| {})),
        )
        .unwrap();
        registry.add(Arc::new(obs)).unwrap()
    }

    #[test]
    fn release_twice_is_safe() {
        let registry = ObservationRegistry::new(Direction::Drop);
        let sub = registered(&registry);
        assert!(sub.is_active());

        sub.release();
        assert!(!sub.is_active());
        sub.release();
        assert!(registry.is_empty());
    }

    #[test]
    fn release_after_registry_dropped_is_noop() {
        let registry = ObservationRegistry::new(Direction::Drop);
        let sub = registered(&registry);
        drop(registry);

        assert!(!sub.is_active());
        sub.release();
    }

    #[test]
    fn guard_releases_on_drop() {
        let registry = ObservationRegistry::new(Direction::Drop);
        let guard = registered(&registry).into_guard();
        assert!(guard.is_active());
        assert_eq!(registry.len(), 1);

        drop(guard);
        assert!(registry.is_empty());
    }

    #[test]
    fn plain_drop_keeps_observation() {
        let registry = ObservationRegistry::new(Direction::Drop);
        drop(registered(&registry));
        assert_eq!(registry.len(), 1);
    }
}
