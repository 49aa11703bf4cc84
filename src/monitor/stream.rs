use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::error::{ExecutionError, ObserverError, ThermoError, ThermoResult};

use super::dispatcher::ObservationRegistry;
use super::observer::ThresholdObserver;
use super::triggers::{ObservationId, ThresholdSnapshot};

/// Receiving end of a channel-backed observation.
///
/// Snapshots are buffered up to the sensor's `stream_capacity`. Dispatch never
/// waits on a slow reader: when the buffer is full the snapshot is dropped and
/// counted in [`ThresholdStream::dropped`]. Dropping the stream releases its
/// observation.
#[derive(Debug)]
pub struct ThresholdStream {
    observation_id: ObservationId,
    rx: Receiver<ThresholdSnapshot>,
    dropped: Arc<AtomicU64>,
    registry: Weak<ObservationRegistry>,
}

impl ThresholdStream {
    /// The observation feeding this stream.
    #[must_use]
    pub const fn observation_id(&self) -> ObservationId {
        self.observation_id
    }

    /// Receive the next snapshot (blocking).
    ///
    /// Fails once the observation has been released and its buffer drained,
    /// or the sensor has been dropped.
    pub fn recv(&self) -> ThermoResult<ThresholdSnapshot> {
        self.rx.recv().map_err(|_| disconnected())
    }

    /// Receive the next snapshot with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> ThermoResult<ThresholdSnapshot> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => ExecutionError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            }
            .into(),
            RecvTimeoutError::Disconnected => disconnected(),
        })
    }

    /// Next buffered snapshot, if any.
    #[must_use]
    pub fn try_recv(&self) -> Option<ThresholdSnapshot> {
        self.rx.try_recv().ok()
    }

    /// All currently buffered snapshots.
    #[must_use]
    pub fn drain(&self) -> Vec<ThresholdSnapshot> {
        self.rx.try_iter().collect()
    }

    /// Snapshots discarded because the buffer was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for ThresholdStream {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if registry.cancel(self.observation_id) {
            info!(
                observation_id = %self.observation_id,
                direction = %registry.direction(),
                "threshold stream dropped, observation released"
            );
        }
    }
}

fn disconnected() -> ThermoError {
    ExecutionError::Disconnected {
        path: "threshold_stream".to_string(),
    }
    .into()
}

/// Observer that forwards snapshots into a [`ThresholdStream`].
#[derive(Debug)]
pub(crate) struct ChannelObserver {
    tx: Sender<ThresholdSnapshot>,
    dropped: Arc<AtomicU64>,
}

impl ThresholdObserver for ChannelObserver {
    fn on_threshold(&self, snapshot: &ThresholdSnapshot) -> Result<(), ObserverError> {
        match self.tx.try_send(snapshot.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    observation_id = %snapshot.observation_id,
                    dropped = total,
                    "threshold stream not keeping up, snapshot dropped"
                );
            }
            // The stream unregisters on drop; this only races with that.
            Err(TrySendError::Disconnected(_)) => {
                debug!(
                    observation_id = %snapshot.observation_id,
                    "threshold stream closed, snapshot discarded"
                );
            }
        }
        Ok(())
    }
}

pub(crate) fn channel(
    observation_id: ObservationId,
    capacity: usize,
    registry: Weak<ObservationRegistry>,
) -> (ChannelObserver, ThresholdStream) {
    let (tx, rx) = bounded(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        ChannelObserver {
            tx,
            dropped: Arc::clone(&dropped),
        },
        ThresholdStream {
            observation_id,
            rx,
            dropped,
            registry,
        },
    )
}
