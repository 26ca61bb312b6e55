//! Port poller: samples the device's pins on its own schedule.
//!
//! Reading a port shells out to an external tool and can take up to a
//! second when the device is unreachable.  That must never delay a tick, so
//! polling runs as a tokio task that hands each read to the blocking pool and
//! publishes the result into a [`PinSnapshot`].  The tick thread only ever
//! reads the snapshot.
//!
//! A failed read is logged and the snapshot keeps its previous value, so the
//! UI shows stale pins rather than none.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::pins::{PinState, PortId};

/// Default time between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortError {
    #[error("failed to run `{program}`: {reason}")]
    Spawn { program: String, reason: String },

    #[error("`{program}` exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected device response: {0:?}")]
    UnexpectedResponse(String),
}

/// Reads and writes one 8-bit device port.
///
/// Both calls block; the poller runs them on tokio's blocking pool.
#[cfg_attr(test, mockall::automock)]
pub trait PortController: Send + Sync {
    fn read_port(&self, port: PortId) -> Result<PinState, PortError>;

    fn write_port(&self, port: PortId, value: u8) -> Result<(), PortError>;
}

/// The most recent successful read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinReading {
    pub pins: PinState,
    /// `None` until the first successful read.
    pub updated_at: Option<Instant>,
    /// Incremented on every successful read.
    pub generation: u64,
}

/// Shared, cheaply cloneable holder of the latest [`PinReading`].
#[derive(Debug, Clone, Default)]
pub struct PinSnapshot(Arc<RwLock<PinReading>>);

impl PinSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reading(&self) -> PinReading {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store(&self, pins: PinState, at: Instant) {
        let mut reading = self.0.write().unwrap_or_else(PoisonError::into_inner);
        reading.pins = pins;
        reading.updated_at = Some(at);
        reading.generation += 1;
    }
}

/// Control surface for a running poller.  Usable from non-async threads.
#[derive(Clone)]
pub struct PollerHandle {
    refresh: Arc<Notify>,
    snapshot: PinSnapshot,
    controller: Arc<dyn PortController>,
    port: PortId,
    runtime: Handle,
}

impl PollerHandle {
    /// Wakes the poller for an immediate read.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn snapshot(&self) -> PinSnapshot {
        self.snapshot.clone()
    }

    pub fn reading(&self) -> PinReading {
        self.snapshot.reading()
    }

    pub fn port(&self) -> PortId {
        self.port
    }

    /// Writes `value` to the port in the background, then triggers a
    /// refresh so the new state shows up without waiting a full interval.
    /// The outcome is only logged.
    pub fn actuate(&self, value: u8) {
        let controller = Arc::clone(&self.controller);
        let refresh = Arc::clone(&self.refresh);
        let port = self.port;
        self.runtime.spawn_blocking(move || {
            match controller.write_port(port, value) {
                Ok(()) => debug!(port = %port, value, "port written"),
                Err(e) => warn!(port = %port, value, error = %e, "port write failed"),
            }
            refresh.notify_one();
        });
    }
}

impl std::fmt::Debug for PollerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerHandle")
            .field("port", &self.port)
            .field("reading", &self.snapshot.reading())
            .finish_non_exhaustive()
    }
}

/// Performs one read and stores it on success.  Returns whether the
/// snapshot was updated.
pub async fn poll_once(
    controller: &Arc<dyn PortController>,
    port: PortId,
    snapshot: &PinSnapshot,
) -> bool {
    let reader = Arc::clone(controller);
    match tokio::task::spawn_blocking(move || reader.read_port(port)).await {
        Ok(Ok(pins)) => {
            snapshot.store(pins, Instant::now());
            debug!(port = %port, bits = pins.bits(), "port polled");
            true
        }
        Ok(Err(e)) => {
            warn!(port = %port, error = %e, "port poll failed, keeping previous state");
            false
        }
        Err(e) => {
            warn!(port = %port, error = %e, "port poll task aborted");
            false
        }
    }
}

/// Starts the polling task on `runtime`.
///
/// The first poll happens immediately.  The task exits at the next wake-up
/// after `running` is cleared.
pub fn spawn_port_poller(
    runtime: &Handle,
    controller: Arc<dyn PortController>,
    port: PortId,
    interval: Duration,
    running: Arc<AtomicBool>,
) -> (PollerHandle, JoinHandle<()>) {
    let handle = PollerHandle {
        refresh: Arc::new(Notify::new()),
        snapshot: PinSnapshot::new(),
        controller: Arc::clone(&controller),
        port,
        runtime: runtime.clone(),
    };

    let refresh = Arc::clone(&handle.refresh);
    let snapshot = handle.snapshot.clone();
    let task = runtime.spawn(async move {
        info!(port = %port, interval_ms = interval.as_millis() as u64, "port poller started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = refresh.notified() => {
                    debug!(port = %port, "port refresh requested");
                    ticker.reset();
                }
            }
            if !running.load(Ordering::SeqCst) {
                break;
            }
            poll_once(&controller, port, &snapshot).await;
        }
        info!(port = %port, "port poller stopped");
    });

    (handle, task)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(mock: MockPortController) -> Arc<dyn PortController> {
        Arc::new(mock)
    }

    async fn wait_for_generation(snapshot: &PinSnapshot, generation: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while snapshot.reading().generation < generation {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("poller did not reach the expected generation");
    }

    #[test]
    fn test_snapshot_starts_empty() {
        let reading = PinSnapshot::new().reading();
        assert_eq!(reading.generation, 0);
        assert_eq!(reading.updated_at, None);
        assert_eq!(reading.pins, PinState::default());
    }

    #[tokio::test]
    async fn test_poll_once_stores_successful_read() {
        // Arrange
        let mut mock = MockPortController::new();
        mock.expect_read_port()
            .withf(|port| *port == PortId(1))
            .times(1)
            .returning(|_| Ok(PinState::from_bits(0b0000_0101)));
        let snapshot = PinSnapshot::new();

        // Act
        let updated = poll_once(&controller(mock), PortId(1), &snapshot).await;

        // Assert
        assert!(updated);
        let reading = snapshot.reading();
        assert_eq!(reading.pins.bits(), 0b0000_0101);
        assert_eq!(reading.generation, 1);
        assert!(reading.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_poll_failure_keeps_previous_state() {
        let mut mock = MockPortController::new();
        mock.expect_read_port()
            .returning(|_| Err(PortError::UnexpectedResponse("Timeout".to_string())));
        let snapshot = PinSnapshot::new();
        snapshot.store(PinState::from_bits(0xF0), Instant::now());

        let updated = poll_once(&controller(mock), PortId(1), &snapshot).await;

        assert!(!updated);
        assert_eq!(snapshot.reading().pins.bits(), 0xF0);
        assert_eq!(snapshot.reading().generation, 1);
    }

    #[tokio::test]
    async fn test_refresh_wakes_poller_early() {
        // Arrange: an interval long enough that only the initial tick and
        // the refresh can trigger reads
        let mut mock = MockPortController::new();
        mock.expect_read_port()
            .returning(|_| Ok(PinState::from_bits(1)));
        let running = Arc::new(AtomicBool::new(true));
        let (handle, task) = spawn_port_poller(
            &Handle::current(),
            controller(mock),
            PortId(1),
            Duration::from_secs(3600),
            Arc::clone(&running),
        );
        wait_for_generation(&handle.snapshot(), 1).await;

        // Act
        handle.request_refresh();

        // Assert
        wait_for_generation(&handle.snapshot(), 2).await;
        running.store(false, Ordering::SeqCst);
        handle.request_refresh();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_actuate_writes_then_refreshes() {
        let mut mock = MockPortController::new();
        mock.expect_read_port()
            .returning(|_| Ok(PinState::from_bits(0b10)));
        mock.expect_write_port()
            .withf(|port, value| *port == PortId(1) && *value == 0b10)
            .times(1)
            .returning(|_, _| Ok(()));
        let running = Arc::new(AtomicBool::new(true));
        let (handle, task) = spawn_port_poller(
            &Handle::current(),
            controller(mock),
            PortId(1),
            Duration::from_secs(3600),
            Arc::clone(&running),
        );
        wait_for_generation(&handle.snapshot(), 1).await;

        handle.actuate(0b10);

        wait_for_generation(&handle.snapshot(), 2).await;
        running.store(false, Ordering::SeqCst);
        handle.request_refresh();
        task.await.unwrap();
    }
}
