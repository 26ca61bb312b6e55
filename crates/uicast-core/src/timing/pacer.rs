//! Fixed-rate tick pacer.
//!
//! # Sleep strategy
//!
//! `thread::sleep` is coarse: the OS may oversleep by tens of microseconds
//! (Linux) up to a millisecond or more (Windows).  A pure busy-wait is exact
//! but burns a core.  The pacer instead sleeps for [`SLEEP_FRACTION`] of the
//! remaining time, re-measures, and repeats until the deadline has passed.
//! Each sleep undershoots on purpose, so OS slack eats into the undershoot
//! instead of the deadline, and the steps shrink geometrically as the
//! deadline approaches.
//!
//! # Drift
//!
//! After each wait the deadline advances by exactly one interval from the
//! previous *scheduled* deadline, never from the actual wake-up time.  A late
//! wake-up therefore shortens the following wait instead of shifting every
//! later tick, and long-run drift stays bounded by a single wake-up delay.

use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Fraction of the remaining time slept per step.
pub const SLEEP_FRACTION: f64 = 0.9;

/// Default frame rate when none is configured.
pub const DEFAULT_FPS: f64 = 60.0;

#[derive(Debug, Error, PartialEq)]
pub enum PacerError {
    #[error("frame rate must be a positive, finite number of frames per second, got {0}")]
    InvalidRate(f64),
}

/// Produces a steady tick at a fixed rate.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    /// Reference point for [`delta_seconds`](Self::delta_seconds).
    last_tick: Instant,
    /// Scheduled boundary the next [`wait`](Self::wait) blocks until.
    next_tick: Instant,
}

impl Pacer {
    /// Creates a pacer ticking `fps` times per second, starting now.
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::InvalidRate`] if `fps` is zero, negative,
    /// non-finite, so large the interval rounds to zero, or so small the
    /// interval cannot be represented.
    pub fn new(fps: f64) -> Result<Self, PacerError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(PacerError::InvalidRate(fps));
        }
        let interval =
            Duration::try_from_secs_f64(1.0 / fps).map_err(|_| PacerError::InvalidRate(fps))?;
        let start = Instant::now();
        if interval.is_zero() || start.checked_add(interval).is_none() {
            return Err(PacerError::InvalidRate(fps));
        }
        Ok(Self::with_interval(interval, start))
    }

    /// Creates a pacer with an explicit interval whose first boundary is one
    /// interval after `start`.
    pub fn with_interval(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last_tick: start,
            next_tick: start + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The boundary the next call to [`wait`](Self::wait) will block until.
    pub fn next_deadline(&self) -> Instant {
        self.next_tick
    }

    /// Blocks until the scheduled boundary, then schedules the next one
    /// exactly one interval later.
    ///
    /// Never returns before the boundary.  May return late under load; the
    /// following boundary is still anchored to this one.
    pub fn wait(&mut self) {
        let deadline = self.next_tick;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).mul_f64(SLEEP_FRACTION));
        }
        self.next_tick += self.interval;
    }

    /// Wall-clock seconds since the previous call (or since construction),
    /// resetting the reference point.
    pub fn delta_seconds(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        delta.as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_non_positive_rate() {
        assert_eq!(Pacer::new(0.0).unwrap_err(), PacerError::InvalidRate(0.0));
        assert!(Pacer::new(-30.0).is_err());
    }

    #[test]
    fn test_new_rejects_non_finite_rate() {
        assert!(Pacer::new(f64::NAN).is_err());
        assert!(Pacer::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_new_rejects_rate_too_small_for_duration() {
        assert_eq!(Pacer::new(1e-30).unwrap_err(), PacerError::InvalidRate(1e-30));
    }

    #[test]
    fn test_default_rate_interval_is_about_16ms() {
        let pacer = Pacer::new(DEFAULT_FPS).unwrap();
        let micros = pacer.interval().as_micros();
        assert!((16_600..=16_700).contains(&micros), "got {micros}us");
    }

    #[test]
    fn test_wait_never_returns_before_boundary() {
        // Arrange: 2 ms ticks
        let mut pacer = Pacer::with_interval(Duration::from_millis(2), Instant::now());

        for _ in 0..10 {
            let deadline = pacer.next_deadline();

            // Act
            pacer.wait();

            // Assert
            assert!(Instant::now() >= deadline, "wait returned early");
        }
    }

    #[test]
    fn test_wait_converges_on_boundary_without_oversleeping_a_tick() {
        // Arrange
        let interval = Duration::from_millis(5);
        let mut pacer = Pacer::with_interval(interval, Instant::now());
        let mut worst = Duration::ZERO;

        for _ in 0..10 {
            let deadline = pacer.next_deadline();

            // Act
            pacer.wait();
            worst = worst.max(Instant::now() - deadline);
        }

        // Assert: late by less than one interval even on a loaded machine
        assert!(worst < interval, "worst lateness {worst:?}");
    }

    #[test]
    fn test_wait_advances_deadline_by_exactly_one_interval() {
        let start = Instant::now();
        let interval = Duration::from_millis(1);
        let mut pacer = Pacer::with_interval(interval, start);

        pacer.wait();
        pacer.wait();

        assert_eq!(pacer.next_deadline(), start + interval * 3);
    }

    #[test]
    fn test_late_wait_reanchors_on_scheduled_boundary() {
        // Arrange
        let start = Instant::now();
        let interval = Duration::from_millis(2);
        let mut pacer = Pacer::with_interval(interval, start);

        // Act: miss the first boundary by a wide margin
        thread::sleep(Duration::from_millis(10));
        let before = Instant::now();
        pacer.wait();
        let waited = before.elapsed();

        // Assert: returns immediately, and the next boundary is computed
        // from the scheduled one, not from the late wake-up.
        assert!(waited < Duration::from_millis(2), "late wait slept {waited:?}");
        assert_eq!(pacer.next_deadline(), start + interval * 2);
    }

    #[test]
    fn test_delta_seconds_resets_reference_point() {
        let mut pacer = Pacer::new(60.0).unwrap();
        thread::sleep(Duration::from_millis(5));

        let first = pacer.delta_seconds();
        let second = pacer.delta_seconds();

        assert!(first >= 0.005, "first delta {first}");
        assert!(second < first, "second delta {second} should start from the first call");
    }
}
