//! Clock and timing utilities for the composition loop.
//!
//! The render loop is driven by host refresh callbacks that carry a
//! monotonic timestamp. Everything time-related in a session is derived from
//! those timestamps rather than from a wall clock, which keeps recording time,
//! reference-clip playback and tick pacing on one shared timebase:
//! - Accumulating active recording time across pause/resume
//! - Measuring drift between two streams
//! - Gating refresh callbacks down to a target frame rate

use std::time::Duration;

/// Active-time accumulator for one recording session.
///
/// Time only accumulates between `start`/`resume` and `pause`, so the
/// elapsed value equals wall time minus paused time at tick granularity.
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// Host timestamp of the last accounted tick while running.
    last_tick: Option<Duration>,

    /// Accumulated active time.
    elapsed: Duration,

    /// Accumulated paused time.
    paused_total: Duration,

    /// Host timestamp at which the current pause began.
    paused_at: Option<Duration>,
}

impl RecordingClock {
    /// Create a stopped clock.
    pub fn new() -> Self {
        Self {
            last_tick: None,
            elapsed: Duration::ZERO,
            paused_total: Duration::ZERO,
            paused_at: None,
        }
    }

    /// Start accumulating from host timestamp `now`.
    pub fn start(&mut self, now: Duration) {
        self.last_tick = Some(now);
        self.elapsed = Duration::ZERO;
        self.paused_total = Duration::ZERO;
        self.paused_at = None;
    }

    /// Account for time up to `now`. Returns the active time added.
    ///
    /// Timestamps that go backwards add nothing.
    pub fn advance(&mut self, now: Duration) -> Duration {
        let Some(last) = self.last_tick else {
            return Duration::ZERO;
        };
        let delta = now.saturating_sub(last);
        self.elapsed += delta;
        self.last_tick = Some(now.max(last));
        delta
    }

    /// Stop accumulating at `now`.
    pub fn pause(&mut self, now: Duration) {
        if self.last_tick.is_some() {
            self.advance(now);
            self.last_tick = None;
            self.paused_at = Some(now);
        }
    }

    /// Resume accumulating from `now`.
    pub fn resume(&mut self, now: Duration) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += now.saturating_sub(paused_at);
            self.last_tick = Some(now);
        }
    }

    /// Whether the clock is currently accumulating.
    pub fn is_running(&self) -> bool {
        self.last_tick.is_some()
    }

    /// Active time accumulated so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Seconds of active time accumulated so far.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Total time spent paused.
    pub fn paused_total(&self) -> Duration {
        self.paused_total
    }
}

impl Default for RecordingClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Drift measurement between two streams.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Timestamp in the reference stream (ns).
    pub reference_ns: u64,
    /// Timestamp in the measured stream (ns).
    pub measured_ns: u64,
}

impl DriftMeasurement {
    /// Drift in nanoseconds (positive = measured is ahead).
    pub fn drift_ns(&self) -> i64 {
        self.measured_ns as i64 - self.reference_ns as i64
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_ns() as f64 / 1_000_000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: f64) -> bool {
        self.drift_ms().abs() > threshold_ms
    }
}

/// Frame rate controller for host refresh callbacks.
///
/// Display refresh is usually faster than the composition rate; the
/// controller lets through only callbacks that are at least one target
/// interval apart.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }
}
