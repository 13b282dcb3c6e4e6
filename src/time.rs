//! Frame timing.
//!
//! [`FrameClock`] turns host timestamps (for example the time since the loop
//! was created) into simulation deltas. Deltas longer than
//! [`MAX_FRAME_DELTA`] are treated as zero: a suspended window or a debugger
//! pause should freeze the effect for a frame, not launch every particle
//! half a second into the future.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//!
//! let mut clock = FrameClock::new();
//! assert_eq!(clock.tick(Duration::from_millis(1000)), 0.0); // first tick
//! assert_eq!(clock.tick(Duration::from_millis(1016)), 0.016);
//! assert_eq!(clock.tick(Duration::from_millis(2000)), 0.0); // clamped
//! ```

use std::time::Duration;

/// Longest delta passed through to the simulation.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(500);

/// Frame-to-frame time tracking.
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Timestamp of the previous tick. `None` until the first tick.
    previous: Option<Duration>,
    /// Sum of all deltas returned so far, in seconds.
    ///
    /// Kept in `f64` so 16 ms steps still register after days of running.
    total_secs: f64,
    /// Delta returned by the last tick.
    delta_secs: f32,
    /// Ticks since creation.
    tick_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    fps_tick_count: u64,
    fps_update_time: Option<Duration>,
    fps_update_interval: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            previous: None,
            total_secs: 0.0,
            delta_secs: 0.0,
            tick_count: 0,
            fps: 0.0,
            fps_tick_count: 0,
            fps_update_time: None,
            fps_update_interval: Duration::from_millis(500),
        }
    }

    /// Record a frame at `now` and return the delta in seconds.
    ///
    /// Returns `0` on the first tick, when `now` is earlier than the previous
    /// timestamp, or when the gap exceeds [`MAX_FRAME_DELTA`].
    pub fn tick(&mut self, now: Duration) -> f32 {
        let delta = match self.previous {
            None => Duration::ZERO,
            Some(previous) => {
                let delta = now.saturating_sub(previous);
                if delta > MAX_FRAME_DELTA {
                    Duration::ZERO
                } else {
                    delta
                }
            }
        };
        self.previous = Some(now);

        self.delta_secs = delta.as_secs_f32();
        self.total_secs += delta.as_secs_f64();
        self.tick_count += 1;

        match self.fps_update_time {
            None => {
                self.fps_update_time = Some(now);
                self.fps_tick_count = self.tick_count;
            }
            Some(since) => {
                let window = now.saturating_sub(since);
                if window >= self.fps_update_interval {
                    let ticks = self.tick_count - self.fps_tick_count;
                    self.fps = ticks as f32 / window.as_secs_f32();
                    self.fps_tick_count = self.tick_count;
                    self.fps_update_time = Some(now);
                }
            }
        }

        self.delta_secs
    }

    /// Delta returned by the last tick, in seconds.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Accumulated simulation time in seconds.
    #[inline]
    pub fn total(&self) -> f32 {
        self.total_secs as f32
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.tick_count
    }

    /// Frames per second, refreshed every 500 ms of host time.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Forget the previous timestamp so the next tick yields a zero delta.
    ///
    /// Used after the host stops delivering frames for a while (e.g. a hidden window).
    pub fn reset_previous(&mut self) {
        self.previous = None;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
