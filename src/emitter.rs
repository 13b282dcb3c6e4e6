//! Emission throttling and the emission point.
//!
//! Slots become active in buffer order. The [`EmissionController`] grows the
//! active prefix by `floor(birth_rate * dt)` each frame until the whole buffer
//! is in use; from then on particles are only recycled. Where new particles
//! appear is decided by an [`OriginPath`], evaluated once per frame against
//! the loop's total time.
//!
//! # Example
//!
//! ```ignore
//! let mut emission = EmissionController::new(10, 5.0);
//! assert_eq!(emission.advance(1.0), 5);
//! assert_eq!(emission.advance(1.0), 10); // clamped, not 15
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Tracks how many leading slots are active.
#[derive(Clone, Debug)]
pub struct EmissionController {
    capacity: u32,
    birth_rate: f32,
    active_count: u32,
}

impl EmissionController {
    /// A controller with no active slots.
    pub fn new(capacity: u32, birth_rate: f32) -> Self {
        Self {
            capacity,
            birth_rate,
            active_count: 0,
        }
    }

    /// Grow the active range for a frame of `dt` seconds and return the new count.
    ///
    /// Fractional births are dropped; negative or NaN deltas emit nothing.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if self.active_count < self.capacity {
            let births = (self.birth_rate * dt).floor();
            if births >= 1.0 {
                // Saturating float-to-int cast, then clamp to the buffer.
                let births = births as u32;
                self.active_count = self.active_count.saturating_add(births).min(self.capacity);
            }
        }
        self.active_count
    }

    #[inline]
    pub fn active_count(&self) -> u32 {
        self.active_count
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub fn birth_rate(&self) -> f32 {
        self.birth_rate
    }

    /// Whether every slot is in use.
    pub fn is_saturated(&self) -> bool {
        self.active_count == self.capacity
    }
}

/// Where particles are emitted, as a function of total time in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OriginPath {
    /// Emit from a single point.
    Fixed {
        position: Vec2,
    },
    /// Sweep horizontally: `x = center.x + amplitude * cos(2pi * frequency * t)`.
    Oscillate {
        center: Vec2,
        /// Horizontal half-width of the sweep.
        amplitude: f32,
        /// Sweeps per second.
        frequency: f32,
    },
}

impl OriginPath {
    /// Evaluate the emission point at `t` seconds.
    pub fn at(&self, t: f32) -> Vec2 {
        match *self {
            OriginPath::Fixed { position } => position,
            OriginPath::Oscillate {
                center,
                amplitude,
                frequency,
            } => {
                let phase = std::f32::consts::TAU * frequency * t;
                Vec2::new(center.x + amplitude * phase.cos(), center.y)
            }
        }
    }
}

impl Default for OriginPath {
    fn default() -> Self {
        OriginPath::Oscillate {
            center: Vec2::new(0.0, 300.0),
            amplitude: 400.0,
            frequency: 0.25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emission_scenario() {
        let mut emission = EmissionController::new(10, 5.0);
        assert_eq!(emission.active_count(), 0);
        assert_eq!(emission.advance(1.0), 5);
        assert_eq!(emission.advance(1.0), 10);
        assert!(emission.is_saturated());
    }

    #[test]
    fn test_zero_delta_emits_nothing() {
        let mut emission = EmissionController::new(10, 1000.0);
        assert_eq!(emission.advance(0.0), 0);
    }

    #[test]
    fn test_fractional_births_are_dropped() {
        let mut emission = EmissionController::new(100, 5.0);
        for _ in 0..60 {
            emission.advance(1.0 / 60.0);
        }
        assert_eq!(emission.active_count(), 0);

        let mut emission = EmissionController::new(100, 5.0);
        assert_eq!(emission.advance(0.5), 2);
    }

    #[test]
    fn test_bad_deltas_never_decrease() {
        let mut emission = EmissionController::new(10, 5.0);
        emission.advance(1.0);
        assert_eq!(emission.advance(-3.0), 5);
        assert_eq!(emission.advance(f32::NAN), 5);
        assert_eq!(emission.advance(f32::INFINITY), 10);
    }

    #[test]
    fn test_monotonic_and_bounded() {
        let mut emission = EmissionController::new(200, 900.0);
        let mut last = 0;
        for i in 0..100 {
            let dt = (i % 7) as f32 * 0.004;
            let now = emission.advance(dt);
            assert!(now >= last);
            assert!(now <= 200);
            last = now;
        }
        assert_eq!(last, 200);
    }

    #[test]
    fn test_origin_paths() {
        let fixed = OriginPath::Fixed {
            position: Vec2::new(1.0, 2.0),
        };
        assert_eq!(fixed.at(0.0), fixed.at(123.0));

        let sweep = OriginPath::Oscillate {
            center: Vec2::new(0.0, 300.0),
            amplitude: 400.0,
            frequency: 0.25,
        };
        assert!((sweep.at(0.0) - Vec2::new(400.0, 300.0)).length() < 1e-3);
        assert!((sweep.at(2.0) - Vec2::new(-400.0, 300.0)).length() < 1e-3);
        assert!((sweep.at(4.0) - Vec2::new(400.0, 300.0)).length() < 1e-3);
    }

    #[test]
    fn test_origin_path_json() {
        let path: OriginPath =
            serde_json::from_str(r#"{"type":"fixed","position":[5.0,6.0]}"#).unwrap();
        assert_eq!(
            path,
            OriginPath::Fixed {
                position: Vec2::new(5.0, 6.0)
            }
        );
    }
}
