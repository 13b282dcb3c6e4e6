//! Run configuration.
//!
//! Everything is fixed at startup. [`Config::default`] reproduces the
//! falling-sakura demo; a JSON file can override any subset of fields:
//!
//! ```json
//! {
//!     "capacity": 2000,
//!     "birth_rate": 400.0,
//!     "gravity": [0.0, -120.0],
//!     "origin": { "type": "fixed", "position": [0.0, 280.0] },
//!     "sprites": { "paths": ["assets/sakura0.png", "assets/sakura1.png"], "width": 24, "height": 24 }
//! }
//! ```
//!
//! [`Config::validate`] must pass before any device work; the constructors
//! that consume a config call it themselves.

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::emitter::OriginPath;
use crate::error::ConfigError;
use crate::simulation::SimulationParams;
use crate::visuals::BlendMode;

/// Largest sprite width or height accepted by [`Config::validate`].
///
/// This is the default `max_texture_dimension_2d` of a `wgpu` device.
pub const MAX_SPRITE_DIMENSION: u32 = 8192;

/// Reject sprite dimensions of zero or above [`MAX_SPRITE_DIMENSION`].
pub fn check_sprite_size(width: u32, height: u32) -> Result<(), ConfigError> {
    let valid = |d: u32| (1..=MAX_SPRITE_DIMENSION).contains(&d);
    if valid(width) && valid(height) {
        Ok(())
    } else {
        Err(ConfigError::SpriteSize {
            width,
            height,
            max: MAX_SPRITE_DIMENSION,
        })
    }
}

/// Sprite images drawn on the particles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    /// Image files, one array layer each. Empty means generate petals procedurally.
    pub paths: Vec<PathBuf>,
    /// Required width of every image.
    pub width: u32,
    /// Required height of every image.
    pub height: u32,
    /// Number of procedural sprites when `paths` is empty.
    pub procedural_count: u32,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            width: 24,
            height: 24,
            procedural_count: 4,
        }
    }
}

/// Visible world extents, also used as the initial window size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Complete configuration of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of particle slots `N`.
    pub capacity: u32,
    /// Particles per second.
    pub birth_rate: f32,
    pub min_age: f32,
    pub max_age: f32,
    pub min_theta: f32,
    pub max_theta: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub gravity: Vec2,
    /// Half-extent of each particle quad in world units.
    pub size: f32,
    pub sprites: SpriteConfig,
    pub viewport: Viewport,
    pub origin: OriginPath,
    /// Seed for the noise field and the initial lifetimes.
    pub noise_seed: u64,
    pub blend: BlendMode,
    pub clear_color: [f64; 4],
    pub title: String,
}

impl Default for Config {
    fn default() -> Self {
        let params = SimulationParams::default();
        Self {
            capacity: 200,
            birth_rate: params.birth_rate,
            min_age: params.min_age,
            max_age: params.max_age,
            min_theta: params.min_theta,
            max_theta: params.max_theta,
            min_speed: params.min_speed,
            max_speed: params.max_speed,
            gravity: params.gravity,
            size: 35.0,
            sprites: SpriteConfig::default(),
            viewport: Viewport::default(),
            origin: OriginPath::default(),
            noise_seed: 0x5eed,
            blend: BlendMode::Additive,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            title: "petalfall".to_string(),
        }
    }
}

impl Config {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Check every range and count. Comparisons are written so NaN fails them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !(self.min_age <= self.max_age) {
            return Err(ConfigError::AgeRange {
                min: self.min_age,
                max: self.max_age,
            });
        }
        if !(self.min_age > 0.0) {
            return Err(ConfigError::NonPositiveLife(self.min_age));
        }
        if !(self.min_theta <= self.max_theta && self.min_theta >= -PI && self.max_theta <= PI) {
            return Err(ConfigError::ThetaRange {
                min: self.min_theta,
                max: self.max_theta,
            });
        }
        if !(self.min_speed <= self.max_speed) {
            return Err(ConfigError::SpeedRange {
                min: self.min_speed,
                max: self.max_speed,
            });
        }
        if !(self.birth_rate >= 0.0) {
            return Err(ConfigError::BirthRate(self.birth_rate));
        }
        if !(self.size > 0.0) {
            return Err(ConfigError::Size(self.size));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(ConfigError::Viewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }
        if self.sprites.paths.is_empty() && self.sprites.procedural_count == 0 {
            return Err(ConfigError::NoSprites);
        }
        check_sprite_size(self.sprites.width, self.sprites.height)?;
        Ok(())
    }

    /// Simulation parameters with the origin evaluated at `t = 0`.
    pub fn simulation_params(&self) -> SimulationParams {
        SimulationParams {
            birth_rate: self.birth_rate,
            min_age: self.min_age,
            max_age: self.max_age,
            min_theta: self.min_theta,
            max_theta: self.max_theta,
            min_speed: self.min_speed,
            max_speed: self.max_speed,
            gravity: self.gravity,
            origin: self.origin.at(0.0),
        }
    }
}
