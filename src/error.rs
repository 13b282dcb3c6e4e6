//! Error types for petalfall.
//!
//! Errors are split by how fatal they are:
//!
//! | Type | When | Policy |
//! |------|------|--------|
//! | [`ConfigError`] | validating a [`Config`](crate::Config) | fatal, never retried |
//! | [`ResourceError`] | device, surface, window or sprite setup | fatal for the run |
//! | [`FrameError`] | a single frame's dispatch or presentation | logged, frame dropped |

use std::path::PathBuf;

use thiserror::Error;

/// Invalid configuration, detected before any device work happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Particle capacity of zero.
    #[error("particle capacity must be at least 1")]
    ZeroCapacity,
    /// `max_age < min_age`.
    #[error("invalid min-max age range: [{min}, {max}]")]
    AgeRange { min: f32, max: f32 },
    /// Lifetimes must be strictly positive so a reborn particle is alive.
    #[error("min_age must be positive, got {0}")]
    NonPositiveLife(f32),
    /// Theta range inverted or outside `[-pi, pi]`.
    #[error("invalid theta range: [{min}, {max}] (must lie within [-pi, pi])")]
    ThetaRange { min: f32, max: f32 },
    /// `max_speed < min_speed`.
    #[error("invalid min-max speed range: [{min}, {max}]")]
    SpeedRange { min: f32, max: f32 },
    #[error("birth rate must be a non-negative number, got {0}")]
    BirthRate(f32),
    #[error("particle size must be positive, got {0}")]
    Size(f32),
    #[error("viewport must have positive extents, got {width}x{height}")]
    Viewport { width: u32, height: u32 },
    /// No sprite images configured or generated.
    #[error("sprite set is empty")]
    NoSprites,
    /// Sprite dimensions of zero, or larger than [`MAX_SPRITE_DIMENSION`](crate::config::MAX_SPRITE_DIMENSION).
    #[error("sprite size must be between 1x1 and {max}x{max}, got {width}x{height}")]
    SpriteSize { width: u32, height: u32, max: u32 },
    /// A sprite image does not match the configured sprite dimensions.
    #[error("sprite {index} is {found_width}x{found_height}, expected {width}x{height}")]
    SpriteDimensions {
        index: usize,
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },
    /// A raw RGBA layer whose byte length does not match the sprite dimensions.
    #[error("sprite layer {index} holds {found} bytes, expected {expected}")]
    LayerLength {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure to acquire or create a resource the run depends on.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support.")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    #[error("surface does not support any usable format")]
    SurfaceUnsupported,
    #[error("failed to load sprite '{path}': {source}")]
    SpriteLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// A shader module or pipeline failed validation.
    #[error("failed to build {stage} pipeline: {reason}")]
    Shader { stage: &'static str, reason: String },
    /// The sprite array does not fit the device or was rejected on upload.
    #[error("failed to upload sprite texture: {0}")]
    Texture(String),
    /// Particle buffers were used before being allocated, or allocated twice.
    #[error("particle buffers {0}")]
    Buffers(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A frame the device refused to run. The frame is dropped and buffer roles stay as they were.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("surface unavailable: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("device rejected {stage} dispatch: {reason}")]
    Rejected { stage: &'static str, reason: String },
    /// A stage was issued outside `begin_frame`/`end_frame`.
    #[error("{0} issued outside of a frame")]
    OutOfFrame(&'static str),
}

impl FrameError {
    /// Whether the loop should stop scheduling frames after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Surface(wgpu::SurfaceError::OutOfMemory))
    }
}
