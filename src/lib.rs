//! # petalfall
//!
//! A GPU-resident particle emitter for falling-petal effects.
//!
//! Particles live in two equally sized buffers. Every frame a compute pass
//! reads one buffer and writes the other (integration, aging and rebirth),
//! then an instanced render pass draws the freshly written buffer as
//! textured billboards. The buffers swap roles at the end of the frame, so
//! particle state never round-trips through the host.
//!
//! ## Quick Start
//!
//! ```ignore
//! use petalfall::prelude::*;
//!
//! fn main() -> Result<(), ResourceError> {
//!     let config = Config::default();
//!     let sprites = SpriteSet::from_config(&config.sprites)?;
//!     petalfall::window::run(config, sprites)
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Slots and emission
//!
//! The buffers hold `capacity` slots, all created pre-dead. The
//! [`EmissionController`] activates leading slots at `birth_rate` particles
//! per second; an active slot whose age exceeds its life is reborn at the
//! emitter origin on the next pass. Nothing is ever allocated after startup.
//!
//! ### Devices
//!
//! [`FrameLoop`] talks to a [`GraphicsDevice`]. [`WgpuDevice`] runs the WGSL
//! kernels from [`shader_utils`] on a window surface; [`ReferenceDevice`] runs
//! the identical host kernel from [`simulation`] and records its draws, which
//! is what the headless mode and the tests use.
//!
//! ### Randomness
//!
//! Rebirth draws direction, speed and lifetime from a precomputed
//! [`NoiseField`] indexed by a hash of slot, frame and quantity. There is no
//! shared random state, so slots can be processed in any order.
//!
//! ## Configuration
//!
//! See [`Config`]. All fields have defaults and can be overridden from JSON.

pub mod camera;
pub mod config;
pub mod device;
pub mod emitter;
pub mod error;
pub mod frame_loop;
pub mod gpu;
pub mod noise;
pub mod particle;
pub mod reference;
pub mod shader_utils;
pub mod simulation;
pub mod textures;
pub mod time;
pub mod uniforms;
pub mod visuals;
pub mod window;

pub use bytemuck;
pub use camera::Camera;
pub use config::{Config, SpriteConfig, Viewport};
pub use device::{BufferIndex, GraphicsDevice};
pub use emitter::{EmissionController, OriginPath};
pub use error::{ConfigError, FrameError, ResourceError};
pub use frame_loop::{CancelHandle, FrameLoop, SimState, Tick};
pub use glam::{Mat4, Vec2};
pub use gpu::WgpuDevice;
pub use noise::NoiseField;
pub use particle::ParticleRecord;
pub use reference::{DrawCall, ReferenceDevice, Stage};
pub use simulation::SimulationParams;
pub use textures::SpriteSet;
pub use time::FrameClock;
pub use uniforms::{RenderUniforms, SimUniforms};
pub use visuals::BlendMode;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use petalfall::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{Config, SpriteConfig, Viewport};
    pub use crate::device::GraphicsDevice;
    pub use crate::emitter::OriginPath;
    pub use crate::error::{ConfigError, FrameError, ResourceError};
    pub use crate::frame_loop::{CancelHandle, FrameLoop, Tick};
    pub use crate::gpu::WgpuDevice;
    pub use crate::noise::NoiseField;
    pub use crate::reference::ReferenceDevice;
    pub use crate::textures::SpriteSet;
    pub use crate::visuals::BlendMode;
    pub use crate::{Mat4, Vec2};
}
