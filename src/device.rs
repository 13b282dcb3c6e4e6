//! The seam between the frame loop and whatever executes the frame.
//!
//! A frame is always issued in the same order:
//!
//! ```text
//! begin_frame -> simulate(read, write) -> draw(write) -> end_frame
//! ```
//!
//! An implementation must make the simulation writes of a frame visible to
//! the draw of the same frame. If any call fails, the loop calls
//! [`GraphicsDevice::abort_frame`] and does not swap buffer roles.

use crate::error::{FrameError, ResourceError};
use crate::particle::ParticleRecord;
use crate::uniforms::{RenderUniforms, SimUniforms};

/// Index of one of the two particle buffers, `0` or `1`.
pub type BufferIndex = usize;

/// A device able to run the simulation kernel and draw the particles.
pub trait GraphicsDevice {
    /// Create both particle buffers, each initialised with `initial`.
    ///
    /// Called once, before the first frame. The buffer capacity is
    /// `initial.len()` and never changes afterwards.
    fn allocate_particles(&mut self, initial: &[ParticleRecord]) -> Result<(), ResourceError>;

    /// Start recording a frame.
    fn begin_frame(&mut self) -> Result<(), FrameError>;

    /// Run the kernel over the first `active_count` slots of `read`, writing `write`.
    fn simulate(
        &mut self,
        read: BufferIndex,
        write: BufferIndex,
        active_count: u32,
        uniforms: &SimUniforms,
    ) -> Result<(), FrameError>;

    /// Draw the first `active_count` records of `buffer` as instanced quads.
    fn draw(
        &mut self,
        buffer: BufferIndex,
        active_count: u32,
        uniforms: &RenderUniforms,
    ) -> Result<(), FrameError>;

    /// Submit the frame and present it.
    fn end_frame(&mut self) -> Result<(), FrameError>;

    /// Throw away a partially recorded frame after an error.
    fn abort_frame(&mut self) {}

    /// The presentation target changed size.
    fn resize(&mut self, _width: u32, _height: u32) {}
}

/// Reject a read/write pair that does not name two distinct buffers.
pub(crate) fn check_roles(read: BufferIndex, write: BufferIndex) -> Result<(), FrameError> {
    if read > 1 || write > 1 || read == write {
        return Err(FrameError::Rejected {
            stage: "simulation",
            reason: format!("invalid buffer roles read={read} write={write}"),
        });
    }
    Ok(())
}
