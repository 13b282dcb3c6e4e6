//! Uniform blocks uploaded once per frame.
//!
//! Both structs are `#[repr(C)]` with explicit trailing padding so their size
//! is a multiple of 16 bytes, matching WGSL uniform layout rules. The WGSL
//! definitions live next to them so the two cannot drift apart silently.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};

use crate::simulation::SimulationParams;

/// Inputs to one simulation pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SimUniforms {
    pub gravity: Vec2,
    /// Current emission point.
    pub origin: Vec2,
    /// Seconds since the previous frame (already clamped by the clock).
    pub time_delta: f32,
    /// Seconds since the loop started.
    pub total_time: f32,
    pub min_theta: f32,
    pub max_theta: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub min_age: f32,
    pub max_age: f32,
    /// Number of leading slots to simulate.
    pub active_count: u32,
    /// Frame number, used to vary noise lookups between frames.
    pub frame: u32,
    pub _padding: [u32; 2],
}

impl SimUniforms {
    pub const WGSL_STRUCT: &'static str = r#"struct SimUniforms {
    gravity: vec2<f32>,
    origin: vec2<f32>,
    time_delta: f32,
    total_time: f32,
    min_theta: f32,
    max_theta: f32,
    min_speed: f32,
    max_speed: f32,
    min_age: f32,
    max_age: f32,
    active_count: u32,
    frame: u32,
    _padding: vec2<u32>,
};
"#;

    /// Assemble the uniforms for one frame.
    pub fn new(
        params: &SimulationParams,
        time_delta: f32,
        total_time: f32,
        active_count: u32,
        frame: u64,
    ) -> Self {
        Self {
            gravity: params.gravity,
            origin: params.origin,
            time_delta,
            total_time,
            min_theta: params.min_theta,
            max_theta: params.max_theta,
            min_speed: params.min_speed,
            max_speed: params.max_speed,
            min_age: params.min_age,
            max_age: params.max_age,
            active_count,
            // Only the low bits matter for noise lookups.
            frame: frame as u32,
            _padding: [0; 2],
        }
    }
}

/// Inputs to one render pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct RenderUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// Half-extent of a particle quad in world units.
    pub size: f32,
    /// Number of layers in the sprite array.
    pub sprite_count: u32,
    pub _padding: [u32; 2],
}

impl RenderUniforms {
    pub const WGSL_STRUCT: &'static str = r#"struct RenderUniforms {
    view_proj: mat4x4<f32>,
    size: f32,
    sprite_count: u32,
    _padding: vec2<u32>,
};
"#;

    pub fn new(view_proj: Mat4, size: f32, sprite_count: u32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            size,
            sprite_count,
            _padding: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<SimUniforms>(), 64);
        assert_eq!(std::mem::size_of::<RenderUniforms>(), 80);
    }

    #[test]
    fn test_frame_truncates() {
        let params = SimulationParams::default();
        let u = SimUniforms::new(&params, 0.016, 1.0, 10, u64::from(u32::MAX) + 3);
        assert_eq!(u.frame, 2);
        assert_eq!(u.active_count, 10);
        assert_eq!(u.origin, params.origin);
    }
}
