//! Orthographic camera for the 2D billboard view.

use glam::{Mat4, Vec2, Vec4};

/// Axis-aligned view onto the world plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// World-space point at the center of the screen.
    pub center: Vec2,
    /// Visible world width.
    pub width: f32,
    /// Visible world height.
    pub height: f32,
}

impl Camera {
    pub fn new(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            center,
            width,
            height,
        }
    }

    /// Projection matrix for this view.
    pub fn projection(&self) -> Mat4 {
        ortho_projection(self.center, self.width, self.height)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 800.0, 600.0)
    }
}

/// Map `[cx - w/2, cx + w/2] x [cy - h/2, cy + h/2]` onto clip space.
///
/// Depth is not meaningful for the billboards; `z` is passed through as
/// `0.5 * z + 0.5` so the plane `z = 0` lands in the middle of `[0, 1]`.
pub fn ortho_projection(center: Vec2, width: f32, height: f32) -> Mat4 {
    let l = center.x - width / 2.0;
    let r = center.x + width / 2.0;
    let t = center.y + height / 2.0;
    let b = center.y - height / 2.0;

    Mat4::from_cols(
        Vec4::new(2.0 / (r - l), 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 / (t - b), 0.0, 0.0),
        Vec4::new(0.0, 0.0, 0.5, 0.0),
        Vec4::new((r + l) / (l - r), (t + b) / (b - t), 0.5, 1.0),
    )
}
