//! Blend configuration for the particle render pass.

use serde::{Deserialize, Serialize};

/// How overlapping particles combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Additive blending (`srcAlpha, one`) (default).
    ///
    /// Overlapping particles brighten rather than occlude each other.
    #[default]
    Additive,

    /// Standard alpha blending (`srcAlpha, oneMinusSrcAlpha`).
    Alpha,
}

impl BlendMode {
    pub fn to_blend_state(self) -> wgpu::BlendState {
        match self {
            BlendMode::Additive => {
                let additive = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                };
                wgpu::BlendState {
                    color: additive,
                    alpha: additive,
                }
            }
            BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
        }
    }
}
