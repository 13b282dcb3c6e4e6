//! Particle record layout shared by the host, the compute kernel and the renderer.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use rand::Rng;

/// One particle slot.
///
/// The layout is interleaved and tightly packed (24 bytes), so the same
/// buffer can be bound as a storage array by the simulation pass and as a
/// per-instance vertex buffer by the render pass.
///
/// | Field | Offset | Format |
/// |-------|--------|--------|
/// | `position` | 0 | `vec2<f32>` |
/// | `age` | 8 | `f32` |
/// | `life` | 12 | `f32` |
/// | `velocity` | 16 | `vec2<f32>` |
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleRecord {
    /// World-space location.
    pub position: Vec2,
    /// Seconds since the last (re)birth.
    pub age: f32,
    /// Lifetime budget sampled at birth. The particle is dead once `age > life`.
    pub life: f32,
    pub velocity: Vec2,
}

impl ParticleRecord {
    /// Size of one record in bytes.
    pub const SIZE: usize = std::mem::size_of::<ParticleRecord>();

    /// WGSL definition matching this layout exactly.
    pub const WGSL_STRUCT: &'static str = r#"struct Particle {
    position: vec2<f32>,
    age: f32,
    life: f32,
    velocity: vec2<f32>,
};
"#;

    /// Per-instance attributes read by the render pass (`position`, `age`, `life`).
    ///
    /// Locations 0 and 1 are taken by the quad mesh.
    pub const RENDER_ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        2 => Float32x2,
        3 => Float32,
        4 => Float32,
    ];

    /// A record that is already expired, so the first simulation pass rebirths it.
    pub fn pre_dead(life: f32) -> Self {
        Self {
            position: Vec2::ZERO,
            age: life + 1.0,
            life,
            velocity: Vec2::ZERO,
        }
    }

    /// Whether the record has outlived its budget.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.age > self.life
    }

    /// Vertex buffer layout for instanced rendering.
    pub fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::RENDER_ATTRIBUTES,
        }
    }
}

/// Build the initial contents of both particle buffers.
///
/// Every slot starts pre-dead with a lifetime drawn uniformly from
/// `[min_age, max_age]`.
pub fn initial_particles<R: Rng + ?Sized>(
    capacity: u32,
    min_age: f32,
    max_age: f32,
    rng: &mut R,
) -> Vec<ParticleRecord> {
    (0..capacity)
        .map(|_| {
            let life = if max_age > min_age {
                rng.gen_range(min_age..=max_age)
            } else {
                min_age
            };
            ParticleRecord::pre_dead(life)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_record_layout() {
        assert_eq!(ParticleRecord::SIZE, 4 * 6);
        assert_eq!(std::mem::align_of::<ParticleRecord>(), 4);

        let record = ParticleRecord {
            position: Vec2::new(1.0, 2.0),
            age: 3.0,
            life: 4.0,
            velocity: Vec2::new(5.0, 6.0),
        };
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&record));
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_initial_particles_are_pre_dead() {
        let mut rng = StdRng::seed_from_u64(7);
        let particles = initial_particles(64, 0.8, 1.9, &mut rng);

        assert_eq!(particles.len(), 64);
        for p in &particles {
            assert!(p.life >= 0.8 && p.life <= 1.9);
            assert_eq!(p.age, p.life + 1.0);
            assert!(p.is_expired());
            assert_eq!(p.position, Vec2::ZERO);
            assert_eq!(p.velocity, Vec2::ZERO);
        }
    }

    #[test]
    fn test_initial_particles_degenerate_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let particles = initial_particles(3, 1.5, 1.5, &mut rng);
        assert!(particles.iter().all(|p| p.life == 1.5));
    }
}
