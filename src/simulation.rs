//! The per-slot simulation kernel.
//!
//! [`simulate_slot`] is the host twin of the `main` entry point in
//! [`shader_utils::simulation_shader`](crate::shader_utils::simulation_shader).
//! It is what the [`ReferenceDevice`](crate::ReferenceDevice) executes and
//! what the kernel's properties are tested against.
//!
//! For a slot with record `p` and frame delta `dt`:
//!
//! - if `p.age + dt > p.life` the particle is reborn at the emission origin
//!   with a fresh life, direction and speed drawn from the noise field;
//! - otherwise it is integrated with semi-implicit Euler: the position moves
//!   by the *pre-step* velocity, then gravity is applied to the velocity.
//!
//! A slot only ever reads its own record from the read buffer and writes its
//! own record in the write buffer, so slots can run in any order.

use glam::Vec2;

use crate::noise::{NoiseField, STREAM_DIRECTION, STREAM_LIFE};
use crate::particle::ParticleRecord;
use crate::uniforms::SimUniforms;

/// Simulation parameters, fixed at init except for `origin`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationParams {
    /// Particles per second added to the active range.
    pub birth_rate: f32,
    pub min_age: f32,
    pub max_age: f32,
    /// Respawn direction range in radians, within `[-pi, pi]`.
    pub min_theta: f32,
    pub max_theta: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub gravity: Vec2,
    /// Current emission point. Recomputed each frame by the loop.
    pub origin: Vec2,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            birth_rate: 900.0,
            min_age: 0.8,
            max_age: 1.9,
            min_theta: -std::f32::consts::PI,
            max_theta: std::f32::consts::PI,
            min_speed: 0.0,
            max_speed: 10.5,
            gravity: Vec2::new(0.0, -500.0),
            origin: Vec2::new(0.0, 300.0),
        }
    }
}

/// Uniform pick in `[lo, hi]` for `t` in `[0, 1)`.
#[inline]
fn pick(lo: f32, hi: f32, t: f32) -> f32 {
    (lo + t * (hi - lo)).clamp(lo, hi)
}

/// Advance one slot by one frame.
pub fn simulate_slot(
    p: &ParticleRecord,
    slot: u32,
    u: &SimUniforms,
    noise: &NoiseField,
) -> ParticleRecord {
    let dt = u.time_delta;
    let new_age = p.age + dt;

    if new_age > p.life {
        let dir = noise.sample(slot, u.frame, STREAM_DIRECTION);
        let life = noise.sample(slot, u.frame, STREAM_LIFE);
        let theta = pick(u.min_theta, u.max_theta, dir.x);
        let speed = pick(u.min_speed, u.max_speed, dir.y);

        ParticleRecord {
            position: u.origin,
            age: 0.0,
            life: pick(u.min_age, u.max_age, life.x),
            velocity: Vec2::new(theta.cos(), theta.sin()) * speed,
        }
    } else {
        ParticleRecord {
            position: p.position + p.velocity * dt,
            age: new_age,
            life: p.life,
            velocity: p.velocity + u.gravity * dt,
        }
    }
}

/// Run the kernel over the active prefix: `write[i] = f(read[i])` for `i < active_count`.
///
/// Slots at or beyond `active_count` in `write` are left untouched.
pub fn simulate(read: &[ParticleRecord], write: &mut [ParticleRecord], u: &SimUniforms, noise: &NoiseField) {
    let active = (u.active_count as usize).min(read.len()).min(write.len());
    for (slot, (src, dst)) in read[..active].iter().zip(&mut write[..active]).enumerate() {
        *dst = simulate_slot(src, slot as u32, u, noise);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniforms(dt: f32) -> SimUniforms {
        let params = SimulationParams {
            gravity: Vec2::new(0.0, -10.0),
            origin: Vec2::new(12.0, 34.0),
            ..Default::default()
        };
        SimUniforms::new(&params, dt, 1.0, 1, 0)
    }

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_expired_particle_is_reborn() {
        let noise = NoiseField::generate(1);
        let u = uniforms(0.2);
        let p = ParticleRecord {
            position: Vec2::new(-5.0, 5.0),
            age: 0.9,
            life: 1.0,
            velocity: Vec2::new(1.0, 1.0),
        };

        let next = simulate_slot(&p, 0, &u, &noise);
        assert_eq!(next.age, 0.0);
        assert_eq!(next.position, u.origin);
        assert!(next.life >= u.min_age && next.life <= u.max_age);
        assert!(next.velocity.length() <= u.max_speed + 1e-4);
    }

    #[test]
    fn test_live_particle_uses_pre_step_velocity() {
        let noise = NoiseField::generate(1);
        let u = uniforms(0.2);
        let p = ParticleRecord {
            position: Vec2::new(1.0, 1.0),
            age: 0.1,
            life: 1.0,
            velocity: Vec2::new(2.0, 0.0),
        };

        let next = simulate_slot(&p, 0, &u, &noise);
        // Old velocity (2, 0) moves the particle; the updated (2, -2) would not.
        assert!(approx(next.position, Vec2::new(1.4, 1.0)));
        assert!(approx(next.velocity, Vec2::new(2.0, -2.0)));
        assert_eq!(next.age, 0.1 + 0.2);
        assert_eq!(next.life, 1.0);
    }

    #[test]
    fn test_age_equal_to_life_is_still_alive() {
        let noise = NoiseField::generate(1);
        let u = uniforms(0.0);
        let p = ParticleRecord {
            position: Vec2::ONE,
            age: 1.0,
            life: 1.0,
            velocity: Vec2::ZERO,
        };
        let next = simulate_slot(&p, 0, &u, &noise);
        assert_eq!(next.position, Vec2::ONE);
        assert_eq!(next.age, 1.0);
    }

    #[test]
    fn test_pre_dead_particle_reborn_with_zero_delta() {
        let noise = NoiseField::generate(1);
        let u = uniforms(0.0);
        let next = simulate_slot(&ParticleRecord::pre_dead(1.2), 3, &u, &noise);
        assert_eq!(next.age, 0.0);
        assert_eq!(next.position, u.origin);
    }

    #[test]
    fn test_simulate_only_touches_active_prefix() {
        let noise = NoiseField::generate(1);
        let mut u = uniforms(0.1);
        u.active_count = 2;

        let read = vec![ParticleRecord::pre_dead(1.0); 4];
        let sentinel = ParticleRecord {
            position: Vec2::splat(-99.0),
            age: -1.0,
            life: -1.0,
            velocity: Vec2::ZERO,
        };
        let mut write = vec![sentinel; 4];

        simulate(&read, &mut write, &u, &noise);
        assert_eq!(write[0].age, 0.0);
        assert_eq!(write[1].age, 0.0);
        assert_eq!(write[2], sentinel);
        assert_eq!(write[3], sentinel);
    }

    #[test]
    fn test_degenerate_ranges_pin_samples() {
        let noise = NoiseField::generate(9);
        let params = SimulationParams {
            min_age: 1.5,
            max_age: 1.5,
            min_theta: 0.0,
            max_theta: 0.0,
            min_speed: 3.0,
            max_speed: 3.0,
            ..Default::default()
        };
        let u = SimUniforms::new(&params, 0.016, 0.0, 1, 5);
        let next = simulate_slot(&ParticleRecord::pre_dead(1.0), 0, &u, &noise);
        assert_eq!(next.life, 1.5);
        assert!(approx(next.velocity, Vec2::new(3.0, 0.0)));
    }
}
