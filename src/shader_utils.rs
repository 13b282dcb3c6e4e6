//! WGSL sources for the simulation and render passes.
//!
//! Shaders are assembled once at startup from the struct definitions that
//! sit next to their Rust twins ([`ParticleRecord::WGSL_STRUCT`],
//! [`SimUniforms::WGSL_STRUCT`], [`RenderUniforms::WGSL_STRUCT`]) so layouts
//! are written down in exactly one place.
//!
//! # Bindings
//!
//! Simulation (`@group(0)`):
//!
//! | Binding | Resource |
//! |---------|----------|
//! | 0 | `particles_in`, read buffer |
//! | 1 | `particles_out`, write buffer |
//! | 2 | `sim`, [`SimUniforms`] |
//! | 3 | `noise`, the two-channel noise field |
//!
//! Render (`@group(0)`):
//!
//! | Binding | Resource |
//! |---------|----------|
//! | 0 | `view`, [`RenderUniforms`] |
//! | 1 | `sprites`, 2D texture array |
//! | 2 | `sprite_sampler` |

use crate::noise::{HASH_WGSL, NOISE_LEN, STREAM_DIRECTION, STREAM_LIFE};
use crate::particle::ParticleRecord;
use crate::uniforms::{RenderUniforms, SimUniforms};

/// Invocations per simulation workgroup.
pub const WORKGROUP_SIZE: u32 = 64;

/// Compute shader advancing every active slot by one frame.
pub fn simulation_shader() -> String {
    let particle_struct = ParticleRecord::WGSL_STRUCT;
    let uniforms_struct = SimUniforms::WGSL_STRUCT;

    format!(
        r#"const NOISE_LEN: u32 = {NOISE_LEN}u;
const STREAM_DIRECTION: u32 = {STREAM_DIRECTION}u;
const STREAM_LIFE: u32 = {STREAM_LIFE}u;

{particle_struct}
{uniforms_struct}
@group(0) @binding(0)
var<storage, read> particles_in: array<Particle>;

@group(0) @binding(1)
var<storage, read_write> particles_out: array<Particle>;

@group(0) @binding(2)
var<uniform> sim: SimUniforms;

@group(0) @binding(3)
var<storage, read> noise: array<vec2<f32>>;
{HASH_WGSL}
fn pick(lo: f32, hi: f32, t: f32) -> f32 {{
    return clamp(lo + t * (hi - lo), lo, hi);
}}

@compute @workgroup_size({WORKGROUP_SIZE})
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let slot = global_id.x;
    if slot >= sim.active_count {{
        return;
    }}

    let p = particles_in[slot];
    let dt = sim.time_delta;
    let new_age = p.age + dt;
    var next: Particle;

    if new_age > p.life {{
        // Rebirth at the emitter.
        let dir = noise[noise_index(slot, sim.frame, STREAM_DIRECTION)];
        let life = noise[noise_index(slot, sim.frame, STREAM_LIFE)];
        let theta = pick(sim.min_theta, sim.max_theta, dir.x);
        let speed = pick(sim.min_speed, sim.max_speed, dir.y);

        next.position = sim.origin;
        next.age = 0.0;
        next.life = pick(sim.min_age, sim.max_age, life.x);
        next.velocity = vec2<f32>(cos(theta), sin(theta)) * speed;
    }} else {{
        // Position moves with the velocity from the start of the step.
        next.position = p.position + p.velocity * dt;
        next.age = new_age;
        next.life = p.life;
        next.velocity = p.velocity + sim.gravity * dt;
    }}

    particles_out[slot] = next;
}}
"#
    )
}

/// Vertex/fragment shader drawing one textured billboard per instance.
pub fn render_shader() -> String {
    let uniforms_struct = RenderUniforms::WGSL_STRUCT;

    format!(
        r#"{uniforms_struct}
@group(0) @binding(0)
var<uniform> view: RenderUniforms;

@group(0) @binding(1)
var sprites: texture_2d_array<f32>;

@group(0) @binding(2)
var sprite_sampler: sampler;

struct VertexOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_coord: vec2<f32>,
    @location(1) @interpolate(flat) layer: u32,
    @location(2) fade: f32,
}};

@vertex
fn vs_main(
    @builtin(instance_index) slot: u32,
    @location(0) coord: vec2<f32>,
    @location(1) tex_coord: vec2<f32>,
    @location(2) position: vec2<f32>,
    @location(3) age: f32,
    @location(4) life: f32,
) -> VertexOutput {{
    let world = position + coord * view.size;

    var out: VertexOutput;
    out.clip_position = view.view_proj * vec4<f32>(world, 0.0, 1.0);
    out.tex_coord = tex_coord;
    out.layer = slot % max(view.sprite_count, 1u);
    out.fade = 1.0 - clamp(age / max(life, 0.0001), 0.0, 1.0);
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    let color = textureSample(sprites, sprite_sampler, in.tex_coord, in.layer);
    return vec4<f32>(color.rgb, color.a * in.fade);
}}
"#
    )
}
