//! Precomputed two-channel noise field.
//!
//! The simulation kernel runs one invocation per slot with no shared RNG
//! state, so rebirth samples are looked up from a field of uniform values in
//! `[0, 1)` instead of generated. Each lookup hashes the slot index, the
//! frame number and a per-quantity salt into a texel index, giving every
//! invocation an independent-looking sample without any coordination.
//!
//! The hash is bit-for-bit the same as [`HASH_WGSL`], so the host reference
//! kernel and the GPU kernel read identical texels.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Side length of the (square) noise field.
pub const NOISE_SIZE: u32 = 512;

/// Number of texels in the field.
pub const NOISE_LEN: u32 = NOISE_SIZE * NOISE_SIZE;

/// Salt for the direction/speed sample of a rebirth.
pub const STREAM_DIRECTION: u32 = 0x0000_0000;

/// Salt for the lifetime sample of a rebirth.
pub const STREAM_LIFE: u32 = 0x68e3_1da4;

/// WGSL twin of [`hash`] and [`noise_index`].
pub const HASH_WGSL: &str = r#"
fn hash(n: u32) -> u32 {
    var x = n;
    x = x ^ (x >> 17u);
    x = x * 0xed5ad4bbu;
    x = x ^ (x >> 11u);
    x = x * 0xac4c1b51u;
    x = x ^ (x >> 15u);
    x = x * 0x31848babu;
    x = x ^ (x >> 14u);
    return x;
}

fn noise_index(slot: u32, frame: u32, salt: u32) -> u32 {
    return hash(slot + hash(frame ^ salt)) % NOISE_LEN;
}
"#;

/// Integer hash used to scatter lookups across the field.
#[inline]
pub fn hash(n: u32) -> u32 {
    let mut x = n;
    x ^= x >> 17;
    x = x.wrapping_mul(0xed5a_d4bb);
    x ^= x >> 11;
    x = x.wrapping_mul(0xac4c_1b51);
    x ^= x >> 15;
    x = x.wrapping_mul(0x3184_8bab);
    x ^= x >> 14;
    x
}

/// Texel index sampled by `slot` on `frame` for the quantity identified by `salt`.
#[inline]
pub fn noise_index(slot: u32, frame: u32, salt: u32) -> u32 {
    hash(slot.wrapping_add(hash(frame ^ salt))) % NOISE_LEN
}

/// The field itself, `NOISE_LEN` pairs of uniform floats.
#[derive(Clone)]
pub struct NoiseField {
    texels: Vec<[f32; 2]>,
}

impl NoiseField {
    /// Generate a field from a seed. The same seed always yields the same field.
    pub fn generate(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let texels = (0..NOISE_LEN).map(|_| [rng.gen::<f32>(), rng.gen::<f32>()]).collect();
        Self { texels }
    }

    /// Raw texel data for upload.
    pub fn texels(&self) -> &[[f32; 2]] {
        &self.texels
    }

    /// Look up the sample for one invocation.
    #[inline]
    pub fn sample(&self, slot: u32, frame: u32, salt: u32) -> Vec2 {
        let [r, g] = self.texels[noise_index(slot, frame, salt) as usize];
        Vec2::new(r, g)
    }
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField").field("len", &self.texels.len()).finish()
    }
}
