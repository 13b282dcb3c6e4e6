//! Sprite images for the particle billboards.
//!
//! A [`SpriteSet`] is `K` RGBA8 images of identical size, uploaded as the
//! layers of one 2D array texture. Each particle picks layer `slot % K`, so a
//! slot keeps its sprite across rebirths while neighbouring slots differ.
//!
//! Images are loaded from disk with the `image` crate, or generated when no
//! files are configured so the effect runs without any assets.

use std::path::Path;

use crate::config::{check_sprite_size, SpriteConfig, MAX_SPRITE_DIMENSION};
use crate::error::{ConfigError, ResourceError};

/// `K` equally sized RGBA8 images.
#[derive(Debug, Clone)]
pub struct SpriteSet {
    width: u32,
    height: u32,
    /// One tightly packed RGBA buffer per layer.
    layers: Vec<Vec<u8>>,
}

impl SpriteSet {
    /// Build a set from raw RGBA layers, checking every layer against `width x height`.
    pub fn from_rgba_layers(width: u32, height: u32, layers: Vec<Vec<u8>>) -> Result<Self, ConfigError> {
        if layers.is_empty() {
            return Err(ConfigError::NoSprites);
        }
        let expected = layer_len(width, height)?;
        if let Some((index, layer)) = layers.iter().enumerate().find(|(_, l)| l.len() != expected) {
            return Err(ConfigError::LayerLength {
                index,
                expected,
                found: layer.len(),
            });
        }
        Ok(Self { width, height, layers })
    }

    /// Load image files, requiring each to be exactly `width x height`.
    pub fn load<P: AsRef<Path>>(paths: &[P], width: u32, height: u32) -> Result<Self, ResourceError> {
        check_sprite_size(width, height)?;
        let mut layers = Vec::with_capacity(paths.len());
        for (index, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            let image = image::open(path)
                .map_err(|source| ResourceError::SpriteLoad {
                    path: path.to_path_buf(),
                    source,
                })?
                .into_rgba8();

            let (found_width, found_height) = image.dimensions();
            if (found_width, found_height) != (width, height) {
                return Err(ConfigError::SpriteDimensions {
                    index,
                    width,
                    height,
                    found_width,
                    found_height,
                }
                .into());
            }
            log::info!("Loaded sprite {} ({}x{})", path.display(), found_width, found_height);
            layers.push(image.into_raw());
        }
        Ok(Self::from_rgba_layers(width, height, layers)?)
    }

    /// Generate `count` petal-shaped sprites with slightly different tints and shapes.
    pub fn procedural_petals(count: u32, width: u32, height: u32) -> Result<Self, ConfigError> {
        let len = layer_len(width, height)?;
        let layers = (0..count).map(|i| petal(i, width, height, len)).collect();
        Self::from_rgba_layers(width, height, layers)
    }

    /// Sprites described by a [`SpriteConfig`]: files if any, otherwise procedural petals.
    pub fn from_config(config: &SpriteConfig) -> Result<Self, ResourceError> {
        if config.paths.is_empty() {
            if config.procedural_count == 0 {
                return Err(ConfigError::NoSprites.into());
            }
            Ok(Self::procedural_petals(config.procedural_count, config.width, config.height)?)
        } else {
            Self::load(&config.paths, config.width, config.height)
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of layers `K`.
    #[inline]
    pub fn len(&self) -> u32 {
        self.layers.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, index: u32) -> &[u8] {
        &self.layers[index as usize]
    }

    pub fn layers(&self) -> impl Iterator<Item = &[u8]> {
        self.layers.iter().map(Vec::as_slice)
    }
}

/// Sprite layer drawn by `slot`.
#[inline]
pub fn sprite_layer(slot: u32, sprite_count: u32) -> u32 {
    slot % sprite_count.max(1)
}

/// Bytes in one tightly packed RGBA8 layer.
fn layer_len(width: u32, height: u32) -> Result<usize, ConfigError> {
    check_sprite_size(width, height)?;
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or(ConfigError::SpriteSize {
            width,
            height,
            max: MAX_SPRITE_DIMENSION,
        })
}

/// One soft petal: an ellipse pinched toward the base with a notch at the tip.
fn petal(variant: u32, width: u32, height: u32, len: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(len);

    // Shape and tint vary slightly per variant.
    let t = (variant % 4) as f32 / 3.0;
    let tilt = (t - 0.5) * 0.6;
    let slim = 0.55 + 0.1 * t;
    let tint = [255.0, 183.0 - 30.0 * t, 197.0 - 20.0 * t];

    let (sin, cos) = tilt.sin_cos();
    for y in 0..height {
        for x in 0..width {
            let u = (x as f32 + 0.5) / width as f32 * 2.0 - 1.0;
            let v = (y as f32 + 0.5) / height as f32 * 2.0 - 1.0;
            let ru = u * cos - v * sin;
            let rv = u * sin + v * cos;

            // Narrower toward the base (rv > 0).
            let half_width = slim * (1.0 - 0.45 * rv.max(0.0));
            let mut d = (ru / half_width).powi(2) + rv.powi(2);

            // Notch at the tip.
            if rv < -0.6 && ru.abs() < 0.12 {
                d = 2.0;
            }

            let alpha = (1.0 - smoothstep(0.7, 1.0, d)).clamp(0.0, 1.0);
            let shade = 0.85 + 0.15 * (1.0 - d.min(1.0));
            data.push((tint[0] * shade) as u8);
            data.push((tint[1] * shade) as u8);
            data.push((tint[2] * shade) as u8);
            data.push((alpha * 255.0) as u8);
        }
    }
    data
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
