use fastnoise_lite::{FastNoiseLite, NoiseType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use terra_geom::Vec2;

const MIN_SCALE: f32 = 0.01;
const OCTAVE_OFFSET_RANGE: i32 = 100_000;

/// How raw fractal sums are mapped to non-negative heights.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// Stretch this field's observed range to [0,1]. Full contrast, but
    /// independently generated tiles disagree at their seams.
    Local,
    /// Divide by the theoretical maximum amplitude. Seam-safe across tiles.
    /// Floored at 0; the rare sums near the peak land slightly above 1.
    Global,
}

fn default_normalize_mode() -> NormalizeMode {
    NormalizeMode::Global
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct NoiseSettings {
    #[serde(default = "default_normalize_mode")]
    pub normalize_mode: NormalizeMode,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_octaves")]
    pub octaves: u32,
    #[serde(default = "default_persistence")]
    pub persistence: f32,
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f32,
    #[serde(default)]
    pub seed: i32,
    #[serde(default)]
    pub offset: Vec2,
}

fn default_scale() -> f32 {
    50.0
}
fn default_octaves() -> u32 {
    6
}
fn default_persistence() -> f32 {
    0.6
}
fn default_lacunarity() -> f32 {
    2.0
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            normalize_mode: default_normalize_mode(),
            scale: default_scale(),
            octaves: default_octaves(),
            persistence: default_persistence(),
            lacunarity: default_lacunarity(),
            seed: 0,
            offset: Vec2::ZERO,
        }
    }
}

impl NoiseSettings {
    /// Copy with every parameter clamped into its usable range.
    pub fn validated(&self) -> Self {
        Self {
            normalize_mode: self.normalize_mode,
            scale: if self.scale.is_finite() {
                self.scale.max(MIN_SCALE)
            } else {
                default_scale()
            },
            octaves: self.octaves.max(1),
            persistence: self.persistence.clamp(0.0, 1.0),
            lacunarity: self.lacunarity.max(1.0),
            seed: self.seed,
            offset: self.offset,
        }
    }

    pub fn is_valid(&self) -> bool {
        *self == self.validated()
    }
}

/// Sum of `persistence^k` for `k < octaves`: the largest magnitude a fractal
/// sum of unit-amplitude octaves can reach.
pub fn max_possible_height(octaves: u32, persistence: f32) -> f32 {
    let mut amplitude = 1.0_f32;
    let mut total = 0.0_f32;
    for _ in 0..octaves.max(1) {
        total += amplitude;
        amplitude *= persistence;
    }
    total
}

fn octave_offsets(settings: &NoiseSettings, sample_center: Vec2) -> Vec<Vec2> {
    let mut rng = ChaCha8Rng::seed_from_u64(settings.seed as u64);
    (0..settings.octaves)
        .map(|_| {
            let rx: i32 = rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE);
            let ry: i32 = rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE);
            Vec2::new(
                rx as f32 + settings.offset.x + sample_center.x,
                ry as f32 - settings.offset.y - sample_center.y,
            )
        })
        .collect()
}

/// Samples `width * height` cells of octave-summed Perlin noise, row-major
/// (`values[y * width + x]`), normalized according to `settings.normalize_mode`.
///
/// Pure: identical inputs give bit-identical output on any thread.
pub fn generate_noise_map(
    width: usize,
    height: usize,
    settings: &NoiseSettings,
    sample_center: Vec2,
) -> Vec<f32> {
    let settings = settings.validated();
    let offsets = octave_offsets(&settings, sample_center);
    let max_possible = max_possible_height(settings.octaves, settings.persistence);

    let mut kernel = FastNoiseLite::with_seed(settings.seed);
    kernel.set_noise_type(Some(NoiseType::Perlin));
    kernel.set_frequency(Some(1.0));

    let half_width = width as f32 / 2.0;
    let half_height = height as f32 / 2.0;
    let mut min_local = f32::MAX;
    let mut max_local = f32::MIN;
    let mut values = vec![0.0_f32; width * height];

    for y in 0..height {
        for x in 0..width {
            let mut amplitude = 1.0_f32;
            let mut frequency = 1.0_f32;
            let mut sum = 0.0_f32;
            for offset in &offsets {
                let sx = (x as f32 - half_width + offset.x) / settings.scale * frequency;
                let sy = (y as f32 - half_height + offset.y) / settings.scale * frequency;
                sum += kernel.get_noise_2d(sx, sy) * amplitude;
                amplitude *= settings.persistence;
                frequency *= settings.lacunarity;
            }
            min_local = min_local.min(sum);
            max_local = max_local.max(sum);
            values[y * width + x] = sum;
        }
    }

    match settings.normalize_mode {
        NormalizeMode::Global => {
            for v in &mut values {
                *v = ((*v + 1.0) / max_possible).max(0.0);
            }
        }
        NormalizeMode::Local => {
            let range = max_local - min_local;
            for v in &mut values {
                *v = if range > 0.0 {
                    (*v - min_local) / range
                } else {
                    0.0
                };
            }
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_clamps_degenerate_parameters() {
        let raw = NoiseSettings {
            scale: -3.0,
            octaves: 0,
            persistence: 1.7,
            lacunarity: 0.25,
            ..NoiseSettings::default()
        };
        let v = raw.validated();
        assert_eq!(v.scale, MIN_SCALE);
        assert_eq!(v.octaves, 1);
        assert_eq!(v.persistence, 1.0);
        assert_eq!(v.lacunarity, 1.0);
        assert!(!raw.is_valid());
        assert!(v.is_valid());
    }

    #[test]
    fn zero_octaves_behaves_as_one() {
        let one = NoiseSettings {
            octaves: 1,
            ..NoiseSettings::default()
        };
        let zero = NoiseSettings {
            octaves: 0,
            ..NoiseSettings::default()
        };
        let a = generate_noise_map(8, 8, &one, Vec2::ZERO);
        let b = generate_noise_map(8, 8, &zero, Vec2::ZERO);
        assert_eq!(a, b);
        assert_eq!(max_possible_height(0, 0.5), 1.0);
    }

    #[test]
    fn octave_offsets_follow_sign_convention() {
        let settings = NoiseSettings {
            octaves: 3,
            offset: Vec2::new(5.0, 7.0),
            ..NoiseSettings::default()
        };
        let at_origin = octave_offsets(&settings, Vec2::ZERO);
        let shifted = octave_offsets(&settings, Vec2::new(10.0, 20.0));
        for (a, b) in at_origin.iter().zip(&shifted) {
            assert_eq!(b.x - a.x, 10.0);
            assert_eq!(b.y - a.y, -20.0);
        }
    }

    #[test]
    fn global_keeps_peaks_above_one() {
        // One octave divides by 1, so every positive raw sample lands above 1.
        let settings = NoiseSettings {
            octaves: 1,
            seed: 3,
            ..NoiseSettings::default()
        };
        let v = generate_noise_map(64, 64, &settings, Vec2::ZERO);
        assert!(v.iter().all(|x| *x >= 0.0));
        assert!(v.iter().any(|x| *x > 1.0));
    }

    #[test]
    fn max_possible_height_geometric_sum() {
        assert!((max_possible_height(4, 0.5) - 1.875).abs() < 1e-6);
        assert_eq!(max_possible_height(3, 1.0), 3.0);
    }
}
