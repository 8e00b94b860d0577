use serde::Deserialize;
use terra_geom::Vec2;

use crate::curve::HeightCurve;
use crate::falloff::FalloffCache;
use crate::noise::{NoiseSettings, generate_noise_map};

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HeightMapSettings {
    #[serde(default)]
    pub noise: NoiseSettings,
    #[serde(default)]
    pub use_falloff: bool,
    #[serde(default)]
    pub curve: Option<HeightCurve>,
    #[serde(default = "default_height_multiplier")]
    pub height_multiplier: f32,
}

fn default_height_multiplier() -> f32 {
    30.0
}

impl Default for HeightMapSettings {
    fn default() -> Self {
        Self {
            noise: NoiseSettings::default(),
            use_falloff: false,
            curve: None,
            height_multiplier: default_height_multiplier(),
        }
    }
}

impl HeightMapSettings {
    pub fn validated(&self) -> Self {
        let height_multiplier = if self.height_multiplier.is_finite() {
            self.height_multiplier
        } else {
            log::warn!("height multiplier {} is not finite; using default", self.height_multiplier);
            default_height_multiplier()
        };
        Self {
            noise: self.noise.validated(),
            use_falloff: self.use_falloff,
            curve: self.curve.clone(),
            height_multiplier,
        }
    }

    fn remap_factor(&self, v: f32) -> f32 {
        match &self.curve {
            Some(curve) => curve.evaluate(v),
            None => 1.0,
        }
    }

    /// Height produced by a normalized noise value of 0.
    pub fn min_height(&self) -> f32 {
        self.height_multiplier * self.remap_factor(0.0)
    }

    /// Height produced by a normalized noise value of 1.
    pub fn max_height(&self) -> f32 {
        self.height_multiplier * self.remap_factor(1.0)
    }
}

/// Immutable square-or-rectangular height field plus the range observed while
/// building it.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightMap {
    width: usize,
    height: usize,
    values: Vec<f32>,
    pub min_value: f32,
    pub max_value: f32,
}

impl HeightMap {
    /// Wraps raw row-major values, computing the observed range.
    /// `values` must hold exactly `width * height` cells.
    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), width * height, "height map buffer size");
        let (min_value, max_value) = values
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Self {
            width,
            height,
            values,
            min_value,
            max_value,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[self.idx(x, y)]
    }
}

/// Builds a height field using the process-wide falloff cache.
pub fn build_height_map(
    width: usize,
    height: usize,
    settings: &HeightMapSettings,
    sample_center: Vec2,
) -> HeightMap {
    build_height_map_with(width, height, settings, sample_center, FalloffCache::shared())
}

/// Noise → optional falloff subtraction → curve remap × multiplier.
///
/// Falloff is subtracted from the normalized noise before remapping so the
/// island silhouette survives any curve.
pub fn build_height_map_with(
    width: usize,
    height: usize,
    settings: &HeightMapSettings,
    sample_center: Vec2,
    falloff_cache: &FalloffCache,
) -> HeightMap {
    let mut values = generate_noise_map(width, height, &settings.noise, sample_center);

    if settings.use_falloff {
        let side = width.max(height);
        let falloff = falloff_cache.get(side);
        for y in 0..height {
            for x in 0..width {
                let v = &mut values[y * width + x];
                *v = (*v - falloff[y * side + x]).clamp(0.0, 1.0);
            }
        }
    }

    let mut min_value = f32::MAX;
    let mut max_value = f32::MIN;
    for v in &mut values {
        *v *= settings.remap_factor(*v) * settings.height_multiplier;
        min_value = min_value.min(*v);
        max_value = max_value.max(*v);
    }

    HeightMap {
        width,
        height,
        values,
        min_value,
        max_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurveKey;
    use crate::falloff::generate_falloff_map;
    use crate::noise::NormalizeMode;

    fn settings() -> HeightMapSettings {
        HeightMapSettings {
            noise: NoiseSettings {
                normalize_mode: NormalizeMode::Local,
                seed: 7,
                octaves: 4,
                ..NoiseSettings::default()
            },
            use_falloff: false,
            curve: None,
            height_multiplier: 10.0,
        }
    }

    #[test]
    fn multiplier_scales_normalized_noise() {
        let s = settings();
        let noise = generate_noise_map(12, 12, &s.noise, Vec2::ZERO);
        let hm = build_height_map_with(12, 12, &s, Vec2::ZERO, &FalloffCache::new());
        for (n, h) in noise.iter().zip(hm.values()) {
            assert!((n * 10.0 - h).abs() < 1e-5);
        }
        assert!((hm.max_value - 10.0).abs() < 1e-4);
        assert!(hm.min_value.abs() < 1e-4);
    }

    #[test]
    fn curve_applies_multiplicatively() {
        let mut s = settings();
        s.curve = Some(HeightCurve::constant(0.5));
        let noise = generate_noise_map(6, 6, &s.noise, Vec2::ZERO);
        let hm = build_height_map_with(6, 6, &s, Vec2::ZERO, &FalloffCache::new());
        for (n, h) in noise.iter().zip(hm.values()) {
            assert!((n * 0.5 * 10.0 - h).abs() < 1e-5);
        }
    }

    #[test]
    fn falloff_flattens_edges() {
        let mut s = settings();
        s.use_falloff = true;
        let size = 40;
        let hm = build_height_map_with(size, size, &s, Vec2::ZERO, &FalloffCache::new());
        // Corner falloff is ~1 so whatever the noise was, the corner sinks to 0.
        assert!(hm.get(0, 0).abs() < 1e-3);
        assert!(hm.values().iter().all(|v| *v >= 0.0 && *v <= 10.0 + 1e-4));
    }

    #[test]
    fn falloff_is_subtracted_before_the_curve() {
        let mut s = settings();
        s.use_falloff = true;
        s.curve = Some(HeightCurve::new(vec![
            CurveKey::new(0.0, 0.0),
            CurveKey::new(0.5, 0.1),
            CurveKey::new(1.0, 1.0),
        ]));
        let size = 24;
        let noise = generate_noise_map(size, size, &s.noise, Vec2::ZERO);
        let falloff = generate_falloff_map(size);
        let curve = s.curve.clone().unwrap_or_default();
        let hm = build_height_map_with(size, size, &s, Vec2::ZERO, &FalloffCache::new());
        for (i, h) in hm.values().iter().enumerate() {
            let u = (noise[i] - falloff[i]).clamp(0.0, 1.0);
            let expected = u * curve.evaluate(u) * s.height_multiplier;
            assert!((expected - h).abs() < 1e-5, "cell {i}: {h} != {expected}");
        }
    }

    #[test]
    fn build_is_bit_identical_across_calls() {
        let s = HeightMapSettings {
            use_falloff: true,
            curve: Some(HeightCurve::linear()),
            ..HeightMapSettings::default()
        };
        let center = Vec2::new(51.0, -102.0);
        let a = build_height_map(53, 53, &s, center);
        let b = build_height_map(53, 53, &s, center);
        let bits = |hm: &HeightMap| hm.values().iter().map(|v| v.to_bits()).collect::<Vec<u32>>();
        assert_eq!(bits(&a), bits(&b));
        assert_eq!(a.min_value.to_bits(), b.min_value.to_bits());
        assert_eq!(a.max_value.to_bits(), b.max_value.to_bits());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "height map buffer size")]
    fn from_values_rejects_wrong_length() {
        HeightMap::from_values(3, 3, vec![0.0; 4]);
    }

    #[test]
    fn min_max_height_follow_curve_endpoints() {
        let mut s = settings();
        s.curve = Some(HeightCurve::new(vec![
            CurveKey::new(0.0, 0.2),
            CurveKey::new(1.0, 0.9),
        ]));
        assert!((s.min_height() - 2.0).abs() < 1e-5);
        assert!((s.max_height() - 9.0).abs() < 1e-5);
    }

    #[test]
    fn from_values_tracks_range() {
        let hm = HeightMap::from_values(2, 2, vec![1.0, -2.0, 5.0, 0.0]);
        assert_eq!(hm.min_value, -2.0);
        assert_eq!(hm.max_value, 5.0);
        assert_eq!(hm.get(0, 1), 5.0);
    }
}
