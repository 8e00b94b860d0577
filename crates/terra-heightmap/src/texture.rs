use serde::Deserialize;

use crate::height_map::HeightMap;

/// RGBA8 image handed to the rendering collaborator alongside a mesh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; width * height * 4],
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, px: [u8; 4]) {
        let i = (y * self.width + x) * 4;
        self.rgba[i..i + 4].copy_from_slice(&px);
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline]
fn inverse_lerp(a: f32, b: f32, v: f32) -> f32 {
    if (b - a).abs() <= f32::EPSILON {
        0.0
    } else {
        ((v - a) / (b - a)).clamp(0.0, 1.0)
    }
}

/// Black-to-white ramp of row-major `values` expected in [0,1].
pub fn grayscale_from_values(width: usize, height: usize, values: &[f32]) -> PixelBuffer {
    let mut out = PixelBuffer::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let g = to_u8(values[y * width + x]);
            out.set_pixel(x, y, [g, g, g, 255]);
        }
    }
    out
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TerrainRegion {
    pub name: String,
    /// Upper bound (inclusive) of normalized height covered by this region.
    pub height: f32,
    pub color: [u8; 3],
}

/// Colours each cell with the first region whose `height` bound admits it.
/// Cells above every region keep the last region's colour.
pub fn region_color_map(height_map: &HeightMap, regions: &[TerrainRegion]) -> PixelBuffer {
    let (w, h) = (height_map.width(), height_map.height());
    let mut out = PixelBuffer::new(w, h);
    let Some(fallback) = regions.last() else {
        return out;
    };
    for y in 0..h {
        for x in 0..w {
            let v = inverse_lerp(height_map.min_value, height_map.max_value, height_map.get(x, y));
            let region = regions.iter().find(|r| v <= r.height).unwrap_or(fallback);
            let [r, g, b] = region.color;
            out.set_pixel(x, y, [r, g, b, 255]);
        }
    }
    out
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TextureLayer {
    pub tint: [f32; 3],
    #[serde(default = "d_one")]
    pub tint_strength: f32,
    #[serde(default)]
    pub start_height: f32,
    #[serde(default = "d_blend")]
    pub blend_strength: f32,
}

fn d_one() -> f32 {
    1.0
}
fn d_blend() -> f32 {
    0.05
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TextureSettings {
    #[serde(default = "default_layers")]
    pub layers: Vec<TextureLayer>,
}

fn default_layers() -> Vec<TextureLayer> {
    let layer = |tint: [f32; 3], start_height: f32| TextureLayer {
        tint,
        tint_strength: 1.0,
        start_height,
        blend_strength: d_blend(),
    };
    vec![
        layer([0.20, 0.35, 0.80], 0.0),
        layer([0.85, 0.80, 0.55], 0.30),
        layer([0.30, 0.60, 0.20], 0.36),
        layer([0.40, 0.35, 0.30], 0.60),
        layer([0.95, 0.95, 0.95], 0.85),
    ]
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            layers: default_layers(),
        }
    }
}

impl TextureSettings {
    /// Colour of a surface at normalized height `h` (0 = lowest, 1 = highest),
    /// blending each layer over the previous one around its start height.
    pub fn color_at(&self, h: f32) -> [f32; 3] {
        let mut color = [0.0_f32; 3];
        for layer in &self.layers {
            let half_blend = layer.blend_strength.max(0.0) * 0.5;
            let draw = inverse_lerp(
                -half_blend - 1e-4,
                half_blend,
                h - layer.start_height,
            );
            let strength = layer.tint_strength.clamp(0.0, 1.0);
            for (c, tint) in color.iter_mut().zip(layer.tint) {
                *c = *c * (1.0 - draw) + tint * strength * draw;
            }
        }
        color
    }

    /// Pixel buffer for a height map whose values span `[min_height, max_height]`.
    pub fn build_texture(
        &self,
        height_map: &HeightMap,
        min_height: f32,
        max_height: f32,
    ) -> PixelBuffer {
        let (w, h) = (height_map.width(), height_map.height());
        let mut out = PixelBuffer::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let t = inverse_lerp(min_height, max_height, height_map.get(x, y));
                let [r, g, b] = self.color_at(t);
                out.set_pixel(x, y, [to_u8(r), to_u8(g), to_u8(b), 255]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_spans_black_to_white() {
        let buf = grayscale_from_values(2, 1, &[0.0, 1.0]);
        assert_eq!(buf.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(buf.pixel(1, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn regions_pick_first_matching_bound() {
        let hm = HeightMap::from_values(3, 1, vec![0.0, 0.5, 1.0]);
        let regions = vec![
            TerrainRegion {
                name: "water".into(),
                height: 0.4,
                color: [0, 0, 255],
            },
            TerrainRegion {
                name: "land".into(),
                height: 0.8,
                color: [0, 255, 0],
            },
            TerrainRegion {
                name: "snow".into(),
                height: 1.0,
                color: [255, 255, 255],
            },
        ];
        let buf = region_color_map(&hm, &regions);
        assert_eq!(buf.pixel(0, 0), [0, 0, 255, 255]);
        assert_eq!(buf.pixel(1, 0), [0, 255, 0, 255]);
        assert_eq!(buf.pixel(2, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn layers_take_over_above_start_height() {
        let tex = TextureSettings {
            layers: vec![
                TextureLayer {
                    tint: [1.0, 0.0, 0.0],
                    tint_strength: 1.0,
                    start_height: 0.0,
                    blend_strength: 0.0,
                },
                TextureLayer {
                    tint: [0.0, 0.0, 1.0],
                    tint_strength: 1.0,
                    start_height: 0.5,
                    blend_strength: 0.0,
                },
            ],
        };
        assert_eq!(tex.color_at(0.2), [1.0, 0.0, 0.0]);
        assert_eq!(tex.color_at(0.9), [0.0, 0.0, 1.0]);
    }
}
