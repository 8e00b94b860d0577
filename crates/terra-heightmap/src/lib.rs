//! Height-field synthesis: seeded fractal noise, falloff masks, remapping curves
//! and the pixel buffers derived from them.
#![forbid(unsafe_code)]

pub mod curve;
pub mod falloff;
pub mod height_map;
pub mod noise;
pub mod texture;

pub use curve::{CurveKey, HeightCurve};
pub use falloff::{FalloffCache, FalloffCacheStats, generate_falloff_map};
pub use height_map::{HeightMap, HeightMapSettings, build_height_map, build_height_map_with};
pub use noise::{NoiseSettings, NormalizeMode, generate_noise_map, max_possible_height};
pub use texture::{
    PixelBuffer, TerrainRegion, TextureLayer, TextureSettings, grayscale_from_values,
    region_color_map,
};
