use serde::Deserialize;

pub const NUM_SUPPORTED_LODS: usize = 5;
pub const SUPPORTED_CHUNK_SIZES: [usize; 9] = [48, 72, 96, 120, 144, 168, 192, 216, 240];
/// Flat shading triples the vertex count, so only the smaller sizes are offered.
pub const FLAT_SHADED_CHUNK_SIZE_COUNT: usize = 3;

// Ring of out-of-mesh vertices on each side, plus the mesh-edge ring, plus the
// closing vertex of the visible grid.
const BORDER_VERTS: usize = 5;

/// Grid stride for a LOD: 1 at full detail, then 2, 4, 6, 8.
/// Every value divides every entry of [`SUPPORTED_CHUNK_SIZES`].
#[inline]
pub fn lod_skip_increment(lod: usize) -> usize {
    let lod = lod.min(NUM_SUPPORTED_LODS - 1);
    if lod == 0 { 1 } else { lod * 2 }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MeshSettings {
    #[serde(default = "default_mesh_scale")]
    pub mesh_scale: f32,
    #[serde(default)]
    pub use_flat_shading: bool,
    #[serde(default)]
    pub chunk_size_index: usize,
    #[serde(default)]
    pub flat_shaded_chunk_size_index: usize,
}

fn default_mesh_scale() -> f32 {
    2.5
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            mesh_scale: default_mesh_scale(),
            use_flat_shading: false,
            chunk_size_index: 0,
            flat_shaded_chunk_size_index: 0,
        }
    }
}

impl MeshSettings {
    pub fn validated(&self) -> Self {
        let mesh_scale = if self.mesh_scale.is_finite() && self.mesh_scale > 0.0 {
            self.mesh_scale
        } else {
            log::warn!("mesh_scale {} must be positive; using default", self.mesh_scale);
            default_mesh_scale()
        };
        Self {
            mesh_scale,
            use_flat_shading: self.use_flat_shading,
            chunk_size_index: self.chunk_size_index.min(SUPPORTED_CHUNK_SIZES.len() - 1),
            flat_shaded_chunk_size_index: self
                .flat_shaded_chunk_size_index
                .min(FLAT_SHADED_CHUNK_SIZE_COUNT - 1),
        }
    }

    /// Visible cells per tile side at LOD 0.
    pub fn chunk_size(&self) -> usize {
        if self.use_flat_shading {
            SUPPORTED_CHUNK_SIZES[self
                .flat_shaded_chunk_size_index
                .min(FLAT_SHADED_CHUNK_SIZE_COUNT - 1)]
        } else {
            SUPPORTED_CHUNK_SIZES[self.chunk_size_index.min(SUPPORTED_CHUNK_SIZES.len() - 1)]
        }
    }

    /// Height-field side length, border rings included.
    pub fn verts_per_line(&self) -> usize {
        self.chunk_size() + BORDER_VERTS
    }

    /// World-space side length of one tile.
    pub fn mesh_world_size(&self) -> f32 {
        (self.verts_per_line() - 3) as f32 * self.mesh_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_divide_every_chunk_size() {
        for size in SUPPORTED_CHUNK_SIZES {
            for lod in 0..NUM_SUPPORTED_LODS {
                assert_eq!(size % lod_skip_increment(lod), 0, "size {size} lod {lod}");
            }
        }
    }

    #[test]
    fn sizes_follow_index_and_shading() {
        let mut s = MeshSettings::default();
        assert_eq!(s.verts_per_line(), 53);
        assert_eq!(s.mesh_world_size(), 125.0);
        s.chunk_size_index = 8;
        assert_eq!(s.chunk_size(), 240);
        s.use_flat_shading = true;
        s.flat_shaded_chunk_size_index = 7;
        assert_eq!(s.chunk_size(), 96);
    }

    #[test]
    fn validated_repairs_bad_values() {
        let s = MeshSettings {
            mesh_scale: -1.0,
            use_flat_shading: false,
            chunk_size_index: 99,
            flat_shaded_chunk_size_index: 99,
        }
        .validated();
        assert_eq!(s.mesh_scale, 2.5);
        assert_eq!(s.chunk_size_index, 8);
        assert_eq!(s.flat_shaded_chunk_size_index, 2);
        assert_eq!(lod_skip_increment(17), 8);
    }
}
