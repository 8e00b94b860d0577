use terra_geom::{Vec2, Vec3};
use terra_heightmap::HeightMap;

use crate::layout::{LodLayout, VertexKind, VertexRef};
use crate::settings::{MeshSettings, NUM_SUPPORTED_LODS, lod_skip_increment};
use crate::surface::SurfaceMesh;

// Scratch geometry: emitted vertices plus the hidden border ring whose
// triangles only contribute to normals.
struct MeshData {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<u32>,
    border_positions: Vec<Vec3>,
    border_triangles: Vec<[VertexRef; 3]>,
}

impl MeshData {
    fn new(layout: &LodLayout) -> Self {
        let emitted = layout.mesh_vertex_count();
        let n = layout.side();
        let skip = layout.skip();
        Self {
            positions: vec![Vec3::ZERO; emitted],
            uvs: vec![Vec2::ZERO; emitted],
            triangles: Vec::with_capacity(LodLayout::expected_triangles(n, skip) * 3),
            border_positions: vec![Vec3::ZERO; layout.border_vertex_count()],
            border_triangles: Vec::with_capacity(8 * (n - 1)),
        }
    }

    fn add_vertex(&mut self, at: VertexRef, position: Vec3, uv: Vec2) {
        match at {
            VertexRef::Mesh(i) => {
                self.positions[i as usize] = position;
                self.uvs[i as usize] = uv;
            }
            VertexRef::Border(i) => self.border_positions[i as usize] = position,
        }
    }

    fn add_triangle(&mut self, a: VertexRef, b: VertexRef, c: VertexRef) {
        match (a, b, c) {
            (VertexRef::Mesh(a), VertexRef::Mesh(b), VertexRef::Mesh(c)) => {
                self.triangles.extend_from_slice(&[a, b, c]);
            }
            _ => self.border_triangles.push([a, b, c]),
        }
    }

    #[inline]
    fn resolve(&self, v: VertexRef) -> Vec3 {
        match v {
            VertexRef::Mesh(i) => self.positions[i as usize],
            VertexRef::Border(i) => self.border_positions[i as usize],
        }
    }

    // Unnormalized face normals weight each contribution by triangle area.
    fn smooth_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for t in self.triangles.chunks_exact(3) {
            let [a, b, c] = [t[0], t[1], t[2]].map(|i| i as usize);
            let n = surface_normal(self.positions[a], self.positions[b], self.positions[c]);
            normals[a] += n;
            normals[b] += n;
            normals[c] += n;
        }
        for tri in &self.border_triangles {
            let [pa, pb, pc] = (*tri).map(|v| self.resolve(v));
            let n = surface_normal(pa, pb, pc);
            for v in tri {
                if let VertexRef::Mesh(i) = v {
                    normals[*i as usize] += n;
                }
            }
        }
        for n in &mut normals {
            *n = n.normalized();
        }
        normals
    }

    fn into_surface(self, lod: usize, flat_shading: bool) -> SurfaceMesh {
        let normals = if flat_shading {
            vec![Vec3::ZERO; self.positions.len()]
        } else {
            self.smooth_normals()
        };
        let mut mesh = SurfaceMesh {
            pos: Vec::with_capacity(self.positions.len() * 3),
            norm: Vec::with_capacity(self.positions.len() * 3),
            uv: Vec::with_capacity(self.positions.len() * 2),
            idx: self.triangles,
            lod,
            flat_shaded: false,
        };
        for ((p, uv), n) in self.positions.iter().zip(&self.uvs).zip(&normals) {
            mesh.push_vertex(*p, *uv);
            mesh.norm.extend_from_slice(&n.to_array());
        }
        if flat_shading {
            mesh.into_flat_shaded()
        } else {
            mesh
        }
    }
}

#[inline]
fn surface_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a)
}

/// Height for an edge-connection cell: linear blend of the two main vertices
/// bracketing it along its edge, so it lies exactly on the coarse edge the
/// neighbouring main triangle draws.
pub fn edge_connection_height(height_map: &HeightMap, x: usize, y: usize, skip: usize) -> f32 {
    let n = height_map.width();
    let vertical = x == 2 || x == n - 3;
    let along = if vertical { y - 2 } else { x - 2 };
    let dist_a = along % skip;
    let dist_b = skip - dist_a;
    let t = dist_a as f32 / skip as f32;
    let (ha, hb) = if vertical {
        (height_map.get(x, y - dist_a), height_map.get(x, y + dist_b))
    } else {
        (height_map.get(x - dist_a, y), height_map.get(x + dist_b, y))
    };
    ha * (1.0 - t) + hb * t
}

/// Triangulates `height_map` at `lod` into a centred, Y-up surface of side
/// [`MeshSettings::mesh_world_size`].
///
/// The outermost ring of the field is never emitted; the next ring is always
/// emitted at full detail, so two adjacent tiles built at different LODs share
/// bit-identical edge vertices.
///
/// # Panics
///
/// If `height_map` is not `verts_per_line` on each side.
pub fn build_terrain_mesh(
    height_map: &HeightMap,
    settings: &MeshSettings,
    lod: usize,
) -> SurfaceMesh {
    let n = settings.verts_per_line();
    assert!(
        height_map.width() == n && height_map.height() == n,
        "height map is {}x{}, mesh settings expect {n}x{n}",
        height_map.width(),
        height_map.height()
    );
    let lod = lod.min(NUM_SUPPORTED_LODS - 1);
    let skip = lod_skip_increment(lod);
    let layout = LodLayout::new(n, skip);
    let mut data = MeshData::new(&layout);

    let world_size = settings.mesh_world_size();
    let top_left = Vec2::new(-world_size / 2.0, world_size / 2.0);
    let visible_span = (n - 3) as f32;

    for y in 0..n {
        for x in 0..n {
            let kind = layout.kind(x, y);
            let Some(at) = layout.vertex(x, y) else {
                continue;
            };

            let uv = Vec2::new((x as f32 - 1.0) / visible_span, (y as f32 - 1.0) / visible_span);
            let height = if kind == VertexKind::EdgeConnection {
                edge_connection_height(height_map, x, y, skip)
            } else {
                height_map.get(x, y)
            };
            let position = Vec3::new(
                top_left.x + uv.x * world_size,
                height,
                top_left.y - uv.y * world_size,
            );
            data.add_vertex(at, position, uv);

            let opens_quad = x < n - 1
                && y < n - 1
                && (kind != VertexKind::EdgeConnection || (x != 2 && y != 2));
            if !opens_quad {
                continue;
            }
            let step = if kind == VertexKind::Main && x != n - 3 && y != n - 3 {
                skip
            } else {
                1
            };
            let corners = (
                layout.vertex(x + step, y),
                layout.vertex(x, y + step),
                layout.vertex(x + step, y + step),
            );
            let (Some(b), Some(c), Some(d)) = corners else {
                debug_assert!(false, "quad at ({x},{y}) step {step} reaches a skipped cell");
                continue;
            };
            data.add_triangle(at, d, c);
            data.add_triangle(at, b, d);
        }
    }

    debug_assert_eq!(data.positions.len(), LodLayout::expected_mesh_vertices(n, skip));
    debug_assert_eq!(data.triangles.len(), LodLayout::expected_triangles(n, skip) * 3);
    log::trace!(
        "meshed {n}x{n} field at lod {lod}: {} verts, {} tris",
        data.positions.len(),
        data.triangles.len() / 3
    );

    data.into_surface(lod, settings.use_flat_shading)
}
