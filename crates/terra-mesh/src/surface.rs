use terra_geom::{Vec2, Vec3};

/// Indexed triangle surface in flat buffers ready for upload: three floats per
/// position and normal, two per UV, three indices per triangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurfaceMesh {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub uv: Vec<f32>,
    pub idx: Vec<u32>,
    /// LOD this surface was built for.
    pub lod: usize,
    pub flat_shaded: bool,
}

impl SurfaceMesh {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.idx.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::new(self.pos[i * 3], self.pos[i * 3 + 1], self.pos[i * 3 + 2])
    }

    #[inline]
    pub fn normal(&self, i: usize) -> Vec3 {
        Vec3::new(self.norm[i * 3], self.norm[i * 3 + 1], self.norm[i * 3 + 2])
    }

    #[inline]
    pub fn uv(&self, i: usize) -> Vec2 {
        Vec2::new(self.uv[i * 2], self.uv[i * 2 + 1])
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.idx.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Buffer lengths agree with each other and every index is in range.
    pub fn is_consistent(&self) -> bool {
        let n = self.vertex_count();
        self.pos.len() % 3 == 0
            && self.norm.len() == self.pos.len()
            && self.uv.len() == n * 2
            && self.idx.len() % 3 == 0
            && self.idx.iter().all(|&i| (i as usize) < n)
    }

    pub(crate) fn push_vertex(&mut self, p: Vec3, uv: Vec2) {
        self.pos.extend_from_slice(&[p.x, p.y, p.z]);
        self.uv.extend_from_slice(&[uv.x, uv.y]);
    }

    /// Expands every triangle into three unshared vertices carrying the face
    /// normal, giving a faceted look. Vertex count becomes the old index count.
    pub fn into_flat_shaded(self) -> SurfaceMesh {
        let mut out = SurfaceMesh {
            pos: Vec::with_capacity(self.idx.len() * 3),
            norm: Vec::with_capacity(self.idx.len() * 3),
            uv: Vec::with_capacity(self.idx.len() * 2),
            idx: Vec::with_capacity(self.idx.len()),
            lod: self.lod,
            flat_shaded: true,
        };
        for [a, b, c] in self.triangles() {
            let corners = [a as usize, b as usize, c as usize];
            let [pa, pb, pc] = corners.map(|i| self.position(i));
            let n = (pb - pa).cross(pc - pa).normalized();
            for i in corners {
                let next = out.vertex_count() as u32;
                out.push_vertex(self.position(i), self.uv(i));
                out.norm.extend_from_slice(&n.to_array());
                out.idx.push(next);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> SurfaceMesh {
        let mut m = SurfaceMesh::default();
        m.push_vertex(Vec3::new(0.0, 0.0, 0.0), Vec2::new(0.0, 0.0));
        m.push_vertex(Vec3::new(1.0, 0.0, 0.0), Vec2::new(1.0, 0.0));
        m.push_vertex(Vec3::new(0.0, 0.0, -1.0), Vec2::new(0.0, 1.0));
        m.push_vertex(Vec3::new(1.0, 1.0, -1.0), Vec2::new(1.0, 1.0));
        m.norm = vec![0.0; 12];
        m.idx = vec![0, 3, 2, 0, 1, 3];
        m
    }

    #[test]
    fn flat_shading_unshares_vertices() {
        let smooth = quad();
        assert!(smooth.is_consistent());
        let flat = smooth.clone().into_flat_shaded();
        assert!(flat.is_consistent());
        assert!(flat.flat_shaded);
        assert_eq!(flat.vertex_count(), smooth.idx.len());
        assert_eq!(flat.idx, (0..6).collect::<Vec<u32>>());
        // Each face's three corners share one normal.
        assert_eq!(flat.normal(0), flat.normal(1));
        assert_eq!(flat.normal(3), flat.normal(5));
        assert!(flat.normal(0).y > 0.0);
    }

    #[test]
    fn out_of_range_index_is_inconsistent() {
        let mut m = quad();
        m.idx.push(0);
        m.idx.push(1);
        m.idx.push(9);
        assert!(!m.is_consistent());
    }
}
