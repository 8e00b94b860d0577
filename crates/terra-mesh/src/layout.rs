//! Per-LOD classification of height-field cells and the index table that maps
//! each cell to its slot in the emitted mesh or in the hidden border set.
//!
//! For a field of side `n` and stride `skip`:
//!
//! * ring 0 (`x` or `y` is `0` or `n-1`) is *out of mesh*: sampled only so the
//!   outermost visible triangles get neighbour-aware normals;
//! * ring 1 is the *mesh edge*: always emitted at full resolution so adjacent
//!   tiles share identical edge vertices at any LOD;
//! * cells on the `skip` lattice (counted from 2) are *main* vertices;
//! * the remaining ring-2 cells are *edge connections*, whose heights are
//!   interpolated between the main vertices either side of them;
//! * everything else is skipped at this LOD.

/// Role of a height-field cell at a given LOD.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexKind {
    OutOfMesh,
    MeshEdge,
    Main,
    EdgeConnection,
    Skipped,
}

impl VertexKind {
    #[inline]
    pub fn is_emitted(self) -> bool {
        matches!(self, Self::MeshEdge | Self::Main | Self::EdgeConnection)
    }
}

#[inline]
pub fn classify_vertex(x: usize, y: usize, n: usize, skip: usize) -> VertexKind {
    let last = n - 1;
    if x == 0 || y == 0 || x == last || y == last {
        VertexKind::OutOfMesh
    } else if x == 1 || y == 1 || x == last - 1 || y == last - 1 {
        VertexKind::MeshEdge
    } else if (x - 2) % skip == 0 && (y - 2) % skip == 0 {
        VertexKind::Main
    } else if x == 2 || y == 2 || x == last - 2 || y == last - 2 {
        VertexKind::EdgeConnection
    } else {
        VertexKind::Skipped
    }
}

/// Where a cell's vertex lives once it is placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexRef {
    /// Index into the emitted vertex arrays.
    Mesh(u32),
    /// Index into the border set used only for normal accumulation.
    Border(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Vertex(VertexRef),
    Skipped,
}

#[derive(Clone, Debug)]
pub struct LodLayout {
    n: usize,
    skip: usize,
    kinds: Vec<VertexKind>,
    slots: Vec<Slot>,
    mesh_vertex_count: usize,
    border_vertex_count: usize,
}

impl LodLayout {
    /// Classifies an `n × n` field at stride `skip`. `n - 5` must be a multiple
    /// of `skip` for the lattice to close on the far ring.
    pub fn new(n: usize, skip: usize) -> Self {
        debug_assert!(n >= 6, "field side {n} leaves no visible cells");
        debug_assert!(skip > 0 && (n - 5) % skip == 0, "stride {skip} does not divide {}", n - 5);
        let mut kinds = Vec::with_capacity(n * n);
        let mut slots = Vec::with_capacity(n * n);
        let mut mesh = 0u32;
        let mut border = 0u32;
        for y in 0..n {
            for x in 0..n {
                let kind = classify_vertex(x, y, n, skip);
                let slot = match kind {
                    VertexKind::OutOfMesh => {
                        border += 1;
                        Slot::Vertex(VertexRef::Border(border - 1))
                    }
                    VertexKind::Skipped => Slot::Skipped,
                    _ => {
                        mesh += 1;
                        Slot::Vertex(VertexRef::Mesh(mesh - 1))
                    }
                };
                kinds.push(kind);
                slots.push(slot);
            }
        }
        Self {
            n,
            skip,
            kinds,
            slots,
            mesh_vertex_count: mesh as usize,
            border_vertex_count: border as usize,
        }
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn skip(&self) -> usize {
        self.skip
    }

    #[inline]
    pub fn kind(&self, x: usize, y: usize) -> VertexKind {
        self.kinds[y * self.n + x]
    }

    /// `None` for cells skipped at this LOD.
    #[inline]
    pub fn vertex(&self, x: usize, y: usize) -> Option<VertexRef> {
        match self.slots[y * self.n + x] {
            Slot::Vertex(v) => Some(v),
            Slot::Skipped => None,
        }
    }

    pub fn mesh_vertex_count(&self) -> usize {
        self.mesh_vertex_count
    }

    pub fn border_vertex_count(&self) -> usize {
        self.border_vertex_count
    }

    /// Closed-form emitted vertex count: mesh-edge ring, edge connections,
    /// main lattice.
    pub fn expected_mesh_vertices(n: usize, skip: usize) -> usize {
        let mesh_edge = 4 * (n - 2) - 4;
        let edge_connection = (skip - 1) * (n - 5) / skip * 4;
        let main_per_line = (n - 5) / skip + 1;
        mesh_edge + edge_connection + main_per_line * main_per_line
    }

    /// Closed-form count of triangles whose corners are all emitted vertices.
    pub fn expected_triangles(n: usize, skip: usize) -> usize {
        let main_per_line = (n - 5) / skip + 1;
        8 * (n - 4) + 2 * (main_per_line - 1) * (main_per_line - 1)
    }
}
