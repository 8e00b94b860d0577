//! CPU terrain meshing: height field + LOD → indexed triangle surface with
//! seam-stitched tile borders.
#![forbid(unsafe_code)]

mod builder;
pub mod layout;
pub mod obj;
mod settings;
mod surface;

pub use builder::{build_terrain_mesh, edge_connection_height};
pub use layout::{LodLayout, VertexKind, VertexRef, classify_vertex};
pub use settings::{
    FLAT_SHADED_CHUNK_SIZE_COUNT, MeshSettings, NUM_SUPPORTED_LODS, SUPPORTED_CHUNK_SIZES,
    lod_skip_increment,
};
pub use surface::SurfaceMesh;
