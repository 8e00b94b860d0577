//! Wavefront OBJ writer for inspecting generated tiles in external tools.

use std::io::{self, Write};

use terra_geom::Vec3;

use crate::surface::SurfaceMesh;

/// Writes `mesh` translated by `origin` as a single OBJ object.
pub fn write_obj<W: Write>(
    mesh: &SurfaceMesh,
    name: &str,
    origin: Vec3,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "o {name}")?;
    for i in 0..mesh.vertex_count() {
        let p = mesh.position(i) + origin;
        writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for i in 0..mesh.vertex_count() {
        let uv = mesh.uv(i);
        writeln!(out, "vt {} {}", uv.x, uv.y)?;
    }
    for i in 0..mesh.vertex_count() {
        let n = mesh.normal(i);
        writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
    }
    if mesh.flat_shaded {
        writeln!(out, "s off")?;
    }
    for [a, b, c] in mesh.triangles() {
        // OBJ indices are 1-based.
        let (a, b, c) = (a + 1, b + 1, c + 1);
        writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
    }
    Ok(())
}
