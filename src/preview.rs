use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use clap::ValueEnum;
use terra_geom::{Vec2, Vec3};
use terra_heightmap::{
    PixelBuffer, build_height_map, generate_falloff_map, generate_noise_map,
    grayscale_from_values, region_color_map,
};
use terra_mesh::{build_terrain_mesh, obj::write_obj};
use terra_stream::TileCoord;

use crate::config::TerrainConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PreviewMode {
    /// Normalized noise as grayscale.
    Noise,
    /// The falloff mask as grayscale.
    Falloff,
    /// Height field coloured by terrain regions.
    Color,
    /// Height field through the blended texture layers.
    Texture,
}

fn sample_center(cfg: &TerrainConfig, tile: TileCoord) -> Vec2 {
    tile.scaled((cfg.mesh.verts_per_line() - 3) as f32)
}

pub fn render_preview(
    cfg: &TerrainConfig,
    mode: PreviewMode,
    tile: TileCoord,
    size: Option<usize>,
) -> PixelBuffer {
    let n = size.unwrap_or_else(|| cfg.mesh.verts_per_line());
    let center = sample_center(cfg, tile);
    match mode {
        PreviewMode::Noise => {
            let values = generate_noise_map(n, n, &cfg.height.noise, center);
            grayscale_from_values(n, n, &values)
        }
        PreviewMode::Falloff => grayscale_from_values(n, n, &generate_falloff_map(n)),
        PreviewMode::Color => {
            let hm = build_height_map(n, n, &cfg.height, center);
            region_color_map(&hm, &cfg.regions)
        }
        PreviewMode::Texture => {
            let hm = build_height_map(n, n, &cfg.height, center);
            cfg.texture
                .build_texture(&hm, cfg.height.min_height(), cfg.height.max_height())
        }
    }
}

pub fn save_png(buf: PixelBuffer, out: &Path) -> Result<(), Box<dyn Error>> {
    let (w, h) = (buf.width as u32, buf.height as u32);
    let img = image::RgbaImage::from_raw(w, h, buf.rgba).ok_or("pixel buffer size mismatch")?;
    img.save(out)?;
    log::info!("wrote {}x{} preview to {}", w, h, out.display());
    Ok(())
}

pub fn export_mesh(
    cfg: &TerrainConfig,
    tile: TileCoord,
    lod: usize,
    out: &Path,
) -> Result<(), Box<dyn Error>> {
    let n = cfg.mesh.verts_per_line();
    let hm = build_height_map(n, n, &cfg.height, sample_center(cfg, tile));
    let mesh = build_terrain_mesh(&hm, &cfg.mesh, lod);
    let origin = tile.scaled(cfg.mesh.mesh_world_size());
    let mut w = BufWriter::new(File::create(out)?);
    write_obj(
        &mesh,
        &format!("tile_{}_{}_lod{}", tile.x, tile.y, mesh.lod),
        Vec3::new(origin.x, 0.0, origin.y),
        &mut w,
    )?;
    log::info!(
        "wrote tile {tile} lod {} ({} verts, {} tris) to {}",
        mesh.lod,
        mesh.vertex_count(),
        mesh.triangle_count(),
        out.display()
    );
    Ok(())
}
