//! `terra`: headless driver for the streaming terrain engine.
#![forbid(unsafe_code)]

mod config;
mod preview;

use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use terra_geom::Vec2;
use terra_stream::{TileCoord, TileEvent, TileStore};

use crate::config::load_config;
use crate::preview::{PreviewMode, export_mesh, render_preview, save_png};

#[derive(Parser, Debug)]
#[command(name = "terra")]
#[command(about = "Procedural infinite terrain: streaming, previews and mesh export")]
struct Args {
    /// TOML file with [height], [mesh], [stream] and [texture] tables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk an observer along +X and stream tiles around it
    Walk {
        /// Number of ticks to simulate
        #[arg(long, default_value = "200")]
        ticks: u32,

        /// World units moved per tick
        #[arg(long, default_value = "10.0")]
        speed: f32,

        /// Sleep between ticks, in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: u64,

        /// Worker threads (0 = one per core)
        #[arg(long, default_value = "0")]
        workers: usize,
    },
    /// Render a height field, noise or falloff map to PNG
    Preview {
        #[arg(long, value_enum, default_value = "texture")]
        mode: PreviewMode,

        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        tile_x: i32,

        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        tile_y: i32,

        /// Image side in cells (defaults to the tile field size)
        #[arg(long)]
        size: Option<usize>,

        #[arg(short, long)]
        out: PathBuf,
    },
    /// Build one tile mesh and write it as Wavefront OBJ
    ExportMesh {
        #[arg(long, default_value = "0")]
        lod: usize,

        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        tile_x: i32,

        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        tile_y: i32,

        #[arg(short, long)]
        out: PathBuf,
    },
}

fn walk(
    store: &mut TileStore,
    ticks: u32,
    speed: f32,
    frame: Duration,
) -> Result<(), Box<dyn Error>> {
    for tick in 0..ticks {
        store.on_observer_moved(Vec2::new(tick as f32 * speed, 0.0));
        store.tick();
        for env in store.drain_events() {
            match env.event {
                TileEvent::DisplayMeshChanged { coord, lod, mesh } => log::debug!(
                    target: "stream",
                    "[tick {}] show {coord} lod {lod} ({} tris)",
                    env.tick,
                    mesh.triangle_count()
                ),
                TileEvent::VisibilityChanged { coord, visible } => {
                    log::debug!(target: "stream", "[tick {}] {coord} visible={visible}", env.tick)
                }
                TileEvent::CollisionMeshSet { coord, .. } => {
                    log::info!(target: "stream", "[tick {}] collider set on {coord}", env.tick)
                }
                TileEvent::HeightMapFailed { coord, error } => {
                    log::error!(target: "stream", "[tick {}] {coord} height map: {error}", env.tick)
                }
                TileEvent::MeshFailed { coord, lod, error } => {
                    log::error!(target: "stream", "[tick {}] {coord} lod {lod}: {error}", env.tick)
                }
            }
        }
        if tick % 50 == 0 {
            log::info!(target: "stream", "[tick {tick}] {:?}", store.stats());
        }
        if !frame.is_zero() {
            thread::sleep(frame);
        }
    }
    if !store.wait_idle(Duration::from_secs(60)) {
        return Err("workers still busy after 60s".into());
    }
    store.tick();
    let here = TileCoord::containing(store.observer(), store.tile_world_size());
    log::info!(target: "stream", "final {:?}", store.stats());
    if let Some(mesh) = store.tile(here).and_then(|t| t.current_display_mesh()) {
        log::info!("observer tile {here} shows lod {} with {} tris", mesh.lod, mesh.triangle_count());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = load_config(args.config.as_deref())?;

    match args.command {
        Command::Walk {
            ticks,
            speed,
            frame_ms,
            workers,
        } => {
            let mut store = TileStore::new(&cfg.height, &cfg.mesh, &cfg.stream, workers)?;
            walk(&mut store, ticks, speed, Duration::from_millis(frame_ms))
        }
        Command::Preview {
            mode,
            tile_x,
            tile_y,
            size,
            out,
        } => {
            let buf = render_preview(&cfg, mode, TileCoord::new(tile_x, tile_y), size);
            save_png(buf, &out)
        }
        Command::ExportMesh {
            lod,
            tile_x,
            tile_y,
            out,
        } => export_mesh(&cfg, TileCoord::new(tile_x, tile_y), lod, &out),
    }
}
