//! Streaming tile management: which tiles exist around the observer, which
//! are visible, and which LOD mesh each one displays and collides with.
#![forbid(unsafe_code)]

mod coord;
pub mod event;
mod settings;
mod store;
mod tile;

pub use coord::TileCoord;
pub use event::{EventQueue, TileEvent, TileEventEnvelope};
pub use settings::{LodInfo, StreamSettings, select_lod};
pub use store::{StreamStats, TileStore};
pub use tile::{CollisionUpdate, MeshState, Tile, TileUpdate};
