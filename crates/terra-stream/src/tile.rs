use std::sync::Arc;

use terra_geom::{Bounds2, Vec2};
use terra_heightmap::HeightMap;
use terra_mesh::SurfaceMesh;

use crate::coord::TileCoord;
use crate::settings::{StreamSettings, select_lod};

/// Per-LOD mesh slot. Transitions only forward:
/// `NotRequested → Requested → Available | Failed`.
#[derive(Clone, Debug, Default)]
pub enum MeshState {
    #[default]
    NotRequested,
    Requested,
    Available(Arc<SurfaceMesh>),
    /// Generation failed; never retried.
    Failed,
}

impl MeshState {
    pub fn mesh(&self) -> Option<&Arc<SurfaceMesh>> {
        match self {
            MeshState::Available(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn is_requested(&self) -> bool {
        matches!(self, MeshState::Requested)
    }
}

/// Side effects a [`Tile::update`] asks its owner to perform.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TileUpdate {
    /// Detail-level indices whose meshes must now be generated.
    pub mesh_requests: Vec<usize>,
    /// New displayed detail-level index.
    pub display_changed: Option<usize>,
    pub visibility_changed: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollisionUpdate {
    pub mesh_request: Option<usize>,
    pub installed: bool,
}

/// One streamed terrain tile. Its height field arrives once; each detail
/// level's mesh is generated at most once, on demand.
#[derive(Debug)]
pub struct Tile {
    coord: TileCoord,
    sample_center: Vec2,
    bounds: Bounds2,
    height_map: Option<Arc<HeightMap>>,
    height_map_failed: bool,
    meshes: Vec<MeshState>,
    collider_lod_index: usize,
    display_lod_index: Option<usize>,
    collision_mesh: Option<Arc<SurfaceMesh>>,
    visible: bool,
}

impl Tile {
    /// `sample_span` is the visible cell count per side (noise-grid units);
    /// `world_size` the tile's side in world units.
    pub fn new(
        coord: TileCoord,
        settings: &StreamSettings,
        sample_span: f32,
        world_size: f32,
    ) -> Self {
        Self {
            coord,
            sample_center: coord.scaled(sample_span),
            bounds: Bounds2::from_center_size(coord.scaled(world_size), world_size),
            height_map: None,
            height_map_failed: false,
            meshes: vec![MeshState::NotRequested; settings.detail_levels.len()],
            collider_lod_index: settings.collider_lod_index,
            display_lod_index: None,
            collision_mesh: None,
            visible: false,
        }
    }

    #[inline]
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    #[inline]
    pub fn sample_center(&self) -> Vec2 {
        self.sample_center
    }

    #[inline]
    pub fn bounds(&self) -> Bounds2 {
        self.bounds
    }

    /// World-space centre of the tile on the ground plane.
    #[inline]
    pub fn position(&self) -> Vec2 {
        self.bounds.center()
    }

    pub fn height_map(&self) -> Option<&Arc<HeightMap>> {
        self.height_map.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.height_map.is_some()
    }

    pub fn height_map_failed(&self) -> bool {
        self.height_map_failed
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn mesh_state(&self, level: usize) -> Option<&MeshState> {
        self.meshes.get(level)
    }

    pub fn display_lod_index(&self) -> Option<usize> {
        self.display_lod_index
    }

    pub fn has_set_collider(&self) -> bool {
        self.collision_mesh.is_some()
    }

    pub fn current_display_mesh(&self) -> Option<&Arc<SurfaceMesh>> {
        self.display_lod_index
            .and_then(|i| self.meshes.get(i))
            .and_then(MeshState::mesh)
    }

    pub fn current_collision_mesh(&self) -> Option<&Arc<SurfaceMesh>> {
        self.collision_mesh.as_ref()
    }

    pub(crate) fn set_height_map(&mut self, height_map: Arc<HeightMap>) {
        debug_assert!(self.height_map.is_none(), "tile {} height map set twice", self.coord);
        self.height_map = Some(height_map);
    }

    pub(crate) fn mark_height_map_failed(&mut self) {
        self.height_map_failed = true;
    }

    pub(crate) fn set_mesh(&mut self, level: usize, mesh: Option<Arc<SurfaceMesh>>) {
        if let Some(slot) = self.meshes.get_mut(level) {
            *slot = match mesh {
                Some(mesh) => MeshState::Available(mesh),
                None => MeshState::Failed,
            };
        }
    }

    // Flags `level` as requested if nobody asked for it yet.
    fn claim_request(&mut self, level: usize) -> bool {
        match self.meshes.get_mut(level) {
            Some(slot @ MeshState::NotRequested) => {
                *slot = MeshState::Requested;
                true
            }
            _ => false,
        }
    }

    /// Re-evaluates visibility and display LOD for an observer at `observer`.
    /// Does nothing until the height map has arrived.
    pub fn update(&mut self, observer: Vec2, settings: &StreamSettings) -> TileUpdate {
        let mut out = TileUpdate::default();
        if self.height_map.is_none() {
            return out;
        }
        let distance = self.bounds.distance(observer);
        let visible = distance <= settings.max_view_distance();

        if visible {
            let level = select_lod(distance, &settings.detail_levels);
            if self.display_lod_index != Some(level) {
                if self.meshes.get(level).and_then(MeshState::mesh).is_some() {
                    self.display_lod_index = Some(level);
                    out.display_changed = Some(level);
                } else if self.claim_request(level) {
                    out.mesh_requests.push(level);
                }
            }
        }

        if self.visible != visible {
            self.visible = visible;
            out.visibility_changed = Some(visible);
        }
        out
    }

    /// Requests the collider LOD once the observer is inside its band and
    /// installs it once the observer is within `collider_generation_distance`.
    /// An installed collision mesh is never replaced.
    pub fn update_collision(&mut self, observer: Vec2, settings: &StreamSettings) -> CollisionUpdate {
        let mut out = CollisionUpdate::default();
        if self.collision_mesh.is_some() || self.height_map.is_none() {
            return out;
        }
        let sqr_distance = self.bounds.sqr_distance(observer);
        let level = self.collider_lod_index;
        let Some(band) = settings.detail_levels.get(level) else {
            return out;
        };

        if sqr_distance < band.sqr_visible_distance() && self.claim_request(level) {
            out.mesh_request = Some(level);
        }

        let install_distance = settings.collider_generation_distance;
        if sqr_distance < install_distance * install_distance {
            if let Some(mesh) = self.meshes.get(level).and_then(MeshState::mesh) {
                self.collision_mesh = Some(Arc::clone(mesh));
                out.installed = true;
            }
        }
        out
    }
}
