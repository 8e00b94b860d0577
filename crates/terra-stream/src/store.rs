use std::sync::Arc;
use std::time::Duration;

use hashbrown::{HashMap, HashSet};
use terra_geom::Vec2;
use terra_heightmap::{HeightMap, HeightMapSettings, build_height_map};
use terra_mesh::{MeshSettings, SurfaceMesh, build_terrain_mesh};
use terra_runtime::{Dispatcher, ThreadPoolBuildError, WorkError};

use crate::coord::TileCoord;
use crate::event::{EventQueue, TileEvent, TileEventEnvelope};
use crate::settings::StreamSettings;
use crate::tile::{MeshState, Tile};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub tiles: usize,
    pub ready_tiles: usize,
    pub visible_tiles: usize,
    pub meshes_available: usize,
    pub meshes_requested: usize,
    pub colliders_set: usize,
    pub jobs_in_flight: usize,
    pub jobs_submitted: u64,
}

/// Owns every tile, the visible set, and the dispatcher whose completions
/// mutate them. All tile state changes happen inside [`TileStore::tick`] or
/// [`TileStore::on_observer_moved`] on the owning thread.
pub struct TileStore {
    height_settings: Arc<HeightMapSettings>,
    mesh_settings: Arc<MeshSettings>,
    settings: StreamSettings,
    verts_per_line: usize,
    world_size: f32,
    window_radius: i32,
    tiles: HashMap<TileCoord, Tile>,
    visible: HashSet<TileCoord>,
    observer: Vec2,
    last_sample: Option<Vec2>,
    last_update_position: Option<Vec2>,
    events: EventQueue,
    dispatcher: Dispatcher<TileStore>,
}

impl TileStore {
    /// Validates every settings group. `workers == 0` sizes the pool to the
    /// machine.
    pub fn new(
        height_settings: &HeightMapSettings,
        mesh_settings: &MeshSettings,
        settings: &StreamSettings,
        workers: usize,
    ) -> Result<Self, ThreadPoolBuildError> {
        let height_settings = Arc::new(height_settings.validated());
        let mesh_settings = Arc::new(mesh_settings.validated());
        let settings = settings.validated();
        let verts_per_line = mesh_settings.verts_per_line();
        let world_size = mesh_settings.mesh_world_size();
        let window_radius = (settings.max_view_distance() / world_size).ceil() as i32;
        let dispatcher = Dispatcher::new(workers)?;
        log::info!(
            target: "stream",
            "tile store: {verts_per_line}x{verts_per_line} fields, tile size {world_size}, window radius {window_radius}, {} workers",
            dispatcher.workers()
        );
        Ok(Self {
            height_settings,
            mesh_settings,
            settings,
            verts_per_line,
            world_size,
            window_radius,
            tiles: HashMap::new(),
            visible: HashSet::new(),
            observer: Vec2::ZERO,
            last_sample: None,
            last_update_position: None,
            events: EventQueue::new(),
            dispatcher,
        })
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn mesh_settings(&self) -> &MeshSettings {
        &self.mesh_settings
    }

    pub fn tile_world_size(&self) -> f32 {
        self.world_size
    }

    pub fn window_radius(&self) -> i32 {
        self.window_radius
    }

    pub fn observer(&self) -> Vec2 {
        self.observer
    }

    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.tiles.get(&coord)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn visible_tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.visible.iter().copied()
    }

    pub fn is_visible(&self, coord: TileCoord) -> bool {
        self.visible.contains(&coord)
    }

    pub fn dispatcher(&self) -> &Dispatcher<TileStore> {
        &self.dispatcher
    }

    /// Feeds one observer sample. Small moves refresh visible tiles' colliders;
    /// moves past `move_threshold_for_update` (or the first sample) recompute
    /// the visible set.
    pub fn on_observer_moved(&mut self, position: Vec2) {
        self.observer = position;

        let jitter = self.settings.collision_jitter_threshold;
        let jittered = self
            .last_sample
            .is_none_or(|p| (p - position).length_sq() > jitter * jitter);
        self.last_sample = Some(position);
        if jittered {
            let visible: Vec<TileCoord> = self.visible.iter().copied().collect();
            for coord in visible {
                self.update_tile_collision(coord);
            }
        }

        let threshold = self.settings.move_threshold_for_update;
        let moved = self
            .last_update_position
            .is_none_or(|p| (p - position).length_sq() > threshold * threshold);
        if moved {
            self.last_update_position = Some(position);
            self.update_visible_tiles();
        }
    }

    /// Recomputes the visible set around the current observer regardless of
    /// how far it moved.
    pub fn refresh(&mut self) {
        self.last_update_position = Some(self.observer);
        self.update_visible_tiles();
    }

    /// Applies every finished height-map and mesh job. Returns how many ran.
    pub fn tick(&mut self) -> usize {
        let done = self.dispatcher.take_completed();
        let n = done.len();
        for completion in done {
            completion.run(self);
        }
        self.events.advance_tick();
        n
    }

    /// Blocks until the worker pool has nothing running. Pending completions
    /// still need a [`TileStore::tick`].
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.dispatcher.wait_idle(timeout)
    }

    pub fn drain_events(&mut self) -> Vec<TileEventEnvelope> {
        self.events.drain()
    }

    pub fn stats(&self) -> StreamStats {
        let mut stats = StreamStats {
            tiles: self.tiles.len(),
            visible_tiles: self.visible.len(),
            jobs_in_flight: self.dispatcher.in_flight() + self.dispatcher.pending_completions(),
            jobs_submitted: self.dispatcher.submitted(),
            ..StreamStats::default()
        };
        for tile in self.tiles.values() {
            stats.ready_tiles += tile.is_ready() as usize;
            stats.colliders_set += tile.has_set_collider() as usize;
            for level in 0..self.settings.detail_levels.len() {
                match tile.mesh_state(level) {
                    Some(MeshState::Available(_)) => stats.meshes_available += 1,
                    Some(MeshState::Requested) => stats.meshes_requested += 1,
                    _ => {}
                }
            }
        }
        stats
    }

    fn update_visible_tiles(&mut self) {
        let mut updated: HashSet<TileCoord> = HashSet::with_capacity(self.visible.len());
        let previously_visible: Vec<TileCoord> = self.visible.iter().copied().collect();
        for coord in previously_visible {
            updated.insert(coord);
            self.update_tile(coord);
        }

        let center = TileCoord::containing(self.observer, self.world_size);
        let r = self.window_radius;
        for dy in -r..=r {
            for dx in -r..=r {
                let coord = center.offset(dx, dy);
                if updated.contains(&coord) {
                    continue;
                }
                if self.tiles.contains_key(&coord) {
                    self.update_tile(coord);
                } else {
                    self.create_tile(coord);
                }
            }
        }
        log::debug!(
            target: "stream",
            "visible set around {center}: {} visible of {} tiles",
            self.visible.len(),
            self.tiles.len()
        );
    }

    fn create_tile(&mut self, coord: TileCoord) {
        let tile = Tile::new(
            coord,
            &self.settings,
            (self.verts_per_line - 3) as f32,
            self.world_size,
        );
        let center = tile.sample_center();
        self.tiles.insert(coord, tile);

        let settings = Arc::clone(&self.height_settings);
        let n = self.verts_per_line;
        self.dispatcher.submit(
            move || build_height_map(n, n, &settings, center),
            move |store: &mut TileStore, result| store.on_height_map_ready(coord, result),
        );
        log::trace!(target: "stream", "tile {coord} created");
    }

    fn on_height_map_ready(&mut self, coord: TileCoord, result: Result<HeightMap, WorkError>) {
        let Some(tile) = self.tiles.get_mut(&coord) else {
            return;
        };
        match result {
            Ok(height_map) => {
                tile.set_height_map(Arc::new(height_map));
                self.update_tile(coord);
                self.update_tile_collision(coord);
            }
            Err(error) => {
                tile.mark_height_map_failed();
                log::warn!(target: "stream", "tile {coord} height map failed: {error}");
                self.events.emit_now(TileEvent::HeightMapFailed { coord, error });
            }
        }
    }

    fn update_tile(&mut self, coord: TileCoord) {
        let observer = self.observer;
        let Some(tile) = self.tiles.get_mut(&coord) else {
            return;
        };
        let update = tile.update(observer, &self.settings);

        for level in update.mesh_requests {
            self.request_mesh(coord, level);
        }
        if let Some(level) = update.display_changed {
            let mesh = self
                .tiles
                .get(&coord)
                .and_then(Tile::current_display_mesh)
                .cloned();
            if let Some(mesh) = mesh {
                let lod = self.settings.detail_levels[level].lod;
                log::trace!(target: "stream", "tile {coord} now shows lod {lod}");
                self.events
                    .emit_now(TileEvent::DisplayMeshChanged { coord, lod, mesh });
            }
        }
        if let Some(visible) = update.visibility_changed {
            self.on_visibility_changed(coord, visible);
        }
    }

    fn update_tile_collision(&mut self, coord: TileCoord) {
        let observer = self.observer;
        let Some(tile) = self.tiles.get_mut(&coord) else {
            return;
        };
        let update = tile.update_collision(observer, &self.settings);
        if let Some(level) = update.mesh_request {
            self.request_mesh(coord, level);
        }
        if update.installed {
            if let Some(mesh) = self
                .tiles
                .get(&coord)
                .and_then(Tile::current_collision_mesh)
                .cloned()
            {
                log::debug!(target: "stream", "tile {coord} collider set");
                self.events
                    .emit_now(TileEvent::CollisionMeshSet { coord, mesh });
            }
        }
    }

    fn on_visibility_changed(&mut self, coord: TileCoord, visible: bool) {
        if visible {
            self.visible.insert(coord);
        } else {
            self.visible.remove(&coord);
        }
        self.events
            .emit_now(TileEvent::VisibilityChanged { coord, visible });
    }

    fn request_mesh(&mut self, coord: TileCoord, level: usize) {
        let Some(height_map) = self
            .tiles
            .get(&coord)
            .and_then(Tile::height_map)
            .cloned()
        else {
            return;
        };
        let lod = self.settings.detail_levels[level].lod;
        let settings = Arc::clone(&self.mesh_settings);
        self.dispatcher.submit(
            move || build_terrain_mesh(&height_map, &settings, lod),
            move |store: &mut TileStore, result| store.on_mesh_ready(coord, level, result),
        );
        log::trace!(target: "stream", "tile {coord} requested lod {lod}");
    }

    fn on_mesh_ready(
        &mut self,
        coord: TileCoord,
        level: usize,
        result: Result<SurfaceMesh, WorkError>,
    ) {
        let Some(tile) = self.tiles.get_mut(&coord) else {
            return;
        };
        match result {
            Ok(mesh) => tile.set_mesh(level, Some(Arc::new(mesh))),
            Err(error) => {
                tile.set_mesh(level, None);
                let lod = self.settings.detail_levels[level].lod;
                log::warn!(target: "stream", "tile {coord} lod {lod} mesh failed: {error}");
                self.events
                    .emit_now(TileEvent::MeshFailed { coord, lod, error });
                return;
            }
        }
        self.update_tile(coord);
        if level == self.settings.collider_lod_index {
            self.update_tile_collision(coord);
        }
    }
}
