use std::collections::VecDeque;
use std::sync::Arc;

use terra_mesh::SurfaceMesh;
use terra_runtime::WorkError;

use crate::coord::TileCoord;

/// What the rendering and collision collaborators need to hear about.
#[derive(Clone, Debug)]
pub enum TileEvent {
    VisibilityChanged {
        coord: TileCoord,
        visible: bool,
    },
    DisplayMeshChanged {
        coord: TileCoord,
        lod: usize,
        mesh: Arc<SurfaceMesh>,
    },
    CollisionMeshSet {
        coord: TileCoord,
        mesh: Arc<SurfaceMesh>,
    },
    HeightMapFailed {
        coord: TileCoord,
        error: WorkError,
    },
    MeshFailed {
        coord: TileCoord,
        lod: usize,
        error: WorkError,
    },
}

impl TileEvent {
    pub fn coord(&self) -> TileCoord {
        match self {
            TileEvent::VisibilityChanged { coord, .. }
            | TileEvent::DisplayMeshChanged { coord, .. }
            | TileEvent::CollisionMeshSet { coord, .. }
            | TileEvent::HeightMapFailed { coord, .. }
            | TileEvent::MeshFailed { coord, .. } => *coord,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TileEventEnvelope {
    pub id: u64,
    pub tick: u64,
    pub event: TileEvent,
}

pub struct EventQueue {
    queue: VecDeque<TileEventEnvelope>,
    pub now: u64,
    next_id: u64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            now: 0,
            next_id: 1,
        }
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    pub fn emit_now(&mut self, event: TileEvent) -> u64 {
        let id = self.alloc_id();
        self.queue.push_back(TileEventEnvelope {
            id,
            tick: self.now,
            event,
        });
        id
    }

    pub fn pop(&mut self) -> Option<TileEventEnvelope> {
        self.queue.pop_front()
    }

    /// Every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<TileEventEnvelope> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn advance_tick(&mut self) {
        self.now = self.now.wrapping_add(1);
    }
}
