use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

// Shape of the rational falloff curve: larger A sharpens the shoulder, larger B
// pushes the shoulder outwards.
const FALLOFF_A: f32 = 3.0;
const FALLOFF_B: f32 = 2.2;

#[inline]
fn falloff_curve(v: f32) -> f32 {
    let a = v.powf(FALLOFF_A);
    let b = (FALLOFF_B - FALLOFF_B * v).powf(FALLOFF_A);
    a / (a + b)
}

/// Square attenuation mask of side `size`, row-major, 0 at the centre rising
/// to 1 at the border (Chebyshev distance through a smoothstep-like curve).
pub fn generate_falloff_map(size: usize) -> Vec<f32> {
    let mut map = vec![0.0_f32; size * size];
    if size == 0 {
        return map;
    }
    let denom = size as f32;
    for y in 0..size {
        for x in 0..size {
            let nx = x as f32 / denom * 2.0 - 1.0;
            let ny = y as f32 / denom * 2.0 - 1.0;
            let v = nx.abs().max(ny.abs());
            map[y * size + x] = falloff_curve(v).clamp(0.0, 1.0);
        }
    }
    map
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FalloffCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Falloff maps depend only on their size, so every tile of a given size can
/// share one.
pub struct FalloffCache {
    entries: RwLock<HashMap<usize, Arc<[f32]>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for FalloffCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FalloffCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Process-wide cache used by [`crate::build_height_map`].
    pub fn shared() -> &'static FalloffCache {
        static SHARED: OnceLock<FalloffCache> = OnceLock::new();
        SHARED.get_or_init(FalloffCache::new)
    }

    pub fn get(&self, size: usize) -> Arc<[f32]> {
        if let Some(map) = self.lookup(size) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return map;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let built: Arc<[f32]> = generate_falloff_map(size).into();
        match self.entries.write() {
            // Another worker may have raced us here; keep whichever landed first.
            Ok(mut entries) => Arc::clone(entries.entry(size).or_insert(built)),
            Err(_) => built,
        }
    }

    pub fn stats(&self) -> FalloffCacheStats {
        FalloffCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().map(|m| m.len()).unwrap_or(0),
        }
    }

    fn lookup(&self, size: usize) -> Option<Arc<[f32]>> {
        self.entries
            .read()
            .ok()
            .and_then(|map| map.get(&size).cloned())
    }
}
