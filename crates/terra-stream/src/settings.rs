use serde::Deserialize;
use terra_mesh::NUM_SUPPORTED_LODS;

/// One row of the LOD table: tiles whose nearest edge is within
/// `visible_distance` of the observer may display `lod`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct LodInfo {
    pub lod: usize,
    pub visible_distance: f32,
}

impl LodInfo {
    pub const fn new(lod: usize, visible_distance: f32) -> Self {
        Self {
            lod,
            visible_distance,
        }
    }

    #[inline]
    pub fn sqr_visible_distance(&self) -> f32 {
        self.visible_distance * self.visible_distance
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StreamSettings {
    #[serde(default = "default_detail_levels")]
    pub detail_levels: Vec<LodInfo>,
    #[serde(default)]
    pub collider_lod_index: usize,
    #[serde(default = "default_collider_generation_distance")]
    pub collider_generation_distance: f32,
    #[serde(default = "default_move_threshold")]
    pub move_threshold_for_update: f32,
    #[serde(default = "default_collision_jitter")]
    pub collision_jitter_threshold: f32,
}

fn default_detail_levels() -> Vec<LodInfo> {
    vec![
        LodInfo::new(0, 200.0),
        LodInfo::new(1, 400.0),
        LodInfo::new(4, 600.0),
    ]
}
fn default_collider_generation_distance() -> f32 {
    5.0
}
fn default_move_threshold() -> f32 {
    25.0
}
fn default_collision_jitter() -> f32 {
    0.01
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            detail_levels: default_detail_levels(),
            collider_lod_index: 0,
            collider_generation_distance: default_collider_generation_distance(),
            move_threshold_for_update: default_move_threshold(),
            collision_jitter_threshold: default_collision_jitter(),
        }
    }
}

fn non_negative(v: f32, fallback: f32, name: &str) -> f32 {
    if v.is_finite() && v >= 0.0 {
        v
    } else {
        log::warn!("{name} {v} must be a non-negative number; using {fallback}");
        fallback
    }
}

impl StreamSettings {
    /// Copy with an ordered, non-empty LOD table and indices in range.
    pub fn validated(&self) -> Self {
        let mut levels: Vec<LodInfo> = self
            .detail_levels
            .iter()
            .filter(|l| l.visible_distance.is_finite() && l.visible_distance >= 0.0)
            .map(|l| LodInfo::new(l.lod.min(NUM_SUPPORTED_LODS - 1), l.visible_distance))
            .collect();
        if levels.is_empty() {
            log::warn!("detail_levels is empty; using defaults");
            levels = default_detail_levels();
        }
        if levels
            .windows(2)
            .any(|w| w[0].visible_distance > w[1].visible_distance)
        {
            log::warn!("detail_levels are not ordered by distance; sorting");
            levels.sort_by(|a, b| a.visible_distance.total_cmp(&b.visible_distance));
        }
        let collider_lod_index = self.collider_lod_index.min(levels.len() - 1);
        Self {
            detail_levels: levels,
            collider_lod_index,
            collider_generation_distance: non_negative(
                self.collider_generation_distance,
                default_collider_generation_distance(),
                "collider_generation_distance",
            ),
            move_threshold_for_update: non_negative(
                self.move_threshold_for_update,
                default_move_threshold(),
                "move_threshold_for_update",
            ),
            collision_jitter_threshold: non_negative(
                self.collision_jitter_threshold,
                default_collision_jitter(),
                "collision_jitter_threshold",
            ),
        }
    }

    /// Distance beyond which a tile is hidden: the coarsest row's threshold.
    pub fn max_view_distance(&self) -> f32 {
        self.detail_levels
            .last()
            .map(|l| l.visible_distance)
            .unwrap_or(0.0)
    }

    pub fn collider_level(&self) -> LodInfo {
        self.detail_levels[self.collider_lod_index.min(self.detail_levels.len() - 1)]
    }
}

/// Index into `levels` of the finest row whose threshold `distance` does not
/// exceed; the last row when it exceeds them all.
pub fn select_lod(distance: f32, levels: &[LodInfo]) -> usize {
    levels
        .iter()
        .position(|l| distance <= l.visible_distance)
        .unwrap_or(levels.len().saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_lod_walks_thresholds() {
        let levels = default_detail_levels();
        assert_eq!(select_lod(0.0, &levels), 0);
        assert_eq!(select_lod(200.0, &levels), 0);
        assert_eq!(select_lod(200.5, &levels), 1);
        assert_eq!(select_lod(599.0, &levels), 2);
        assert_eq!(select_lod(10_000.0, &levels), 2);
        assert_eq!(select_lod(5.0, &[]), 0);
    }

    #[test]
    fn validated_orders_and_clamps() {
        let raw = StreamSettings {
            detail_levels: vec![
                LodInfo::new(9, 500.0),
                LodInfo::new(0, 100.0),
                LodInfo::new(1, f32::NAN),
            ],
            collider_lod_index: 7,
            collider_generation_distance: -1.0,
            ..StreamSettings::default()
        };
        let s = raw.validated();
        assert_eq!(
            s.detail_levels,
            vec![LodInfo::new(0, 100.0), LodInfo::new(NUM_SUPPORTED_LODS - 1, 500.0)]
        );
        assert_eq!(s.collider_lod_index, 1);
        assert_eq!(s.collider_generation_distance, 5.0);
        assert_eq!(s.max_view_distance(), 500.0);
    }

    #[test]
    fn empty_table_falls_back_to_defaults() {
        let s = StreamSettings {
            detail_levels: Vec::new(),
            ..StreamSettings::default()
        }
        .validated();
        assert_eq!(s, StreamSettings::default());
        assert_eq!(s.collider_level(), LodInfo::new(0, 200.0));
    }
}
