use std::fmt;

use terra_geom::Vec2;

/// Integer tile position on the ground plane. `y` grows north (+Z in world).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile whose centre is nearest to `position`, saturating at the `i32` range.
    #[inline]
    pub fn containing(position: Vec2, tile_size: f32) -> Self {
        Self {
            x: (position.x / tile_size).round() as i32,
            y: (position.y / tile_size).round() as i32,
        }
    }

    /// Neighbour `(dx, dy)` away; pinned at the edge of the coordinate space.
    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// `self * scale` as a point.
    #[inline]
    pub fn scaled(self, scale: f32) -> Vec2 {
        Vec2::new(self.x as f32 * scale, self.y as f32 * scale)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_rounds_to_nearest_centre() {
        assert_eq!(TileCoord::containing(Vec2::new(0.0, 0.0), 100.0), TileCoord::new(0, 0));
        assert_eq!(TileCoord::containing(Vec2::new(49.0, -49.0), 100.0), TileCoord::new(0, 0));
        assert_eq!(TileCoord::containing(Vec2::new(51.0, -151.0), 100.0), TileCoord::new(1, -2));
    }

    #[test]
    fn scaled_and_display() {
        let c = TileCoord::new(-2, 3);
        assert_eq!(c.scaled(10.0), Vec2::new(-20.0, 30.0));
        assert_eq!(c.offset(1, -1), TileCoord::new(-1, 2));
        assert_eq!(c.to_string(), "(-2, 3)");
    }

    #[test]
    fn far_positions_stay_in_range() {
        let c = TileCoord::containing(Vec2::new(3.0e11, -3.0e11), 125.0);
        assert_eq!(c, TileCoord::new(i32::MAX, i32::MIN));
        assert_eq!(c.offset(3, -3), c);
        assert_eq!(c.offset(-3, 3), TileCoord::new(i32::MAX - 3, i32::MIN + 3));
    }
}
