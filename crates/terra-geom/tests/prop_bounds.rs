use proptest::prelude::*;
use terra_geom::{Bounds2, Vec2};

fn coord() -> impl Strategy<Value = f32> {
    -10_000.0f32..10_000.0
}

fn arb_vec2() -> impl Strategy<Value = Vec2> {
    (coord(), coord()).prop_map(|(x, y)| Vec2::new(x, y))
}

fn arb_bounds() -> impl Strategy<Value = Bounds2> {
    (arb_vec2(), 0.5f32..500.0).prop_map(|(c, s)| Bounds2::from_center_size(c, s))
}

proptest! {
    // Points inside report zero distance; points outside report positive distance
    #[test]
    fn distance_zero_iff_contained(b in arb_bounds(), p in arb_vec2()) {
        let d = b.sqr_distance(p);
        prop_assert!(d >= 0.0);
        let inside = p.x >= b.min.x && p.x <= b.max.x && p.y >= b.min.y && p.y <= b.max.y;
        if inside {
            prop_assert_eq!(d, 0.0);
        } else {
            prop_assert!(d > 0.0);
        }
    }

    // Nearest-edge distance never exceeds distance to the centre
    #[test]
    fn edge_distance_bounded_by_center_distance(b in arb_bounds(), p in arb_vec2()) {
        let to_center = (p - b.center()).length();
        prop_assert!(b.distance(p) <= to_center + 1e-3);
    }

    // Translating box and point together leaves the distance unchanged
    #[test]
    fn distance_translation_invariant(b in arb_bounds(), p in arb_vec2(), t in arb_vec2()) {
        let moved = Bounds2::new(b.min + t, b.max + t);
        let d0 = b.distance(p);
        let d1 = moved.distance(p + t);
        prop_assert!((d0 - d1).abs() <= 1e-2 + 1e-4 * d0.abs());
    }
}
