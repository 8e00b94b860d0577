use proptest::prelude::*;
use terra_geom::Vec2;
use terra_heightmap::{NoiseSettings, NormalizeMode, generate_noise_map, max_possible_height};

fn scenario_settings() -> NoiseSettings {
    NoiseSettings {
        normalize_mode: NormalizeMode::Global,
        scale: 50.0,
        octaves: 4,
        persistence: 0.5,
        lacunarity: 2.0,
        seed: 1,
        offset: Vec2::ZERO,
    }
}

#[test]
fn global_scenario_in_unit_range_and_reproducible() {
    let s = scenario_settings();
    let a = generate_noise_map(10, 10, &s, Vec2::ZERO);
    let b = generate_noise_map(10, 10, &s, Vec2::ZERO);
    assert_eq!(a.len(), 100);
    assert!(a.iter().all(|v| (0.0..=1.0).contains(v)));
    let bits_a: Vec<u32> = a.iter().map(|v| v.to_bits()).collect();
    let bits_b: Vec<u32> = b.iter().map(|v| v.to_bits()).collect();
    assert_eq!(bits_a, bits_b);
}

#[test]
fn determinism_across_threads() {
    let s = scenario_settings();
    let here = generate_noise_map(24, 24, &s, Vec2::new(48.0, -96.0));
    let s2 = s.clone();
    let there = std::thread::spawn(move || generate_noise_map(24, 24, &s2, Vec2::new(48.0, -96.0)))
        .join()
        .unwrap();
    assert_eq!(here, there);
}

#[test]
fn different_seeds_differ() {
    let a = generate_noise_map(16, 16, &scenario_settings(), Vec2::ZERO);
    let b = generate_noise_map(
        16,
        16,
        &NoiseSettings {
            seed: 2,
            ..scenario_settings()
        },
        Vec2::ZERO,
    );
    assert_ne!(a, b);
}

#[test]
fn global_fields_agree_where_tiles_overlap() {
    // Shifting the sample centre by k cells shifts the field by k cells.
    let s = scenario_settings();
    let k = 6usize;
    let w = 16usize;
    let a = generate_noise_map(w, w, &s, Vec2::ZERO);
    let east = generate_noise_map(w, w, &s, Vec2::new(k as f32, 0.0));
    let north = generate_noise_map(w, w, &s, Vec2::new(0.0, k as f32));
    for y in 0..w {
        for x in 0..(w - k) {
            assert_eq!(east[y * w + x], a[y * w + x + k]);
        }
    }
    for y in k..w {
        for x in 0..w {
            assert_eq!(north[y * w + x], a[(y - k) * w + x]);
        }
    }
}

#[test]
fn local_range_spans_unit_interval() {
    let s = NoiseSettings {
        normalize_mode: NormalizeMode::Local,
        ..scenario_settings()
    };
    let v = generate_noise_map(32, 32, &s, Vec2::new(3.0, 9.0));
    let min = v.iter().copied().fold(f32::MAX, f32::min);
    let max = v.iter().copied().fold(f32::MIN, f32::max);
    assert!(min.abs() < 1e-6, "min {min}");
    assert!((max - 1.0).abs() < 1e-6, "max {max}");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Adding octaves never lowers the normalization denominator
    #[test]
    fn max_amplitude_monotonic_in_octaves(octaves in 1u32..16, persistence in 0.0f32..=1.0) {
        prop_assert!(max_possible_height(octaves + 1, persistence) >= max_possible_height(octaves, persistence));
    }

    // LOCAL normalization always spans [0,1] for non-flat fields
    #[test]
    fn local_normalization_hits_both_ends(seed in any::<i32>(), octaves in 1u32..6, cx in -500i32..500, cy in -500i32..500) {
        let s = NoiseSettings {
            normalize_mode: NormalizeMode::Local,
            seed,
            octaves,
            scale: 7.5,
            ..NoiseSettings::default()
        };
        let v = generate_noise_map(12, 12, &s, Vec2::new(cx as f32, cy as f32));
        let min = v.iter().copied().fold(f32::MAX, f32::min);
        let max = v.iter().copied().fold(f32::MIN, f32::max);
        prop_assume!(max > min);
        prop_assert!(min.abs() < 1e-6);
        prop_assert!((max - 1.0).abs() < 1e-6);
    }

    // GLOBAL output is never negative whatever the parameters
    #[test]
    fn global_values_non_negative(seed in any::<i32>(), octaves in 0u32..8, persistence in 0.0f32..1.0, lacunarity in 0.5f32..3.0) {
        let s = NoiseSettings {
            normalize_mode: NormalizeMode::Global,
            seed,
            octaves,
            persistence,
            lacunarity,
            ..NoiseSettings::default()
        };
        let v = generate_noise_map(8, 8, &s, Vec2::ZERO);
        prop_assert!(v.iter().all(|x| *x >= 0.0));
    }
}
