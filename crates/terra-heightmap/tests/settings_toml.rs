use terra_heightmap::{HeightMapSettings, NormalizeMode, TextureSettings};

#[test]
fn height_settings_parse_with_defaults() {
    let src = r#"
        height_multiplier = 42.0
        use_falloff = true
        curve = [
            { time = 0.0, value = 0.0 },
            { time = 0.5, value = 0.1 },
            { time = 1.0, value = 1.0, in_tangent = 2.0, out_tangent = 2.0 },
        ]

        [noise]
        normalize_mode = "local"
        octaves = 3
        offset = [4.0, -2.0]
    "#;
    let s: HeightMapSettings = toml::from_str(src).unwrap();
    assert_eq!(s.height_multiplier, 42.0);
    assert!(s.use_falloff);
    assert_eq!(s.noise.normalize_mode, NormalizeMode::Local);
    assert_eq!(s.noise.octaves, 3);
    assert_eq!(s.noise.scale, 50.0);
    assert_eq!(s.noise.offset.x, 4.0);
    assert_eq!(s.noise.offset.y, -2.0);
    let curve = s.curve.unwrap();
    assert_eq!(curve.keys().len(), 3);
    assert!((curve.evaluate(0.5) - 0.1).abs() < 1e-6);
}

#[test]
fn empty_documents_use_defaults() {
    let s: HeightMapSettings = toml::from_str("").unwrap();
    assert_eq!(s, HeightMapSettings::default());
    let t: TextureSettings = toml::from_str("").unwrap();
    assert_eq!(t, TextureSettings::default());
}
