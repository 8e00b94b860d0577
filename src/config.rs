use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use terra_heightmap::{HeightMapSettings, TerrainRegion, TextureSettings};
use terra_mesh::MeshSettings;
use terra_stream::StreamSettings;

/// Every tunable group, one TOML table each. Missing tables use defaults.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TerrainConfig {
    #[serde(default)]
    pub height: HeightMapSettings,
    #[serde(default)]
    pub mesh: MeshSettings,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub texture: TextureSettings,
    #[serde(default = "default_regions")]
    pub regions: Vec<TerrainRegion>,
}

fn default_regions() -> Vec<TerrainRegion> {
    let region = |name: &str, height: f32, color: [u8; 3]| TerrainRegion {
        name: name.to_string(),
        height,
        color,
    };
    vec![
        region("deep water", 0.3, [30, 60, 160]),
        region("shallow water", 0.4, [55, 100, 200]),
        region("sand", 0.45, [210, 205, 130]),
        region("grass", 0.55, [85, 150, 30]),
        region("forest", 0.6, [60, 105, 25]),
        region("rock", 0.7, [90, 70, 65]),
        region("high rock", 0.9, [75, 60, 55]),
        region("snow", 1.0, [240, 240, 240]),
    ]
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            height: HeightMapSettings::default(),
            mesh: MeshSettings::default(),
            stream: StreamSettings::default(),
            texture: TextureSettings::default(),
            regions: default_regions(),
        }
    }
}

impl TerrainConfig {
    pub fn validated(&self) -> Self {
        Self {
            height: self.height.validated(),
            mesh: self.mesh.validated(),
            stream: self.stream.validated(),
            texture: self.texture.clone(),
            regions: self.regions.clone(),
        }
    }
}

pub fn load_config_from_path(path: &Path) -> Result<TerrainConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let cfg: TerrainConfig = toml::from_str(&s)?;
    Ok(cfg.validated())
}

/// Reads `path` when given, otherwise returns the defaults.
pub fn load_config(path: Option<&Path>) -> Result<TerrainConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            let cfg = load_config_from_path(path)?;
            log::info!("loaded config from {}", path.display());
            Ok(cfg)
        }
        None => Ok(TerrainConfig::default()),
    }
}
