//! Terrain subsystem settings

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::lod::{LodConfig, LodControllerConfig};
use crate::render::VertexLayout;
use crate::terrain::TerrainParams;

/// Settings shared by the editor, the runtime and `terrain_tool`.
///
/// Every field has a default, so partial JSON files are valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// LOD generation
    pub lod: LodConfig,
    /// Runtime LOD selection
    pub controller: LodControllerConfig,
    /// Procedural heights for new terrains
    pub generator: TerrainParams,
    /// Texture tiling for new terrains
    pub default_uv_scale: [f32; 2],
    /// Grid resolution for new terrains
    pub default_resolution: usize,
    pub vertex_layout: VertexLayout,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            lod: LodConfig::default(),
            controller: LodControllerConfig::default(),
            generator: TerrainParams::default(),
            default_uv_scale: [60.0, 60.0],
            default_resolution: 129,
            vertex_layout: VertexLayout::FULL,
        }
    }
}

impl TerrainSettings {
    /// Load from a JSON file (sync)
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&json)?;
        log::debug!("Loaded terrain settings from {}", path.display());
        Ok(settings)
    }

    /// Load from `path` if it exists, otherwise defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_sync(path)
        } else {
            log::info!("No terrain settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save to a JSON file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}
