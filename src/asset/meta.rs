//! JSON metadata stored beside terrain and terrain-layer assets

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::render::VertexLayout;
use crate::terrain::SplatChannel;
use super::AssetId;

/// Current version of the metadata files
pub const META_VERSION: u32 = 1;

/// Texture ids per splat channel, as saved by the editor
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainLayerDesc {
    pub version: u32,
    pub name: String,
    /// Diffuse texture per channel
    pub diffuse: Vec<(SplatChannel, AssetId)>,
    /// Normal map per channel
    pub normal: Vec<(SplatChannel, AssetId)>,
    #[serde(default)]
    pub triplanar: bool,
    /// RGBA blend weights (PNG), relative to the asset root
    #[serde(default)]
    pub splat_map: Option<PathBuf>,
}

impl TerrainLayerDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: META_VERSION,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Every texture id this layer points at
    pub fn texture_ids(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.diffuse.iter().chain(self.normal.iter()).map(|&(_, id)| id)
    }
}

/// Terrain asset metadata: where the height data lives and how to mesh it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainMeta {
    pub version: u32,
    pub name: String,
    /// Binary terrain file, relative to the project root
    pub file: PathBuf,
    /// World size along X
    pub width: f32,
    /// World size along Z
    pub depth: f32,
    /// Texture repeat across the whole terrain
    pub uv_scale: [f32; 2],
    #[serde(default)]
    pub layout: VertexLayout,
    /// Terrain layer providing the splat channels
    #[serde(default)]
    pub layer: Option<AssetId>,
}

impl TerrainMeta {
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>, width: f32, depth: f32) -> Self {
        Self {
            version: META_VERSION,
            name: name.into(),
            file: file.into(),
            width,
            depth,
            uv_scale: [60.0, 60.0],
            layout: VertexLayout::FULL,
            layer: None,
        }
    }

    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<(), io::Error> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)
    }

    /// Load from file (sync)
    pub fn load_sync(path: &Path) -> Result<Self, io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_terrain_meta_persistence() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("meta/island.json");

        let mut meta = TerrainMeta::new("island", "terrains/island.terra", 1200.0, 800.0);
        meta.layer = Some(AssetId(42));
        meta.save_sync(&path).expect("save failed");

        let loaded = TerrainMeta::load_sync(&path).expect("load failed");
        assert_eq!(loaded, meta);
    }

    #[test]
    fn test_terrain_meta_defaults_for_missing_fields() {
        let json = r#"{"version":1,"name":"t","file":"t.terra","width":10.0,"depth":10.0,"uv_scale":[1.0,1.0]}"#;
        let meta: TerrainMeta = serde_json::from_str(json).expect("parse failed");
        assert_eq!(meta.layout, VertexLayout::FULL);
        assert_eq!(meta.layer, None);
    }

    #[test]
    fn test_layer_desc_without_splat_map_field() {
        let json = r#"{"version":1,"name":"rock","diffuse":[],"normal":[]}"#;
        let desc: TerrainLayerDesc = serde_json::from_str(json).expect("parse failed");
        assert_eq!(desc.splat_map, None);
        assert!(!desc.triplanar);
    }

    #[test]
    fn test_layer_desc_texture_ids() {
        let mut desc = TerrainLayerDesc::new("grassland");
        desc.diffuse.push((SplatChannel::Base, AssetId(1)));
        desc.normal.push((SplatChannel::R, AssetId(2)));
        desc.splat_map = Some(PathBuf::from("layers/grassland_splat.png"));
        let ids: Vec<_> = desc.texture_ids().collect();
        assert_eq!(ids, vec![AssetId(1), AssetId(2)]);

        let json = serde_json::to_string(&desc).expect("serialize failed");
        let parsed: TerrainLayerDesc = serde_json::from_str(&json).expect("parse failed");
        assert_eq!(parsed, desc);
    }
}
