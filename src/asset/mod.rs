//! Asset model for the assets the terrain subsystem depends on
//!
//! Heterogeneous assets are one tagged enum. Dependency queries and
//! resolution are free functions that match on the kind, and resolution
//! runs in priority order: textures, then terrain layers, then terrains.

pub mod texture;
pub mod meta;
pub mod table;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::terrain::{SplatChannelSet, SplatMap, Terrain};

pub use texture::{TextureAsset, TextureHandle};
pub use meta::{TerrainLayerDesc, TerrainMeta};
pub use table::AssetTable;

/// Stable asset identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Splat channel description plus its resolved textures
#[derive(Clone, Debug, Default)]
pub struct TerrainLayerAsset {
    pub desc: TerrainLayerDesc,
    pub channels: SplatChannelSet,
}

impl TerrainLayerAsset {
    pub fn new(desc: TerrainLayerDesc) -> Self {
        let mut channels = SplatChannelSet::new();
        channels.set_triplanar(desc.triplanar);
        Self { desc, channels }
    }

    /// Write the blend map to the path named in the descriptor.
    ///
    /// Returns false when there is no map or no path to write it to.
    pub fn save_splat_map(&self, table: &AssetTable) -> Result<bool> {
        let (Some(map), Some(path)) = (self.channels.splat_map(), self.desc.splat_map.as_ref()) else {
            return Ok(false);
        };
        map.save_png(&table.resolve_path(path))?;
        Ok(true)
    }
}

/// Terrain metadata plus the loaded terrain.
///
/// `terrain` is `None` when the height data failed to load; the asset stays
/// in the table so the scene keeps its object.
#[derive(Debug)]
pub struct TerrainAsset {
    pub meta: TerrainMeta,
    pub terrain: Option<Terrain>,
}

/// Per-kind payload
#[derive(Debug)]
pub enum AssetKind {
    Texture(Arc<TextureAsset>),
    TerrainLayer(TerrainLayerAsset),
    Terrain(TerrainAsset),
}

#[derive(Debug)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    pub kind: AssetKind,
}

impl Asset {
    pub fn texture(texture: TextureAsset) -> Self {
        Self {
            id: texture.id,
            name: texture.name.clone(),
            kind: AssetKind::Texture(Arc::new(texture)),
        }
    }

    pub fn terrain_layer(id: AssetId, desc: TerrainLayerDesc) -> Self {
        Self {
            id,
            name: desc.name.clone(),
            kind: AssetKind::TerrainLayer(TerrainLayerAsset::new(desc)),
        }
    }

    pub fn terrain(id: AssetId, meta: TerrainMeta, terrain: Option<Terrain>) -> Self {
        Self {
            id,
            name: meta.name.clone(),
            kind: AssetKind::Terrain(TerrainAsset { meta, terrain }),
        }
    }

    /// Resolution order; lower resolves first
    pub fn priority(&self) -> u8 {
        match self.kind {
            AssetKind::Texture(_) => 0,
            AssetKind::TerrainLayer(_) => 1,
            AssetKind::Terrain(_) => 2,
        }
    }
}

/// Does `asset` reference `id`?
pub fn uses_asset(asset: &Asset, id: AssetId) -> bool {
    match &asset.kind {
        AssetKind::Texture(_) => false,
        AssetKind::TerrainLayer(layer) => layer.desc.texture_ids().any(|t| t == id),
        AssetKind::Terrain(terrain) => terrain.meta.layer == Some(id),
    }
}

/// Bind the assets `asset` depends on, looking them up in `table`.
///
/// Unresolvable references are left unassigned and returned as
/// [`Error::MissingDependency`] diagnostics; they never abort resolution.
pub fn resolve_dependencies(asset: &mut Asset, table: &AssetTable) -> Vec<Error> {
    let mut missing = Vec::new();
    let owner = &asset.name;

    match &mut asset.kind {
        AssetKind::Texture(_) => {}
        AssetKind::TerrainLayer(layer) => {
            let mut channels = SplatChannelSet::new();
            channels.set_triplanar(layer.desc.triplanar);
            let splat_map = match &layer.desc.splat_map {
                Some(path) => {
                    let full = table.resolve_path(path);
                    match SplatMap::load_png(&full) {
                        Ok(map) => Some(map),
                        Err(e) => {
                            log::warn!("Terrain layer '{}': splat map {} failed to load: {}", owner, full.display(), e);
                            missing.push(Error::MissingDependency {
                                owner: owner.to_string(),
                                missing: full.display().to_string(),
                            });
                            None
                        }
                    }
                }
                // Painted in the editor and not saved yet
                None => layer.channels.splat_map().cloned(),
            };
            channels.set_splat_map(splat_map);

            for &(channel, id) in &layer.desc.diffuse {
                match table.texture(id) {
                    Some(texture) => channels.set_channel(channel, texture),
                    None => {
                        log::warn!("Terrain layer '{}': diffuse texture {} for {:?} not found, leaving channel empty", owner, id, channel);
                        missing.push(missing_dependency(owner, id));
                    }
                }
            }
            for &(channel, id) in &layer.desc.normal {
                match table.texture(id) {
                    Some(texture) => channels.set_normal_channel(channel, texture),
                    None => {
                        log::warn!("Terrain layer '{}': normal texture {} for {:?} not found, leaving channel empty", owner, id, channel);
                        missing.push(missing_dependency(owner, id));
                    }
                }
            }
            layer.channels = channels;
        }
        AssetKind::Terrain(terrain_asset) => {
            let Some(layer_id) = terrain_asset.meta.layer else {
                return missing;
            };
            match table.terrain_layer(layer_id) {
                Some(layer) => {
                    if let Some(terrain) = terrain_asset.terrain.as_mut() {
                        *terrain.splat_mut() = layer.channels.clone();
                    }
                }
                None => {
                    log::warn!("Terrain '{}': terrain layer {} not found, rendering without textures", owner, layer_id);
                    missing.push(missing_dependency(owner, layer_id));
                }
            }
        }
    }

    missing
}

fn missing_dependency(owner: &str, id: AssetId) -> Error {
    Error::MissingDependency {
        owner: owner.to_string(),
        missing: id.to_string(),
    }
}
