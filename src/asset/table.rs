//! In-memory asset table

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::Error;
use super::{resolve_dependencies, uses_asset, Asset, AssetId, AssetKind, TerrainAsset, TerrainLayerAsset, TextureAsset};

/// All loaded assets of a project, keyed by id
#[derive(Debug, Default)]
pub struct AssetTable {
    assets: HashMap<AssetId, Asset>,
    /// Base directory for relative asset paths
    root: Option<PathBuf>,
}

impl AssetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table whose relative asset paths resolve against `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            assets: HashMap::new(),
            root: Some(root.into()),
        }
    }

    /// Absolute location of an asset file
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Insert or replace an asset, returning the previous one
    pub fn insert(&mut self, asset: Asset) -> Option<Asset> {
        self.assets.insert(asset.id, asset)
    }

    pub fn remove(&mut self, id: AssetId) -> Option<Asset> {
        self.assets.remove(&id)
    }

    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(&id)
    }

    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut Asset> {
        self.assets.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Shared handle to a texture asset
    pub fn texture(&self, id: AssetId) -> Option<Arc<TextureAsset>> {
        match &self.assets.get(&id)?.kind {
            AssetKind::Texture(texture) => Some(Arc::clone(texture)),
            _ => None,
        }
    }

    pub fn terrain_layer(&self, id: AssetId) -> Option<&TerrainLayerAsset> {
        match &self.assets.get(&id)?.kind {
            AssetKind::TerrainLayer(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn terrain_layer_mut(&mut self, id: AssetId) -> Option<&mut TerrainLayerAsset> {
        match &mut self.assets.get_mut(&id)?.kind {
            AssetKind::TerrainLayer(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn terrain(&self, id: AssetId) -> Option<&TerrainAsset> {
        match &self.assets.get(&id)?.kind {
            AssetKind::Terrain(terrain) => Some(terrain),
            _ => None,
        }
    }

    pub fn terrain_mut(&mut self, id: AssetId) -> Option<&mut TerrainAsset> {
        match &mut self.assets.get_mut(&id)?.kind {
            AssetKind::Terrain(terrain) => Some(terrain),
            _ => None,
        }
    }

    /// Ids of every asset that references `id`, sorted
    pub fn assets_using(&self, id: AssetId) -> Vec<AssetId> {
        let mut users: Vec<AssetId> = self
            .assets
            .values()
            .filter(|a| uses_asset(a, id))
            .map(|a| a.id)
            .collect();
        users.sort();
        users
    }

    /// Resolve every asset's dependencies in priority order.
    ///
    /// Returns the missing-dependency diagnostics of all assets.
    pub fn resolve_all(&mut self) -> Vec<Error> {
        let mut order: Vec<(u8, AssetId)> = self
            .assets
            .values()
            .map(|a| (a.priority(), a.id))
            .collect();
        order.sort();

        let mut diagnostics = Vec::new();
        for (_, id) in order {
            // Take the asset out so it can read the rest of the table
            let Some(mut asset) = self.assets.remove(&id) else {
                continue;
            };
            diagnostics.extend(resolve_dependencies(&mut asset, self));
            self.assets.insert(id, asset);
        }

        if !diagnostics.is_empty() {
            log::warn!("Asset resolution finished with {} missing dependencies", diagnostics.len());
        }
        diagnostics
    }
}
