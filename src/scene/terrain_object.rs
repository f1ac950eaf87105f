//! Terrain as placed in a scene

use std::path::Path;

use crate::asset::TerrainMeta;
use crate::core::types::{Vec2, Vec3};
use crate::core::{Camera, Result};
use crate::lod::{LodControllerConfig, LodMeshData, LodPlacement, TerrainLodController};
use crate::math::Aabb;
use crate::render::{MeshAllocator, Renderable, TerrainShaderFeatures};
use crate::terrain::Terrain;
use super::node::Transform;

/// A terrain instance: transform, optional terrain data, the meshes the
/// renderer draws and the LOD controller choosing them.
///
/// An object whose terrain failed to load stays in the scene and draws nothing.
#[derive(Debug)]
pub struct TerrainObject {
    pub name: String,
    pub transform: Transform,
    terrain: Option<Terrain>,
    renderable: Renderable,
    lod_controller: TerrainLodController,
    visible: bool,
}

impl TerrainObject {
    /// Empty object with no terrain attached
    pub fn new(name: impl Into<String>, transform: Transform, config: LodControllerConfig) -> Self {
        Self {
            name: name.into(),
            transform,
            terrain: None,
            renderable: Renderable::default(),
            lod_controller: TerrainLodController::new(config),
            visible: true,
        }
    }

    /// Load the terrain described by `meta` from `path` and upload it.
    ///
    /// Failures are logged and leave the object without terrain.
    pub fn load(
        name: impl Into<String>,
        transform: Transform,
        path: &Path,
        meta: &TerrainMeta,
        allocator: &mut dyn MeshAllocator,
        config: LodControllerConfig,
    ) -> Self {
        let mut object = Self::new(name, transform, config);
        let uv_scale = Vec2::from_array(meta.uv_scale);
        let loaded = Terrain::load(path, meta.width, meta.depth, uv_scale, meta.layout)
            .and_then(|terrain| object.set_terrain(terrain, allocator));
        if let Err(e) = loaded {
            log::error!("Failed to load terrain '{}' from {}: {}", object.name, path.display(), e);
        }
        object
    }

    /// Upload `terrain` and bind its base mesh, releasing any previous terrain
    pub fn set_terrain(&mut self, mut terrain: Terrain, allocator: &mut dyn MeshAllocator) -> Result<()> {
        self.release(allocator);
        terrain.upload(allocator)?;
        self.bind_base(&terrain);
        self.lod_controller.mark_dirty();
        self.terrain = Some(terrain);
        Ok(())
    }

    pub fn terrain(&self) -> Option<&Terrain> {
        self.terrain.as_ref()
    }

    pub fn terrain_mut(&mut self) -> Option<&mut Terrain> {
        self.terrain.as_mut()
    }

    pub fn lod_controller(&self) -> &TerrainLodController {
        &self.lod_controller
    }

    /// Meshes currently bound for drawing
    pub fn current_lod_mesh(&self) -> &Renderable {
        &self.renderable
    }

    /// Result of the last frustum test
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// World-space bounds, `None` without terrain
    pub fn world_bounds(&self) -> Option<Aabb> {
        let terrain = self.terrain.as_ref()?;
        Some(terrain.bounds().scaled_translated(self.transform.scale, self.transform.position))
    }

    /// Cull against the camera and advance the LOD controller.
    ///
    /// Returns true when the bound meshes changed.
    pub fn update_lod(&mut self, dt: f32, camera: &Camera) -> bool {
        let Some(bounds) = self.world_bounds() else {
            return false;
        };
        self.visible = camera.frustum().intersects_aabb(&bounds);
        if !self.visible {
            return false;
        }

        let Some(terrain) = self.terrain.as_ref() else {
            return false;
        };
        self.renderable.features = TerrainShaderFeatures::from_channels(terrain.splat());
        let placement = LodPlacement {
            position: self.transform.position,
            scale: self.transform.scale,
            terrain_width: terrain.width(),
        };
        self.lod_controller
            .update(dt, camera.position, camera.far, &placement, terrain.lods(), &mut self.renderable)
    }

    /// Install LOD levels built from height `revision` (render thread).
    ///
    /// Returns false when the levels were not attached: no terrain, or the
    /// heights were edited after the build started.
    pub fn attach_lod_data(
        &mut self,
        revision: u64,
        levels: Vec<Vec<LodMeshData>>,
        allocator: &mut dyn MeshAllocator,
    ) -> Result<bool> {
        let Some(terrain) = self.terrain.as_mut() else {
            log::debug!("Dropping LOD data for '{}', terrain not loaded", self.name);
            return Ok(false);
        };
        if !terrain.attach_lod_data(revision, levels, allocator)? {
            return Ok(false);
        }
        // Old level meshes are gone; rebind until the controller picks again
        self.bind_base_of_current();
        self.lod_controller.mark_dirty();
        Ok(true)
    }

    /// Bind full detail and pause LOD selection while sculpting
    pub fn begin_editing(&mut self) {
        if let Some(terrain) = self.terrain.as_ref() {
            self.lod_controller.disable(terrain.lods(), &mut self.renderable);
        }
    }

    /// Resume LOD selection after sculpting.
    ///
    /// Levels built from the pre-edit heights are released, leaving full
    /// detail bound. Returns true when that happened and the LODs need a
    /// rebuild.
    pub fn end_editing(&mut self, allocator: &mut dyn MeshAllocator) -> bool {
        let Some(terrain) = self.terrain.as_mut() else {
            return false;
        };
        let dropped = terrain.drop_stale_lods(allocator);
        if dropped {
            self.bind_base_of_current();
            self.lod_controller.mark_dirty();
        }
        if let Some(terrain) = self.terrain.as_ref() {
            self.lod_controller.enable(terrain.lods(), &mut self.renderable);
        }
        dropped
    }

    /// Terrain height under world `(x, z)`, `None` off the terrain or without one
    pub fn world_height_at(&self, x: f32, z: f32) -> Option<f32> {
        let terrain = self.terrain.as_ref()?;
        let local = self.transform.world_to_local(Vec3::new(x, 0.0, z));
        let h = terrain.height_at(local.x, local.z)?;
        Some(h * self.transform.scale.y + self.transform.position.y)
    }

    /// Free all GPU meshes and detach the terrain's meshes from the renderable
    pub fn release(&mut self, allocator: &mut dyn MeshAllocator) {
        if let Some(terrain) = self.terrain.as_mut() {
            terrain.release(allocator);
        }
        self.renderable = Renderable::default();
    }

    fn bind_base(&mut self, terrain: &Terrain) {
        self.renderable.meshes = terrain.base_mesh().into_iter().collect();
        self.renderable.features = TerrainShaderFeatures::from_channels(terrain.splat());
    }

    fn bind_base_of_current(&mut self) {
        if let Some(terrain) = self.terrain.as_ref() {
            self.renderable.meshes = terrain.base_mesh().into_iter().collect();
        }
    }
}
