//! The terrain objects of one scene and their background LOD work

use std::collections::HashMap;

use crate::asset::AssetId;
use crate::core::Camera;
use crate::lod::{LodBuilder, LodConfig, LodJob};
use crate::render::MeshAllocator;
use super::terrain_object::TerrainObject;

/// Owns the scene's terrain objects and the LOD builder feeding them.
///
/// [`update`](Self::update) must run on the render thread: it is where
/// finished LOD data becomes GPU meshes.
pub struct TerrainScene {
    objects: HashMap<AssetId, TerrainObject>,
    builder: LodBuilder,
}

impl TerrainScene {
    pub fn new(lod: LodConfig) -> Self {
        Self {
            objects: HashMap::new(),
            builder: LodBuilder::new(lod),
        }
    }

    pub fn insert(&mut self, id: AssetId, object: TerrainObject) -> Option<TerrainObject> {
        self.objects.insert(id, object)
    }

    /// Remove an object and free its meshes
    pub fn remove(&mut self, id: AssetId, allocator: &mut dyn MeshAllocator) -> Option<TerrainObject> {
        let mut object = self.objects.remove(&id)?;
        object.release(allocator);
        Some(object)
    }

    pub fn get(&self, id: AssetId) -> Option<&TerrainObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut TerrainObject> {
        self.objects.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetId, &TerrainObject)> {
        self.objects.iter().map(|(&id, o)| (id, o))
    }

    /// Queue LOD builds for the given objects. Objects without terrain are skipped.
    pub fn request_lods(&mut self, ids: &[AssetId]) {
        let jobs: Vec<LodJob> = ids
            .iter()
            .filter_map(|&id| {
                let terrain = self.objects.get(&id)?.terrain()?;
                Some(LodJob { terrain: id, input: terrain.lod_input() })
            })
            .collect();
        self.builder.request(jobs);
    }

    /// Queue LOD builds for every loaded terrain
    pub fn request_all_lods(&mut self) {
        let mut ids: Vec<AssetId> = self.objects.keys().copied().collect();
        ids.sort();
        self.request_lods(&ids);
    }

    /// Finish sculpting on `id`, queueing a rebuild when its LODs went stale
    pub fn end_editing(&mut self, id: AssetId, allocator: &mut dyn MeshAllocator) {
        let Some(object) = self.objects.get_mut(&id) else {
            return;
        };
        if object.end_editing(allocator) {
            self.request_lods(&[id]);
        }
    }

    pub fn cancel_lod_builds(&mut self) {
        self.builder.cancel_all();
    }

    pub fn pending_lod_builds(&self) -> usize {
        self.builder.pending_count()
    }

    /// Attach finished LOD data, then cull and update every object's LOD.
    ///
    /// Returns the number of objects whose bound meshes changed.
    pub fn update(&mut self, dt: f32, camera: &Camera, allocator: &mut dyn MeshAllocator) -> usize {
        for result in self.builder.poll_completed() {
            let Some(object) = self.objects.get_mut(&result.terrain) else {
                log::debug!("LOD result for removed terrain {}", result.terrain);
                continue;
            };
            match object.attach_lod_data(result.revision, result.levels, allocator) {
                Ok(true) => {}
                Ok(false) => log::debug!("LODs for '{}' are out of date, dropped", object.name),
                Err(e) => log::warn!("Failed to attach LODs to '{}': {}", object.name, e),
            }
        }

        self.objects
            .values_mut()
            .map(|object| object.update_lod(dt, camera))
            .filter(|&swapped| swapped)
            .count()
    }

    /// Highest terrain surface under world `(x, z)`
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        self.objects
            .values()
            .filter_map(|o| o.world_height_at(x, z))
            .reduce(f32::max)
    }

    /// Free every object's meshes
    pub fn release_all(&mut self, allocator: &mut dyn MeshAllocator) {
        self.builder.cancel_all();
        for object in self.objects.values_mut() {
            object.release(allocator);
        }
    }
}

impl Default for TerrainScene {
    fn default() -> Self {
        Self::new(LodConfig::default())
    }
}
