//! The terrain aggregate: heights, mesh, splat channels and LODs

use std::path::Path;

use crate::core::types::{Vec2, Vec3};
use crate::core::{Error, Result};
use crate::io::{load_terrain_file, save_terrain_file, FormatVersion, TerrainFileData};
use crate::lod::{LodInput, LodLevel, LodMeshData, LodSet};
use crate::math::Aabb;
use crate::render::{MeshAllocator, RenderMesh, VertexLayout};
use super::heightfield::HeightField;
use super::mesh::PlaneMesh;
use super::splat::SplatChannelSet;

/// A heightfield terrain with its CPU mesh and GPU resources.
///
/// All coordinates are local to the terrain: the grid spans
/// `[0, width] × [0, depth]` on XZ.
#[derive(Debug)]
pub struct Terrain {
    field: HeightField,
    mesh: PlaneMesh,
    splat: SplatChannelSet,
    base: Option<RenderMesh>,
    lods: LodSet,
    /// CPU copy of levels 1.., written back on save
    lod_data: Vec<Vec<LodMeshData>>,
    /// Bumped by every height edit
    revision: u64,
    /// Height revision `lod_data` was simplified from
    lod_revision: u64,
}

impl Terrain {
    pub fn new(field: HeightField, uv_scale: Vec2, layout: VertexLayout) -> Self {
        let mesh = PlaneMesh::new(&field, uv_scale, layout);
        Self {
            field,
            mesh,
            splat: SplatChannelSet::new(),
            base: None,
            lods: LodSet::default(),
            lod_data: Vec::new(),
            revision: 0,
            lod_revision: 0,
        }
    }

    /// Build from decoded file contents. Resolution is implied by the sample count.
    pub fn from_file_data(data: TerrainFileData, width: f32, depth: f32, uv_scale: Vec2, layout: VertexLayout) -> Result<Self> {
        let field = HeightField::from_legacy_heights(data.heights, width, depth)?;
        let mut terrain = Self::new(field, uv_scale, layout);

        let vertex_stride = layout.stride();
        if data.lods.iter().flatten().any(|m| m.vertices.len() % vertex_stride != 0) {
            log::warn!("Stored LOD meshes do not match vertex layout (stride {}), ignoring them", vertex_stride);
        } else {
            terrain.lod_data = data.lods;
        }
        Ok(terrain)
    }

    /// Snapshot for saving
    pub fn to_file_data(&self) -> TerrainFileData {
        let lods = if self.lods_stale() { Vec::new() } else { self.lod_data.clone() };
        TerrainFileData::new(self.field.heights().to_vec(), lods)
    }

    pub fn load(path: &Path, width: f32, depth: f32, uv_scale: Vec2, layout: VertexLayout) -> Result<Self> {
        let data = load_terrain_file(path)?;
        let terrain = Self::from_file_data(data, width, depth, uv_scale, layout)?;
        log::info!(
            "Loaded terrain {} ({}x{}, {} LOD levels)",
            path.display(),
            terrain.field.resolution(),
            terrain.field.resolution(),
            terrain.lod_data.len()
        );
        Ok(terrain)
    }

    pub fn save(&self, path: &Path, version: FormatVersion) -> Result<()> {
        save_terrain_file(path, &self.to_file_data(), version)
    }

    /// Allocate the base mesh and any stored LOD levels on the GPU.
    ///
    /// Re-uploading releases the previous meshes first.
    pub fn upload(&mut self, allocator: &mut dyn MeshAllocator) -> Result<()> {
        self.release(allocator);

        if !self.mesh.dirty_rect().is_empty() {
            self.mesh.build_vertices(&self.field);
            self.mesh.calculate_average_normals();
            self.mesh.clear_dirty();
        }
        let base = RenderMesh::allocate(allocator, self.mesh.mesh_desc())?;
        self.base = Some(base);
        let base_level = LodLevel::new(vec![base]);

        self.lods = if self.lod_data.is_empty() || self.lods_stale() {
            LodSet::new(base_level)
        } else {
            match LodSet::from_data(base_level.clone(), &self.lod_data, self.mesh.layout(), allocator) {
                Ok(set) => set,
                Err(e) => {
                    log::warn!("Failed to allocate stored LOD meshes, using base mesh only: {}", e);
                    LodSet::new(base_level)
                }
            }
        };
        Ok(())
    }

    /// Replace LOD levels 1.. with data simplified from height `revision`.
    ///
    /// Returns `Ok(false)` and keeps the current levels when the heights
    /// changed after the snapshot was taken.
    pub fn attach_lod_data(
        &mut self,
        revision: u64,
        levels: Vec<Vec<LodMeshData>>,
        allocator: &mut dyn MeshAllocator,
    ) -> Result<bool> {
        let base = self
            .base
            .ok_or_else(|| Error::Render("terrain base mesh is not uploaded".into()))?;
        if revision != self.revision {
            log::debug!("Discarding LODs built from height revision {} (now {})", revision, self.revision);
            return Ok(false);
        }

        let set = LodSet::from_data(LodLevel::new(vec![base]), &levels, self.mesh.layout(), allocator)?;
        self.lods.release(allocator);
        self.lods = set;
        self.lod_data = levels;
        self.lod_revision = revision;
        Ok(true)
    }

    /// Free levels 1.. if the heights changed since they were built.
    ///
    /// Returns true when levels were dropped.
    pub fn drop_stale_lods(&mut self, allocator: &mut dyn MeshAllocator) -> bool {
        if !self.lods_stale() {
            return false;
        }
        self.lods.release(allocator);
        self.lod_data.clear();
        self.lod_revision = self.revision;
        true
    }

    /// Free all GPU meshes owned by this terrain
    pub fn release(&mut self, allocator: &mut dyn MeshAllocator) {
        self.lods.release(allocator);
        self.lods = LodSet::default();
        if let Some(base) = self.base.take() {
            allocator.release(base.handle);
        }
    }

    /// Change one height sample and mark it for the next [`rebuild_dirty`](Self::rebuild_dirty).
    ///
    /// Existing LOD levels and in-flight LOD builds become stale.
    pub fn set_height(&mut self, x: usize, z: usize, height: f32) -> bool {
        if !self.field.set_height(x, z, height) {
            return false;
        }
        self.mesh.modify_vertex(x, z);
        self.revision += 1;
        true
    }

    /// Rebuild the edited region and push it to the base mesh if uploaded
    pub fn rebuild_dirty(&mut self, allocator: &mut dyn MeshAllocator) -> Result<()> {
        if self.mesh.dirty_rect().is_empty() {
            return Ok(());
        }
        self.mesh.build_vertices(&self.field);
        self.mesh.calculate_average_normals();
        match self.base {
            Some(base) => self.mesh.update_mesh_vertices(allocator, base.handle),
            None => {
                self.mesh.clear_dirty();
                Ok(())
            }
        }
    }

    /// Surface height at local `(x, z)`, interpolated over the mesh triangles.
    ///
    /// `None` outside the terrain.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        let (width, depth) = (self.field.width(), self.field.depth());
        if !(0.0..=width).contains(&x) || !(0.0..=depth).contains(&z) {
            return None;
        }

        let res = self.field.resolution();
        let (dx, dz) = self.field.grid_spacing();
        let fx = x / dx;
        let fz = z / dz;
        let cx = (fx.floor() as usize).min(res - 2);
        let cz = (fz.floor() as usize).min(res - 2);
        let tx = fx - cx as f32;
        let tz = fz - cz as f32;

        let h = |x: usize, z: usize| self.field.height(x, z).unwrap_or(0.0);
        let (h00, h10, h01, h11) = (h(cx, cz), h(cx + 1, cz), h(cx, cz + 1), h(cx + 1, cz + 1));

        // Cells split along c00-c11, matching the index buffer
        let height = if tx >= tz {
            h00 + tx * (h10 - h00) + tz * (h11 - h10)
        } else {
            h00 + tz * (h01 - h00) + tx * (h11 - h01)
        };
        Some(height)
    }

    /// Surface normal at local `(x, z)` from central differences, `None` outside
    pub fn normal_at(&self, x: f32, z: f32) -> Option<Vec3> {
        self.height_at(x, z)?;

        let (dx, dz) = self.field.grid_spacing();
        let (width, depth) = (self.field.width(), self.field.depth());
        let (x0, x1) = ((x - dx).max(0.0), (x + dx).min(width));
        let (z0, z1) = ((z - dz).max(0.0), (z + dz).min(depth));

        let slope_x = (self.height_at(x1, z)? - self.height_at(x0, z)?) / (x1 - x0);
        let slope_z = (self.height_at(x, z1)? - self.height_at(x, z0)?) / (z1 - z0);
        Some(Vec3::new(-slope_x, 1.0, -slope_z).normalize())
    }

    /// Local-space bounds of the surface
    pub fn bounds(&self) -> Aabb {
        let (lo, hi) = self.field.min_max();
        Aabb::new(Vec3::new(0.0, lo, 0.0), Vec3::new(self.field.width(), hi, self.field.depth()))
    }

    /// Immutable snapshot of the base mesh for background simplification
    pub fn lod_input(&self) -> LodInput {
        LodInput {
            resolution: self.field.resolution(),
            width: self.field.width(),
            depth: self.field.depth(),
            layout: self.mesh.layout(),
            revision: self.revision,
            vertices: self.mesh.vertices().into(),
            indices: self.mesh.indices().into(),
        }
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }

    pub fn mesh(&self) -> &PlaneMesh {
        &self.mesh
    }

    pub fn splat(&self) -> &SplatChannelSet {
        &self.splat
    }

    pub fn splat_mut(&mut self) -> &mut SplatChannelSet {
        &mut self.splat
    }

    pub fn lods(&self) -> &LodSet {
        &self.lods
    }

    /// GPU base mesh, once uploaded
    pub fn base_mesh(&self) -> Option<RenderMesh> {
        self.base
    }

    /// Stored LOD levels 1.. (CPU side)
    pub fn lod_data(&self) -> &[Vec<LodMeshData>] {
        &self.lod_data
    }

    /// Heights changed since the LOD levels were built
    pub fn lods_stale(&self) -> bool {
        !self.lod_data.is_empty() && self.lod_revision != self.revision
    }

    /// Height edit counter, carried by [`lod_input`](Self::lod_input) snapshots
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn width(&self) -> f32 {
        self.field.width()
    }

    pub fn depth(&self) -> f32 {
        self.field.depth()
    }
}
