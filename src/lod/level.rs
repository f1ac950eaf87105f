//! LOD levels and the per-terrain level set

use crate::core::Result;
use crate::render::{MeshAllocator, MeshDesc, RenderMesh, VertexLayout};

/// CPU-side mesh arrays for one LOD mesh.
///
/// Produced by the file codec and by simplification; turned into a
/// [`RenderMesh`] on the render thread.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LodMeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u16>,
}

impl LodMeshData {
    pub fn new(vertices: Vec<f32>, indices: Vec<u16>) -> Self {
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn mesh_desc(&self, layout: VertexLayout) -> MeshDesc<'_> {
        MeshDesc::new(&self.vertices, &self.indices, layout)
    }
}

/// The meshes drawn for one level of detail
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LodLevel {
    pub meshes: Vec<RenderMesh>,
}

impl LodLevel {
    pub fn new(meshes: Vec<RenderMesh>) -> Self {
        Self { meshes }
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// Ordered LOD levels of a terrain, index 0 = full detail.
///
/// Level 0 mirrors the terrain's base mesh and is never released here;
/// levels 1.. are owned by the set.
#[derive(Clone, Debug, Default)]
pub struct LodSet {
    levels: Vec<LodLevel>,
}

impl LodSet {
    /// Set containing only the base level
    pub fn new(base: LodLevel) -> Self {
        Self { levels: vec![base] }
    }

    /// Allocate GPU meshes for `data` (levels 1..) on top of `base`.
    ///
    /// On allocation failure everything allocated so far is released.
    pub fn from_data(
        base: LodLevel,
        data: &[Vec<LodMeshData>],
        layout: VertexLayout,
        allocator: &mut dyn MeshAllocator,
    ) -> Result<Self> {
        let mut set = Self::new(base);
        for level in data {
            let mut meshes = Vec::with_capacity(level.len());
            for mesh in level {
                match RenderMesh::allocate(allocator, mesh.mesh_desc(layout)) {
                    Ok(render_mesh) => meshes.push(render_mesh),
                    Err(e) => {
                        for m in meshes {
                            allocator.release(m.handle);
                        }
                        set.release(allocator);
                        return Err(e);
                    }
                }
            }
            set.levels.push(LodLevel::new(meshes));
        }
        Ok(set)
    }

    /// Does level `level` exist with at least one mesh?
    pub fn has_lod(&self, level: usize) -> bool {
        self.levels.get(level).is_some_and(|l| !l.is_empty())
    }

    pub fn level(&self, level: usize) -> Option<&LodLevel> {
        self.levels.get(level)
    }

    /// Number of levels including the base
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Release levels 1.. and keep only the base
    pub fn release(&mut self, allocator: &mut dyn MeshAllocator) {
        if self.levels.len() <= 1 {
            return;
        }
        for level in self.levels.drain(1..) {
            for mesh in level.meshes {
                allocator.release(mesh.handle);
            }
        }
    }
}
