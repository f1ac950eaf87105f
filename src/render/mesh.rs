//! Mesh handles and the allocator trait implemented by the renderer

use crate::core::Result;
use super::layout::VertexLayout;
use super::material::TerrainShaderFeatures;

/// Opaque handle to a mesh owned by the renderer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Everything the renderer needs to create a mesh
#[derive(Clone, Copy, Debug)]
pub struct MeshDesc<'a> {
    pub vertices: &'a [f32],
    pub indices: &'a [u16],
    pub layout: VertexLayout,
}

impl<'a> MeshDesc<'a> {
    pub fn new(vertices: &'a [f32], indices: &'a [u16], layout: VertexLayout) -> Self {
        Self { vertices, indices, layout }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.layout.stride()
    }

    /// Raw vertex bytes for upload
    pub fn vertex_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.vertices)
    }

    /// Raw index bytes for upload
    pub fn index_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.indices)
    }
}

/// GPU mesh allocation, implemented by the rendering backend.
///
/// All calls happen on the render thread.
pub trait MeshAllocator {
    /// Create a mesh from vertex/index arrays
    fn allocate(&mut self, desc: MeshDesc<'_>) -> Result<MeshHandle>;

    /// Replace the vertex data of an existing mesh. The vertex count must not change.
    fn update_vertices(&mut self, handle: MeshHandle, vertices: &[f32]) -> Result<()>;

    /// Free a mesh. Unknown handles are ignored.
    fn release(&mut self, handle: MeshHandle);
}

/// A mesh handle together with the counts the draw call needs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderMesh {
    pub handle: MeshHandle,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl RenderMesh {
    /// Allocate a mesh and record its sizes
    pub fn allocate(allocator: &mut dyn MeshAllocator, desc: MeshDesc<'_>) -> Result<Self> {
        let handle = allocator.allocate(desc)?;
        Ok(Self {
            handle,
            vertex_count: desc.vertex_count() as u32,
            index_count: desc.indices.len() as u32,
        })
    }
}

/// What the renderer draws for one terrain object.
///
/// The LOD controller swaps `meshes` between LOD levels; an empty list
/// draws nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Renderable {
    pub meshes: Vec<RenderMesh>,
    /// Shader variant for the terrain's current splat channels
    pub features: TerrainShaderFeatures,
}

impl Renderable {
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn index_count(&self) -> u32 {
        self.meshes.iter().map(|m| m.index_count).sum()
    }
}
