//! CPU-only mesh allocator for tools, tests and headless servers

use std::collections::HashMap;

use crate::core::{Error, Result};
use super::layout::VertexLayout;
use super::mesh::{MeshAllocator, MeshDesc, MeshHandle};

/// CPU copy of an allocated mesh
#[derive(Clone, Debug)]
pub struct HeadlessMesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u16>,
    pub layout: VertexLayout,
    /// Number of `update_vertices` calls received
    pub updates: u32,
}

/// Keeps allocated meshes in memory instead of on a GPU
#[derive(Debug, Default)]
pub struct HeadlessAllocator {
    meshes: HashMap<MeshHandle, HeadlessMesh>,
    next_id: u64,
    bytes: usize,
}

impl HeadlessAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&HeadlessMesh> {
        self.meshes.get(&handle)
    }

    /// Number of live meshes
    pub fn live_count(&self) -> usize {
        self.meshes.len()
    }

    /// Bytes that would currently be resident on the GPU
    pub fn resident_bytes(&self) -> usize {
        self.bytes
    }
}

impl MeshAllocator for HeadlessAllocator {
    fn allocate(&mut self, desc: MeshDesc<'_>) -> Result<MeshHandle> {
        if desc.vertices.len() % desc.layout.stride() != 0 {
            return Err(Error::Render(format!(
                "vertex array of {} floats is not a multiple of stride {}",
                desc.vertices.len(),
                desc.layout.stride()
            )));
        }
        let vertex_count = desc.vertex_count();
        if let Some(&bad) = desc.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(Error::Render(format!(
                "index {} out of range for {} vertices",
                bad, vertex_count
            )));
        }

        self.next_id += 1;
        let handle = MeshHandle(self.next_id);
        self.bytes += desc.vertex_bytes().len() + desc.index_bytes().len();
        self.meshes.insert(handle, HeadlessMesh {
            vertices: desc.vertices.to_vec(),
            indices: desc.indices.to_vec(),
            layout: desc.layout,
            updates: 0,
        });
        log::trace!("Allocated mesh {:?} ({} vertices)", handle, vertex_count);
        Ok(handle)
    }

    fn update_vertices(&mut self, handle: MeshHandle, vertices: &[f32]) -> Result<()> {
        let mesh = self
            .meshes
            .get_mut(&handle)
            .ok_or_else(|| Error::Render(format!("unknown mesh {:?}", handle)))?;
        if mesh.vertices.len() != vertices.len() {
            return Err(Error::Render(format!(
                "vertex update size mismatch: {} != {}",
                vertices.len(),
                mesh.vertices.len()
            )));
        }
        mesh.vertices.copy_from_slice(vertices);
        mesh.updates += 1;
        Ok(())
    }

    fn release(&mut self, handle: MeshHandle) {
        if let Some(mesh) = self.meshes.remove(&handle) {
            self.bytes -= bytemuck::cast_slice::<f32, u8>(&mesh.vertices).len()
                + bytemuck::cast_slice::<u16, u8>(&mesh.indices).len();
        }
    }
}
