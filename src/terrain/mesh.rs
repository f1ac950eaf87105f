//! Heightfield plane mesh with dirty-region rebuilds
//!
//! The mesh is a regular grid of `resolution × resolution` vertices with two
//! triangles per cell. After a sculpting edit only the touched vertices are
//! rebuilt, and normals are recomputed over the touched region plus one ring
//! so the patch blends with its untouched neighbours.

use crate::core::types::{Vec2, Vec3};
use crate::core::Result;
use crate::render::{MeshAllocator, MeshDesc, MeshHandle, VertexLayout};
use super::heightfield::HeightField;

/// Inclusive grid rectangle of vertices changed since the last upload.
///
/// Empty when `min_x > max_x`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyRect {
    pub min_x: i32,
    pub max_x: i32,
    pub min_z: i32,
    pub max_z: i32,
}

impl DirtyRect {
    pub const EMPTY: DirtyRect = DirtyRect {
        min_x: i32::MAX,
        max_x: i32::MIN,
        min_z: i32::MAX,
        max_z: i32::MIN,
    };

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x
    }

    /// Grow to include a vertex
    pub fn include(&mut self, x: i32, z: i32) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_z = self.min_z.min(z);
        self.max_z = self.max_z.max(z);
    }

    /// Grown by `ring` vertices on every side, clamped to `[0, resolution-1]`
    pub fn expanded(&self, ring: i32, resolution: usize) -> DirtyRect {
        if self.is_empty() {
            return *self;
        }
        let last = resolution as i32 - 1;
        DirtyRect {
            min_x: (self.min_x - ring).max(0),
            max_x: (self.max_x + ring).min(last),
            min_z: (self.min_z - ring).max(0),
            max_z: (self.max_z + ring).min(last),
        }
    }

    /// Whole grid of the given resolution
    pub fn full(resolution: usize) -> DirtyRect {
        let last = resolution as i32 - 1;
        DirtyRect { min_x: 0, max_x: last, min_z: 0, max_z: last }
    }

    /// Visit every vertex index inside the rectangle
    fn for_each_vertex(&self, resolution: usize, mut f: impl FnMut(usize, usize, usize)) {
        if self.is_empty() {
            return;
        }
        for z in self.min_z..=self.max_z {
            for x in self.min_x..=self.max_x {
                let (x, z) = (x as usize, z as usize);
                f(x, z, z * resolution + x);
            }
        }
    }
}

impl Default for DirtyRect {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Incident triangles per vertex, stored compressed (CSR).
#[derive(Clone, Debug, Default)]
struct VertexTriangleMap {
    offsets: Vec<u32>,
    triangles: Vec<u32>,
}

impl VertexTriangleMap {
    fn build(indices: &[u16], vertex_count: usize) -> Self {
        let mut counts = vec![0u32; vertex_count + 1];
        for &i in indices {
            counts[i as usize + 1] += 1;
        }
        for v in 0..vertex_count {
            counts[v + 1] += counts[v];
        }

        let mut cursor = counts.clone();
        let mut triangles = vec![0u32; indices.len()];
        for (corner, &i) in indices.iter().enumerate() {
            let slot = &mut cursor[i as usize];
            triangles[*slot as usize] = (corner / 3) as u32;
            *slot += 1;
        }

        Self { offsets: counts, triangles }
    }

    fn triangles_of(&self, vertex: usize) -> &[u32] {
        let start = self.offsets[vertex] as usize;
        let end = self.offsets[vertex + 1] as usize;
        &self.triangles[start..end]
    }
}

/// Renderable grid mesh built from a [`HeightField`].
#[derive(Clone, Debug)]
pub struct PlaneMesh {
    resolution: usize,
    width: f32,
    depth: f32,
    uv_scale: Vec2,
    layout: VertexLayout,
    vertices: Vec<f32>,
    indices: Vec<u16>,
    vertex_triangles: VertexTriangleMap,
    dirty: DirtyRect,
}

impl PlaneMesh {
    /// Build the full mesh (indices, vertices, normals) for a heightfield.
    ///
    /// `HeightField` already guarantees `2 <= resolution <= 256`, which keeps
    /// `(resolution - 1)` non-zero and every index within `u16`.
    pub fn new(field: &HeightField, uv_scale: Vec2, layout: VertexLayout) -> Self {
        let resolution = field.resolution();
        let mut mesh = Self {
            resolution,
            width: field.width(),
            depth: field.depth(),
            uv_scale,
            layout,
            vertices: vec![0.0; resolution * resolution * layout.stride()],
            indices: Vec::new(),
            vertex_triangles: VertexTriangleMap::default(),
            dirty: DirtyRect::EMPTY,
        };
        mesh.build_indices();
        mesh.build_vertices(field);
        mesh.calculate_average_normals();
        mesh
    }

    /// Rebuild the index buffer and the vertex→triangle map.
    ///
    /// Cell (x, y) emits `(c11, c10, c00)` then `(c00, c01, c11)`, which is
    /// counter-clockwise seen from +Y.
    pub fn build_indices(&mut self) {
        let res = self.resolution;
        let cells = res - 1;
        let mut indices = Vec::with_capacity(6 * cells * cells);

        for y in 0..cells {
            for x in 0..cells {
                let c00 = (y * res + x) as u16;
                let c10 = c00 + 1;
                let c01 = c00 + res as u16;
                let c11 = c10 + res as u16;

                indices.extend_from_slice(&[c11, c10, c00, c00, c01, c11]);
            }
        }

        self.indices = indices;
        self.build_vertex_to_triangle_map();
    }

    /// Map each vertex to the triangles that use it. Only normal averaging reads this.
    pub fn build_vertex_to_triangle_map(&mut self) {
        self.vertex_triangles = VertexTriangleMap::build(&self.indices, self.vertex_count());
    }

    /// Recompute positions and uvs, limited to the dirty region when one is set.
    ///
    /// Normals of rebuilt vertices are reset to up; call
    /// [`calculate_average_normals`](Self::calculate_average_normals) afterwards.
    pub fn build_vertices(&mut self, field: &HeightField) {
        let region = if self.dirty.is_empty() {
            DirtyRect::full(self.resolution)
        } else {
            self.dirty
        };

        let res = self.resolution;
        let cells = (res - 1) as f32;
        let stride = self.layout.stride();
        let uv_offset = self.layout.uv_offset();
        let normal_offset = self.layout.normal_offset();
        let heights = field.heights();
        let (width, depth, uv_scale) = (self.width, self.depth, self.uv_scale);
        let vertices = &mut self.vertices;

        region.for_each_vertex(res, |x, z, index| {
            let u = x as f32 / cells;
            let v = z as f32 / cells;
            let base = index * stride;

            vertices[base] = u * width;
            vertices[base + 1] = heights[index];
            vertices[base + 2] = v * depth;

            if let Some(o) = uv_offset {
                vertices[base + o] = u * uv_scale.x;
                vertices[base + o + 1] = v * uv_scale.y;
            }
            if let Some(o) = normal_offset {
                vertices[base + o..base + o + 3].copy_from_slice(&[0.0, 1.0, 0.0]);
            }
        });
    }

    /// Average incident face normals into each vertex normal.
    ///
    /// With a dirty region active only that region plus one ring is touched.
    /// Degenerate neighbourhoods produce a zero normal.
    pub fn calculate_average_normals(&mut self) {
        let Some(normal_offset) = self.layout.normal_offset() else {
            return;
        };

        let region = if self.dirty.is_empty() {
            DirtyRect::full(self.resolution)
        } else {
            self.dirty.expanded(1, self.resolution)
        };

        let mut normals = Vec::new();
        region.for_each_vertex(self.resolution, |_, _, index| {
            let sum: Vec3 = self
                .vertex_triangles
                .triangles_of(index)
                .iter()
                .map(|&t| self.face_normal(t as usize))
                .sum();
            normals.push((index, sum.normalize_or_zero()));
        });

        let stride = self.layout.stride();
        for (index, normal) in normals {
            let base = index * stride + normal_offset;
            self.vertices[base..base + 3].copy_from_slice(&normal.to_array());
        }
    }

    /// Record that the height at grid `(x, z)` changed
    pub fn modify_vertex(&mut self, x: usize, z: usize) {
        self.dirty.include(x as i32, z as i32);
    }

    /// Push the vertex buffer to the GPU mesh and clear the dirty region
    pub fn update_mesh_vertices(&mut self, allocator: &mut dyn MeshAllocator, handle: MeshHandle) -> Result<()> {
        allocator.update_vertices(handle, &self.vertices)?;
        self.dirty = DirtyRect::EMPTY;
        Ok(())
    }

    /// Clear the dirty region without uploading (CPU-only meshes)
    pub fn clear_dirty(&mut self) {
        self.dirty = DirtyRect::EMPTY;
    }

    fn face_normal(&self, triangle: usize) -> Vec3 {
        let i = &self.indices[triangle * 3..triangle * 3 + 3];
        let p0 = self.position(i[0] as usize);
        let p1 = self.position(i[1] as usize);
        let p2 = self.position(i[2] as usize);
        (p1 - p0).cross(p2 - p0).normalize_or_zero()
    }

    /// Vertex position by vertex index
    pub fn position(&self, vertex: usize) -> Vec3 {
        let base = vertex * self.layout.stride();
        Vec3::from_slice(&self.vertices[base..base + 3])
    }

    /// Vertex normal by vertex index, `None` if the layout has no normals
    pub fn normal(&self, vertex: usize) -> Option<Vec3> {
        let o = self.layout.normal_offset()?;
        let base = vertex * self.layout.stride() + o;
        Some(Vec3::from_slice(&self.vertices[base..base + 3]))
    }

    /// Vertex uv by vertex index, `None` if the layout has no uvs
    pub fn uv(&self, vertex: usize) -> Option<Vec2> {
        let o = self.layout.uv_offset()?;
        let base = vertex * self.layout.stride() + o;
        Some(Vec2::from_slice(&self.vertices[base..base + 2]))
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn uv_scale(&self) -> Vec2 {
        self.uv_scale
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.resolution * self.resolution
    }

    pub fn dirty_rect(&self) -> DirtyRect {
        self.dirty
    }

    /// Borrowed description for [`MeshAllocator::allocate`]
    pub fn mesh_desc(&self) -> MeshDesc<'_> {
        MeshDesc::new(&self.vertices, &self.indices, self.layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessAllocator;

    fn assert_vec3_near(actual: Vec3, expected: Vec3) {
        assert!(
            (actual - expected).length() < 1e-5,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    fn field_with_peak() -> HeightField {
        let mut field = HeightField::flat(4, 30.0, 30.0).expect("valid field");
        field.set_height(1, 1, 5.0);
        field
    }

    /// Deterministic pseudo-random heights
    fn bumpy_field(resolution: usize) -> HeightField {
        let heights = (0..resolution * resolution)
            .map(|i| ((i as f32 * 12.9898).sin() * 43758.547).fract() * 4.0)
            .collect();
        HeightField::from_heights(resolution, 50.0, 40.0, heights).expect("valid field")
    }

    #[test]
    fn test_index_count_and_range() {
        for res in [2usize, 3, 4, 17, 64, 256] {
            let field = HeightField::flat(res, 10.0, 10.0).expect("valid field");
            let mesh = PlaneMesh::new(&field, Vec2::ONE, VertexLayout::POSITION);
            assert_eq!(mesh.indices().len(), 6 * (res - 1) * (res - 1));
            assert!(mesh.indices().iter().all(|&i| (i as usize) < res * res));
        }
    }

    #[test]
    fn test_first_cell_winding_order() {
        let field = HeightField::flat(3, 2.0, 2.0).expect("valid field");
        let mesh = PlaneMesh::new(&field, Vec2::ONE, VertexLayout::FULL);
        // c00 = 0, c10 = 1, c01 = 3, c11 = 4
        assert_eq!(&mesh.indices()[..6], &[4, 1, 0, 0, 3, 4]);
    }

    #[test]
    fn test_flat_faces_point_up() {
        let field = HeightField::flat(6, 25.0, 25.0).expect("valid field");
        let mesh = PlaneMesh::new(&field, Vec2::ONE, VertexLayout::FULL);
        for t in 0..mesh.indices().len() / 3 {
            assert_vec3_near(mesh.face_normal(t), Vec3::Y);
        }
        for v in 0..mesh.vertex_count() {
            assert_vec3_near(mesh.normal(v).expect("layout has normals"), Vec3::Y);
        }
    }

    #[test]
    fn test_positions_and_uvs() {
        let field = field_with_peak();
        let mesh = PlaneMesh::new(&field, Vec2::new(2.0, 4.0), VertexLayout::FULL);
        assert_eq!(mesh.position(5), Vec3::new(10.0, 5.0, 10.0));
        assert_eq!(mesh.position(15), Vec3::new(30.0, 0.0, 30.0));
        assert_eq!(mesh.uv(15), Some(Vec2::new(2.0, 4.0)));
        assert_eq!(mesh.uv(1), Some(Vec2::new(2.0 / 3.0, 0.0)));
    }

    #[test]
    fn test_resolution_four_scenario() {
        let field = field_with_peak();
        let mesh = PlaneMesh::new(&field, Vec2::ONE, VertexLayout::FULL);

        assert_eq!(mesh.vertex_count(), 16);
        assert_eq!(mesh.vertices().len(), 16 * 8);
        assert_eq!(mesh.indices().len(), 54);
        assert_eq!(mesh.position(5), Vec3::new(10.0, 5.0, 10.0));

        // The six faces around the peak cancel out horizontally
        assert_vec3_near(mesh.normal(5).unwrap(), Vec3::Y);
        // Corner (0,0) shares both of its triangles with the peak
        assert_vec3_near(mesh.normal(0).unwrap(), Vec3::new(-0.235_702_26, 0.942_809_04, -0.235_702_26));
        assert_vec3_near(mesh.normal(6).unwrap(), Vec3::new(0.147_772_34, 0.986_504_01, -0.070_520_74));
        assert_vec3_near(mesh.normal(1).unwrap(), Vec3::new(0.142_154_58, 0.943_960_43, -0.297_877_12));
        // Far corner is out of reach of the peak
        assert_vec3_near(mesh.normal(15).unwrap(), Vec3::Y);
    }

    #[test]
    fn test_vertex_triangle_map_counts() {
        let field = field_with_peak();
        let mesh = PlaneMesh::new(&field, Vec2::ONE, VertexLayout::FULL);
        assert_eq!(mesh.vertex_triangles.triangles_of(0).len(), 2);
        assert_eq!(mesh.vertex_triangles.triangles_of(3).len(), 1);
        assert_eq!(mesh.vertex_triangles.triangles_of(5).len(), 6);
        assert_eq!(mesh.vertex_triangles.triangles_of(15).len(), 2);
    }

    #[test]
    fn test_zero_area_triangles_do_not_panic() {
        // Edge vectors this small underflow to a zero cross product
        let field = HeightField::flat(3, f32::MIN_POSITIVE, f32::MIN_POSITIVE).expect("valid field");
        let mesh = PlaneMesh::new(&field, Vec2::ONE, VertexLayout::FULL);
        for v in 0..mesh.vertex_count() {
            let n = mesh.normal(v).unwrap();
            assert!(n == Vec3::ZERO || (n.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_dirty_rect_expands_monotonically() {
        let field = HeightField::flat(8, 10.0, 10.0).expect("valid field");
        let mut mesh = PlaneMesh::new(&field, Vec2::ONE, VertexLayout::FULL);
        assert!(mesh.dirty_rect().is_empty());

        mesh.modify_vertex(3, 4);
        assert_eq!(mesh.dirty_rect(), DirtyRect { min_x: 3, max_x: 3, min_z: 4, max_z: 4 });
        mesh.modify_vertex(1, 6);
        assert_eq!(mesh.dirty_rect(), DirtyRect { min_x: 1, max_x: 3, min_z: 4, max_z: 6 });
        mesh.modify_vertex(2, 5);
        assert_eq!(mesh.dirty_rect(), DirtyRect { min_x: 1, max_x: 3, min_z: 4, max_z: 6 });
    }

    #[test]
    fn test_expanded_is_clamped() {
        let mut rect = DirtyRect::EMPTY;
        rect.include(0, 7);
        let grown = rect.expanded(1, 8);
        assert_eq!(grown, DirtyRect { min_x: 0, max_x: 1, min_z: 6, max_z: 7 });
        assert!(DirtyRect::EMPTY.expanded(1, 8).is_empty());
    }

    #[test]
    fn test_bounded_rebuild_matches_full_rebuild() {
        let mut field = bumpy_field(12);
        let mut mesh = PlaneMesh::new(&field, Vec2::splat(3.0), VertexLayout::FULL);

        field.set_height(5, 6, 9.5);
        mesh.modify_vertex(5, 6);
        mesh.build_vertices(&field);
        mesh.calculate_average_normals();

        let reference = PlaneMesh::new(&field, Vec2::splat(3.0), VertexLayout::FULL);
        assert_eq!(mesh.vertices(), reference.vertices());
    }

    #[test]
    fn test_bounded_rebuild_on_edge_matches_full_rebuild() {
        let mut field = bumpy_field(9);
        let mut mesh = PlaneMesh::new(&field, Vec2::ONE, VertexLayout::FULL);

        for (x, z, h) in [(0, 0, -3.0), (1, 0, 2.0), (8, 4, 7.0)] {
            field.set_height(x, z, h);
            mesh.modify_vertex(x, z);
        }
        mesh.build_vertices(&field);
        mesh.calculate_average_normals();

        let reference = PlaneMesh::new(&field, Vec2::ONE, VertexLayout::FULL);
        assert_eq!(mesh.vertices(), reference.vertices());
    }

    #[test]
    fn test_update_mesh_vertices_uploads_and_clears() {
        let mut field = bumpy_field(5);
        let mut mesh = PlaneMesh::new(&field, Vec2::ONE, VertexLayout::FULL);
        let mut alloc = HeadlessAllocator::new();
        let handle = alloc.allocate(mesh.mesh_desc()).expect("allocate failed");

        field.set_height(2, 2, 11.0);
        mesh.modify_vertex(2, 2);
        mesh.build_vertices(&field);
        mesh.calculate_average_normals();
        mesh.update_mesh_vertices(&mut alloc, handle).expect("upload failed");

        assert!(mesh.dirty_rect().is_empty());
        let uploaded = alloc.get(handle).expect("mesh exists");
        assert_eq!(uploaded.updates, 1);
        assert_eq!(uploaded.vertices, mesh.vertices());
    }

    #[test]
    fn test_layout_without_normals() {
        let field = field_with_peak();
        let mesh = PlaneMesh::new(&field, Vec2::ONE, VertexLayout::POSITION);
        assert_eq!(mesh.vertices().len(), 16 * 3);
        assert_eq!(mesh.normal(0), None);
        assert_eq!(mesh.position(5), Vec3::new(10.0, 5.0, 10.0));
    }
}
