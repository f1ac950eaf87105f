//! Grid-aware mesh simplification for terrain LOD levels
//!
//! Vertices are clustered on the XZ plane in cells of
//! `grid_spacing * 2^level`. Each cluster collapses onto one of its own
//! vertices, so simplified meshes never invent geometry. Clusters touching
//! the terrain border collapse onto a border vertex, which keeps the
//! outline intact between neighbouring terrains.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::types::Vec2;
use crate::core::{Error, Result};
use crate::render::VertexLayout;
use super::level::LodMeshData;
use super::builder::CancelToken;

/// LOD generation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Total levels including the base mesh
    pub level_count: usize,
    /// Stop adding levels once a level has no more than this many triangles
    pub min_triangles: usize,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            level_count: 4,
            min_triangles: 2,
        }
    }
}

/// Immutable snapshot of a base mesh, shared with background workers
#[derive(Clone, Debug)]
pub struct LodInput {
    pub resolution: usize,
    pub width: f32,
    pub depth: f32,
    pub layout: VertexLayout,
    /// Height revision of the terrain when the snapshot was taken
    pub revision: u64,
    pub vertices: Arc<[f32]>,
    pub indices: Arc<[u16]>,
}

impl LodInput {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.layout.stride()
    }

    fn grid_spacing(&self) -> Vec2 {
        let cells = (self.resolution.max(2) - 1) as f32;
        Vec2::new(self.width / cells, self.depth / cells)
    }
}

struct Cluster {
    target: Vec2,
    best: usize,
    best_dist: f32,
}

/// Simplify `input` for LOD `level` (level 0 returns the input unchanged)
pub fn simplify(input: &LodInput, level: u32) -> LodMeshData {
    if level == 0 {
        return LodMeshData::new(input.vertices.to_vec(), input.indices.to_vec());
    }

    let stride = input.layout.stride();
    let vertex_count = input.vertex_count();
    let spacing = input.grid_spacing();
    // A cell never spans the whole terrain, so opposite borders stay apart
    let cell = (spacing * (1u32 << level.min(16)) as f32).min(Vec2::new(input.width, input.depth));
    let eps = spacing * 1e-3;
    let xz = |v: usize| Vec2::new(input.vertices[v * stride], input.vertices[v * stride + 2]);

    // Cluster key per vertex, then a target point per cluster
    let mut keys = Vec::with_capacity(vertex_count);
    let mut clusters: HashMap<(i64, i64), Cluster> = HashMap::new();
    for v in 0..vertex_count {
        let p = xz(v);
        let key = (
            (p.x / cell.x + 1e-4).floor() as i64,
            (p.y / cell.y + 1e-4).floor() as i64,
        );
        keys.push(key);

        let cluster = clusters.entry(key).or_insert_with(|| Cluster {
            target: Vec2::new(
                ((key.0 as f32 + 0.5) * cell.x).min(input.width),
                ((key.1 as f32 + 0.5) * cell.y).min(input.depth),
            ),
            best: v,
            best_dist: f32::INFINITY,
        });
        if p.x <= eps.x {
            cluster.target.x = 0.0;
        } else if p.x >= input.width - eps.x {
            cluster.target.x = input.width;
        }
        if p.y <= eps.y {
            cluster.target.y = 0.0;
        } else if p.y >= input.depth - eps.y {
            cluster.target.y = input.depth;
        }
    }

    for (v, key) in keys.iter().enumerate() {
        if let Some(cluster) = clusters.get_mut(key) {
            let dist = xz(v).distance_squared(cluster.target);
            if dist < cluster.best_dist {
                cluster.best = v;
                cluster.best_dist = dist;
            }
        }
    }

    // Compact the surviving vertices in original order
    let mut survivors: Vec<usize> = clusters.values().map(|c| c.best).collect();
    survivors.sort_unstable();
    let mut new_index = vec![u16::MAX; vertex_count];
    let mut vertices = Vec::with_capacity(survivors.len() * stride);
    for (i, &v) in survivors.iter().enumerate() {
        new_index[v] = i as u16;
        vertices.extend_from_slice(&input.vertices[v * stride..(v + 1) * stride]);
    }
    let remap = |v: u16| -> u16 {
        let rep = clusters.get(&keys[v as usize]).map_or(v as usize, |c| c.best);
        new_index[rep]
    };

    let mut seen = HashSet::new();
    let mut indices = Vec::new();
    for tri in input.indices.chunks_exact(3) {
        let (a, b, c) = (remap(tri[0]), remap(tri[1]), remap(tri[2]));
        if a == b || b == c || a == c {
            continue;
        }
        let mut key = [a, b, c];
        key.sort_unstable();
        if seen.insert(key) {
            indices.extend_from_slice(&[a, b, c]);
        }
    }

    LodMeshData::new(vertices, indices)
}

/// Build levels `1..config.level_count` from the base mesh.
///
/// The token is checked before each level. Levels stop early once a level
/// reaches `min_triangles` or stops shrinking.
pub fn build_lod_levels(input: &LodInput, config: &LodConfig, cancel: &CancelToken) -> Result<Vec<Vec<LodMeshData>>> {
    let mut levels = Vec::new();
    let mut previous = input.indices.len() / 3;

    for level in 1..config.level_count {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if previous <= config.min_triangles {
            break;
        }

        let mesh = simplify(input, level as u32);
        let triangles = mesh.triangle_count();
        if triangles >= previous {
            log::debug!("LOD {} no longer reduces triangle count ({}), stopping", level, triangles);
            break;
        }
        log::debug!("LOD {}: {} -> {} triangles", level, previous, triangles);
        previous = triangles;
        levels.push(vec![mesh]);
    }

    Ok(levels)
}
