//! Distance-based LOD selection for one terrain object

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use crate::render::Renderable;
use super::level::LodSet;

/// Tuning for [`TerrainLodController`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodControllerConfig {
    /// Seconds between LOD decisions
    pub update_interval: f32,
    /// Level `i` covers distances below `(i + 1) * width * distance_factor`
    pub distance_factor: f32,
    /// Past this fraction of the far plane one coarser level is used
    pub far_plane_ratio: f32,
}

impl Default for LodControllerConfig {
    fn default() -> Self {
        Self {
            update_interval: 0.5,
            distance_factor: 1.2,
            far_plane_ratio: 0.8,
        }
    }
}

/// World placement of a terrain as the controller sees it
#[derive(Clone, Copy, Debug)]
pub struct LodPlacement {
    pub position: Vec3,
    pub scale: Vec3,
    pub terrain_width: f32,
}

impl LodPlacement {
    /// Terrain centre in world space
    pub fn center(&self) -> Vec3 {
        let half = self.terrain_width / 2.0;
        self.position + Vec3::new(half * self.scale.x, 0.0, half * self.scale.z)
    }
}

/// First level whose distance band contains `distance`, else the coarsest
pub fn determine_lod_level(distance: f32, threshold: f32, level_count: usize) -> usize {
    let coarsest = level_count.saturating_sub(1);
    (0..level_count)
        .find(|&i| distance < (i + 1) as f32 * threshold)
        .unwrap_or(coarsest)
}

/// Full selection including the far-plane bump
pub fn select_lod(
    distance: f32,
    terrain_width: f32,
    camera_far: f32,
    level_count: usize,
    config: &LodControllerConfig,
) -> usize {
    let threshold = terrain_width * config.distance_factor;
    let mut level = determine_lod_level(distance, threshold, level_count);
    if camera_far > 0.0 && distance / camera_far > config.far_plane_ratio {
        level = (level + 1).min(level_count.saturating_sub(1));
    }
    level
}

/// Picks the active LOD level and swaps the renderable's meshes.
///
/// Decisions happen at most once per `update_interval`. A level whose
/// meshes do not exist yet is never bound; the current meshes stay.
#[derive(Clone, Debug)]
pub struct TerrainLodController {
    config: LodControllerConfig,
    current_lod: usize,
    dirty: bool,
    enabled: bool,
    accumulator: f32,
}

impl TerrainLodController {
    pub fn new(config: LodControllerConfig) -> Self {
        Self {
            config,
            current_lod: 0,
            dirty: false,
            enabled: true,
            accumulator: 0.0,
        }
    }

    pub fn current_lod(&self) -> usize {
        self.current_lod
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn config(&self) -> &LodControllerConfig {
        &self.config
    }

    /// Force the next decision to rebind meshes (after LOD data changed)
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Advance by `dt` seconds. Call only for visible terrains.
    ///
    /// Returns true when the renderable was swapped.
    pub fn update(
        &mut self,
        dt: f32,
        camera_position: Vec3,
        camera_far: f32,
        placement: &LodPlacement,
        lods: &LodSet,
        renderable: &mut Renderable,
    ) -> bool {
        if !self.enabled {
            return false;
        }

        self.accumulator += dt;
        if self.accumulator < self.config.update_interval {
            return false;
        }
        self.accumulator = 0.0;

        let distance = camera_position.distance(placement.center());
        let level = select_lod(distance, placement.terrain_width, camera_far, lods.level_count(), &self.config);

        if (level != self.current_lod || self.dirty) && self.apply(level, lods, renderable) {
            log::debug!("Terrain LOD {} -> {} at distance {:.1}", self.current_lod, level, distance);
            self.current_lod = level;
            self.dirty = false;
            return true;
        }
        false
    }

    /// Re-enable automatic selection, restoring the last chosen level
    pub fn enable(&mut self, lods: &LodSet, renderable: &mut Renderable) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        if self.current_lod != 0 {
            self.apply(self.current_lod, lods, renderable);
        }
    }

    /// Bind full detail and stop automatic selection (e.g. while sculpting)
    pub fn disable(&mut self, lods: &LodSet, renderable: &mut Renderable) {
        self.enabled = false;
        self.apply(0, lods, renderable);
    }

    fn apply(&self, level: usize, lods: &LodSet, renderable: &mut Renderable) -> bool {
        if !lods.has_lod(level) {
            return false;
        }
        match lods.level(level) {
            Some(l) => {
                renderable.meshes.clone_from(&l.meshes);
                true
            }
            None => false,
        }
    }
}

impl Default for TerrainLodController {
    fn default() -> Self {
        Self::new(LodControllerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::{LodLevel, LodMeshData};
    use crate::render::{HeadlessAllocator, RenderMesh, VertexLayout};

    const WIDTH: f32 = 100.0;

    fn quad() -> LodMeshData {
        LodMeshData::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            vec![3, 1, 0, 0, 2, 3],
        )
    }

    fn lod_set(allocator: &mut HeadlessAllocator, levels: usize) -> LodSet {
        let base = RenderMesh::allocate(allocator, quad().mesh_desc(VertexLayout::POSITION)).expect("valid mesh");
        let data: Vec<Vec<LodMeshData>> = (1..levels).map(|_| vec![quad()]).collect();
        LodSet::from_data(LodLevel::new(vec![base]), &data, VertexLayout::POSITION, allocator).expect("allocates")
    }

    fn placement() -> LodPlacement {
        LodPlacement {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            terrain_width: WIDTH,
        }
    }

    /// Camera `distance` units from the terrain centre along +X
    fn camera_at(distance: f32) -> Vec3 {
        placement().center() + Vec3::X * distance
    }

    #[test]
    fn test_determine_lod_level_bands() {
        let threshold = 120.0;
        assert_eq!(determine_lod_level(0.0, threshold, 4), 0);
        assert_eq!(determine_lod_level(119.9, threshold, 4), 0);
        assert_eq!(determine_lod_level(120.0, threshold, 4), 1);
        assert_eq!(determine_lod_level(300.0, threshold, 4), 2);
        assert_eq!(determine_lod_level(5000.0, threshold, 4), 3);
        assert_eq!(determine_lod_level(5000.0, threshold, 1), 0);
    }

    #[test]
    fn test_far_plane_bump() {
        let config = LodControllerConfig::default();
        // 130 is in band 1; far plane 150 puts it past 0.8
        assert_eq!(select_lod(130.0, WIDTH, 10_000.0, 4, &config), 1);
        assert_eq!(select_lod(130.0, WIDTH, 150.0, 4, &config), 2);
        // Clamped at the coarsest level
        assert_eq!(select_lod(1000.0, WIDTH, 1100.0, 4, &config), 3);
    }

    #[test]
    fn test_monotonic_with_distance() {
        let config = LodControllerConfig::default();
        let mut previous = 0;
        for step in 0..200 {
            let distance = step as f32 * 5.0;
            let level = select_lod(distance, WIDTH, 800.0, 4, &config);
            assert!(level >= previous, "distance {} picked {} after {}", distance, level, previous);
            previous = level;
        }
    }

    #[test]
    fn test_controller_never_refines_while_receding() {
        let mut allocator = HeadlessAllocator::new();
        let lods = lod_set(&mut allocator, 4);
        let mut renderable = Renderable {
            meshes: lods.level(0).map(|l| l.meshes.clone()).unwrap_or_default(),
            ..Default::default()
        };
        let mut controller = TerrainLodController::default();

        let mut previous = 0;
        for step in 0..100 {
            controller.update(0.5, camera_at(step as f32 * 6.0), 1000.0, &placement(), &lods, &mut renderable);
            assert!(controller.current_lod() >= previous);
            previous = controller.current_lod();
        }
        assert_eq!(controller.current_lod(), 3);
        assert_eq!(Some(&renderable.meshes), lods.level(3).map(|l| &l.meshes));
    }

    #[test]
    fn test_interval_gates_updates() {
        let mut allocator = HeadlessAllocator::new();
        let lods = lod_set(&mut allocator, 4);
        let mut renderable = Renderable::default();
        let mut controller = TerrainLodController::default();

        assert!(!controller.update(0.2, camera_at(500.0), 10_000.0, &placement(), &lods, &mut renderable));
        assert_eq!(controller.current_lod(), 0);
        assert!(controller.update(0.3, camera_at(500.0), 10_000.0, &placement(), &lods, &mut renderable));
        assert_eq!(controller.current_lod(), 3);
    }

    #[test]
    fn test_missing_level_keeps_current_mesh() {
        let mut allocator = HeadlessAllocator::new();
        let lods = lod_set(&mut allocator, 1);
        let base = lods.level(0).map(|l| l.meshes.clone()).unwrap_or_default();
        let mut renderable = Renderable { meshes: base.clone(), ..Default::default() };
        let mut controller = TerrainLodController::default();

        // Only the base level exists, so the coarsest level is 0
        assert!(!controller.update(1.0, camera_at(5000.0), 10_000.0, &placement(), &lods, &mut renderable));
        assert_eq!(renderable.meshes, base);
        assert_eq!(controller.current_lod(), 0);
    }

    #[test]
    fn test_dirty_waits_for_level_data() {
        let mut allocator = HeadlessAllocator::new();
        let empty = LodSet::new(LodLevel::default());
        let mut renderable = Renderable::default();
        let mut controller = TerrainLodController::default();

        controller.mark_dirty();
        assert!(!controller.update(1.0, camera_at(0.0), 10_000.0, &placement(), &empty, &mut renderable));
        assert!(controller.is_dirty());

        let lods = lod_set(&mut allocator, 2);
        assert!(controller.update(1.0, camera_at(0.0), 10_000.0, &placement(), &lods, &mut renderable));
        assert!(!controller.is_dirty());
        assert_eq!(Some(&renderable.meshes), lods.level(0).map(|l| &l.meshes));
    }

    #[test]
    fn test_disable_forces_base_and_enable_restores() {
        let mut allocator = HeadlessAllocator::new();
        let lods = lod_set(&mut allocator, 4);
        let mut renderable = Renderable::default();
        let mut controller = TerrainLodController::default();

        controller.update(1.0, camera_at(300.0), 10_000.0, &placement(), &lods, &mut renderable);
        assert_eq!(controller.current_lod(), 2);

        controller.disable(&lods, &mut renderable);
        assert!(!controller.is_enabled());
        assert_eq!(Some(&renderable.meshes), lods.level(0).map(|l| &l.meshes));
        assert!(!controller.update(1.0, camera_at(1000.0), 10_000.0, &placement(), &lods, &mut renderable));

        controller.enable(&lods, &mut renderable);
        assert!(controller.is_enabled());
        assert_eq!(Some(&renderable.meshes), lods.level(2).map(|l| &l.meshes));
    }

    #[test]
    fn test_center_uses_scale() {
        let placement = LodPlacement {
            position: Vec3::new(10.0, 5.0, 20.0),
            scale: Vec3::new(2.0, 1.0, 3.0),
            terrain_width: 100.0,
        };
        assert_eq!(placement.center(), Vec3::new(110.0, 5.0, 170.0));
    }
}
