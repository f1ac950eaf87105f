//! World-space bounds for culling

use crate::core::types::Vec3;

/// Box spanned by two opposite corners, aligned with the world axes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Midpoint between the corners
    pub fn center(&self) -> Vec3 {
        self.min.lerp(self.max, 0.5)
    }

    /// Extent along each axis
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// True when both boxes share at least one point
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Local bounds mapped through a scale-then-translate transform.
    ///
    /// `scale` must be non-negative on every axis.
    pub fn scaled_translated(&self, scale: Vec3, translation: Vec3) -> Aabb {
        Aabb::new(self.min * scale + translation, self.max * scale + translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_and_extent() {
        let bounds = Aabb::new(Vec3::new(-1.0, -2.0, 0.0), Vec3::new(1.0, 4.0, 3.0));
        assert_eq!(bounds.center(), Vec3::new(0.0, 1.0, 1.5));
        assert_eq!(bounds.extent(), Vec3::new(2.0, 6.0, 3.0));
    }

    #[test]
    fn test_overlap_includes_touching_faces() {
        let tile = Aabb::new(Vec3::ZERO, Vec3::splat(64.0));
        let neighbour = Aabb::new(Vec3::new(64.0, 0.0, 0.0), Vec3::new(128.0, 64.0, 64.0));
        let far_away = Aabb::new(Vec3::splat(200.0), Vec3::splat(300.0));
        assert!(tile.overlaps(&neighbour));
        assert!(neighbour.overlaps(&tile));
        assert!(!tile.overlaps(&far_away));
    }

    #[test]
    fn test_placed_terrain_bounds() {
        let local = Aabb::new(Vec3::new(0.0, -5.0, 0.0), Vec3::new(100.0, 20.0, 100.0));
        let world = local.scaled_translated(Vec3::new(2.0, 1.0, 2.0), Vec3::new(500.0, 0.0, -300.0));
        assert_eq!(world.min, Vec3::new(500.0, -5.0, -300.0));
        assert_eq!(world.max, Vec3::new(700.0, 20.0, -100.0));
    }
}
