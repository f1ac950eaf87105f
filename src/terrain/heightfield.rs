//! Height samples on a square grid

use crate::core::{Error, Result};

/// Largest resolution whose vertex indices still fit in `u16`
pub const MAX_RESOLUTION: usize = 256;

/// Raw height samples plus the world-space size they cover.
///
/// The grid is `resolution × resolution` samples, stored row-major
/// (`heights[z * resolution + x]`).
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    resolution: usize,
    width: f32,
    depth: f32,
    heights: Vec<f32>,
}

impl HeightField {
    /// Create a heightfield from existing samples
    pub fn from_heights(resolution: usize, width: f32, depth: f32, heights: Vec<f32>) -> Result<Self> {
        check_resolution(resolution)?;
        if heights.len() != resolution * resolution {
            return Err(Error::geometry(format!(
                "expected {} height samples for resolution {}, got {}",
                resolution * resolution,
                resolution,
                heights.len()
            )));
        }
        if !(width > 0.0 && depth > 0.0) {
            return Err(Error::geometry(format!("terrain size must be positive, got {}x{}", width, depth)));
        }

        Ok(Self { resolution, width, depth, heights })
    }

    /// Flat heightfield at height zero
    pub fn flat(resolution: usize, width: f32, depth: f32) -> Result<Self> {
        check_resolution(resolution)?;
        Self::from_heights(resolution, width, depth, vec![0.0; resolution * resolution])
    }

    /// Build from a legacy height array whose grid size is implied by its length.
    ///
    /// Legacy files only store the samples, so the resolution is `sqrt(len)`
    /// and a non-square count is a format error.
    pub fn from_legacy_heights(heights: Vec<f32>, width: f32, depth: f32) -> Result<Self> {
        let resolution = (heights.len() as f64).sqrt().round() as usize;
        if resolution * resolution != heights.len() {
            return Err(Error::format(format!(
                "legacy height array of {} samples is not a square grid",
                heights.len()
            )));
        }
        Self::from_heights(resolution, width, depth, heights)
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Mutable access for sculpting tools.
    ///
    /// Callers must report every touched sample to the mesh
    /// (`PlaneMesh::modify_vertex`) before rebuilding it.
    pub fn heights_mut(&mut self) -> &mut [f32] {
        &mut self.heights
    }

    /// Height sample at grid coordinate, `None` outside the grid
    pub fn height(&self, x: usize, z: usize) -> Option<f32> {
        if x < self.resolution && z < self.resolution {
            Some(self.heights[z * self.resolution + x])
        } else {
            None
        }
    }

    /// Set a height sample. Returns false if the coordinate is outside the grid.
    pub fn set_height(&mut self, x: usize, z: usize, height: f32) -> bool {
        if x < self.resolution && z < self.resolution {
            self.heights[z * self.resolution + x] = height;
            true
        } else {
            false
        }
    }

    /// World distance between neighbouring samples along X and Z
    pub fn grid_spacing(&self) -> (f32, f32) {
        let cells = (self.resolution - 1) as f32;
        (self.width / cells, self.depth / cells)
    }

    /// Lowest and highest sample
    pub fn min_max(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }
}

fn check_resolution(resolution: usize) -> Result<()> {
    if resolution < 2 {
        return Err(Error::geometry(format!("resolution must be >= 2, got {}", resolution)));
    }
    if resolution > MAX_RESOLUTION {
        return Err(Error::geometry(format!(
            "resolution {} exceeds the 16-bit index limit of {}",
            resolution, MAX_RESOLUTION
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_small_resolution() {
        assert!(matches!(HeightField::flat(1, 10.0, 10.0), Err(Error::InvalidGeometry(_))));
        assert!(matches!(HeightField::flat(0, 10.0, 10.0), Err(Error::InvalidGeometry(_))));
        assert!(HeightField::flat(2, 10.0, 10.0).is_ok());
    }

    #[test]
    fn test_rejects_resolution_over_index_limit() {
        assert!(HeightField::flat(MAX_RESOLUTION, 10.0, 10.0).is_ok());
        assert!(matches!(
            HeightField::flat(MAX_RESOLUTION + 1, 10.0, 10.0),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_rejects_mismatched_sample_count() {
        let result = HeightField::from_heights(4, 10.0, 10.0, vec![0.0; 15]);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_legacy_resolution_from_count() {
        let field = HeightField::from_legacy_heights(vec![1.0; 25], 8.0, 8.0).expect("square grid");
        assert_eq!(field.resolution(), 5);

        let result = HeightField::from_legacy_heights(vec![1.0; 24], 8.0, 8.0);
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_row_major_access() {
        let heights = (0..9).map(|i| i as f32).collect();
        let mut field = HeightField::from_heights(3, 2.0, 2.0, heights).expect("valid field");
        assert_eq!(field.height(2, 0), Some(2.0));
        assert_eq!(field.height(0, 2), Some(6.0));
        assert_eq!(field.height(3, 0), None);

        assert!(field.set_height(1, 1, 42.0));
        assert_eq!(field.heights()[4], 42.0);
        assert!(!field.set_height(5, 1, 1.0));
    }

    #[test]
    fn test_spacing_and_range() {
        let heights = (0..9).map(|i| i as f32).collect();
        let field = HeightField::from_heights(3, 4.0, 8.0, heights).expect("valid field");
        assert_eq!(field.grid_spacing(), (2.0, 4.0));
        assert_eq!(field.min_max(), (0.0, 8.0));
    }
}
