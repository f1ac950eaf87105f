//! Noise-based heightfield generation

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::Result;
use super::heightfield::HeightField;

/// Fractal noise settings for a generated heightfield
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    pub seed: u32,
    /// World units per noise period
    pub scale: f32,
    /// Spread between the lowest and highest possible sample
    pub height_scale: f32,
    pub base_height: f32,
    pub octaves: u32,
    /// Amplitude falloff per octave
    pub persistence: f32,
    /// Frequency growth per octave
    pub lacunarity: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            scale: 100.0,
            height_scale: 20.0,
            base_height: 0.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Fills heightfields from an fBm Perlin source
pub struct TerrainGenerator {
    params: TerrainParams,
    source: Fbm<Perlin>,
}

impl TerrainGenerator {
    pub fn new(params: TerrainParams) -> Self {
        let source = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves.max(1) as usize)
            .set_persistence(f64::from(params.persistence))
            .set_lacunarity(f64::from(params.lacunarity));
        Self { params, source }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Height in `base_height..=base_height + height_scale` at local (x, z)
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let p = &self.params;
        let sample = self.source.get([f64::from(x / p.scale), f64::from(z / p.scale)]);
        let t = (sample * 0.5 + 0.5).clamp(0.0, 1.0) as f32;
        p.base_height + t * p.height_scale
    }

    /// Sample a `resolution × resolution` heightfield covering `width × depth`.
    ///
    /// Rows are sampled in parallel.
    pub fn generate(&self, resolution: usize, width: f32, depth: f32) -> Result<HeightField> {
        let mut field = HeightField::flat(resolution, width, depth)?;
        let (dx, dz) = field.grid_spacing();

        field
            .heights_mut()
            .par_chunks_mut(resolution)
            .enumerate()
            .for_each(|(z, row)| {
                for (x, h) in row.iter_mut().enumerate() {
                    *h = self.height_at(x as f32 * dx, z as f32 * dz);
                }
            });

        let (lo, hi) = field.min_max();
        log::debug!(
            "Generated {}x{} heightfield (seed {}), heights {:.2}..{:.2}",
            resolution, resolution, self.params.seed, lo, hi
        );
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_params_default() {
        let params = TerrainParams::default();
        assert_eq!(params.seed, 12345);
        assert_eq!(params.octaves, 4);
        assert!((params.persistence - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_height_at_in_range() {
        let generator = TerrainGenerator::new(TerrainParams::default());
        for i in 0..50 {
            let h = generator.height_at(i as f32 * 13.7, i as f32 * -4.1);
            assert!((0.0..=20.0).contains(&h), "height {} out of range", h);
        }
    }

    #[test]
    fn test_height_at_consistency() {
        let generator = TerrainGenerator::new(TerrainParams::default());
        assert_eq!(generator.height_at(50.0, 75.0), generator.height_at(50.0, 75.0));
    }

    #[test]
    fn test_generate_matches_point_samples() {
        let generator = TerrainGenerator::new(TerrainParams::default());
        let field = generator.generate(9, 80.0, 40.0).expect("valid resolution");

        assert_eq!(field.resolution(), 9);
        assert_eq!(field.height(0, 0), Some(generator.height_at(0.0, 0.0)));
        assert_eq!(field.height(8, 8), Some(generator.height_at(80.0, 40.0)));
        assert_eq!(field.height(3, 2), Some(generator.height_at(30.0, 10.0)));
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = TerrainGenerator::new(TerrainParams { seed: 1, ..Default::default() });
        let b = TerrainGenerator::new(TerrainParams { seed: 2, ..Default::default() });
        let fa = a.generate(8, 300.0, 300.0).expect("valid resolution");
        let fb = b.generate(8, 300.0, 300.0).expect("valid resolution");
        assert_ne!(fa.heights(), fb.heights());
    }

    #[test]
    fn test_generate_rejects_bad_resolution() {
        let generator = TerrainGenerator::new(TerrainParams::default());
        assert!(generator.generate(1, 10.0, 10.0).is_err());
    }

    #[test]
    fn test_params_json_defaults() {
        let params: TerrainParams = serde_json::from_str(r#"{"seed": 7}"#).expect("valid json");
        assert_eq!(params.seed, 7);
        assert_eq!(params.octaves, 4);
    }
}
