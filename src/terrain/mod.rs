//! Heightfield terrain: samples, mesh, texture channels and generation

pub mod heightfield;
pub use heightfield::{HeightField, MAX_RESOLUTION};

pub mod mesh;
pub use mesh::{DirtyRect, PlaneMesh};

pub mod splat;
pub use splat::{SplatChannel, SplatChannelSet, SplatMap};

pub mod model;
pub use model::Terrain;

pub mod generator;
pub use generator::{TerrainGenerator, TerrainParams};
