//! Terrain level of detail
//!
//! - [`level`]: CPU mesh data and the GPU-side level set
//! - [`simplify`]: grid clustering that produces coarser levels
//! - [`builder`]: background worker running the simplifier
//! - [`controller`]: per-frame selection of the bound level

pub mod level;
pub mod simplify;
pub mod builder;
pub mod controller;

pub use level::{LodLevel, LodMeshData, LodSet};
pub use simplify::{build_lod_levels, simplify, LodConfig, LodInput};
pub use builder::{CancelToken, LodBuilder, LodJob, LodResult};
pub use controller::{determine_lod_level, select_lod, LodControllerConfig, LodPlacement, TerrainLodController};
