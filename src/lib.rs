//! Strata - heightfield terrain core for a 3D level editor
//!
//! - [`terrain`]: height samples, mesh building, splat channels, generation
//! - [`lod`]: simplification, background building and runtime selection
//! - [`io`]: the binary terrain file
//! - [`asset`]: texture, terrain layer and terrain assets
//! - [`scene`]: terrain objects placed in a scene
//! - [`render`]: the seam to the external renderer

pub mod core;
pub mod math;
pub mod render;
pub mod asset;
pub mod terrain;
pub mod lod;
pub mod io;
pub mod scene;
