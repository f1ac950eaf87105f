//! Core types and utilities shared by the terrain subsystem

pub mod types;
pub mod error;
pub mod logging;
pub mod camera;
pub mod config;

pub use types::*;
pub use error::Error;
pub use camera::Camera;
pub use config::TerrainSettings;
