//! Terrain persistence

pub mod terrain_file;

pub use terrain_file::{
    decode, encode, load_terrain_file, load_terrain_file_async, save_terrain_file, save_terrain_file_async,
    FormatVersion, TerrainFileData,
};
