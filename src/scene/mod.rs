//! Scene-side terrain objects

pub mod node;
pub mod terrain_object;
pub mod terrain_scene;

pub use node::Transform;
pub use terrain_object::TerrainObject;
pub use terrain_scene::TerrainScene;
