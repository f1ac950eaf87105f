//! Seam between the terrain core and the external renderer
//!
//! The core never talks to a GPU API directly. It hands vertex/index arrays
//! to a [`MeshAllocator`] and keeps the returned opaque handles.

pub mod layout;
pub mod mesh;
pub mod headless;
pub mod material;

pub use layout::VertexLayout;
pub use mesh::{MeshAllocator, MeshDesc, MeshHandle, RenderMesh, Renderable};
pub use headless::HeadlessAllocator;
pub use material::TerrainShaderFeatures;
