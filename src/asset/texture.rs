//! Loaded texture assets as seen by terrain materials

use super::AssetId;

/// Opaque renderer handle for an uploaded texture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// A texture that the asset manager has already loaded and uploaded
#[derive(Clone, Debug, PartialEq)]
pub struct TextureAsset {
    pub id: AssetId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub handle: TextureHandle,
}

impl TextureAsset {
    pub fn new(id: AssetId, name: impl Into<String>, width: u32, height: u32, handle: TextureHandle) -> Self {
        Self {
            id,
            name: name.into(),
            width,
            height,
            handle,
        }
    }
}
