//! Splat texture channels and the RGBA blend-weight map
//!
//! A terrain blends up to five diffuse textures: BASE everywhere, and R, G,
//! B, A weighted by the matching channel of the splat map. Each channel can
//! also carry a normal map.

use std::path::Path;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::asset::{AssetId, TextureAsset};
use crate::core::{Error, Result};

/// Texture channel of a terrain material
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplatChannel {
    Base,
    R,
    G,
    B,
    A,
}

impl SplatChannel {
    /// Channels in assignment priority order
    pub const ALL: [SplatChannel; 5] = [
        SplatChannel::Base,
        SplatChannel::R,
        SplatChannel::G,
        SplatChannel::B,
        SplatChannel::A,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Component of the splat map holding this channel's weight.
    /// BASE has no weight of its own.
    pub fn weight_component(self) -> Option<usize> {
        match self {
            SplatChannel::Base => None,
            SplatChannel::R => Some(0),
            SplatChannel::G => Some(1),
            SplatChannel::B => Some(2),
            SplatChannel::A => Some(3),
        }
    }
}

/// RGBA8 blend weights painted over the terrain surface
#[derive(Clone, Debug, PartialEq)]
pub struct SplatMap {
    image: RgbaImage,
}

impl SplatMap {
    /// All-zero map (BASE only) of `size × size` pixels
    pub fn new(size: u32) -> Result<Self> {
        if size == 0 {
            return Err(Error::geometry("splat map size must be non-zero"));
        }
        Ok(Self { image: RgbaImage::new(size, size) })
    }

    pub fn from_image(image: RgbaImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::geometry("splat map image is empty"));
        }
        Ok(Self { image })
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Weight of a channel at a pixel; BASE and out-of-range pixels give `None`
    pub fn weight(&self, channel: SplatChannel, x: u32, y: u32) -> Option<u8> {
        let c = channel.weight_component()?;
        self.image.get_pixel_checked(x, y).map(|p| p.0[c])
    }

    /// Set the weight of a channel at a pixel. Returns false for BASE or out-of-range pixels.
    pub fn set_weight(&mut self, channel: SplatChannel, x: u32, y: u32, weight: u8) -> bool {
        let Some(c) = channel.weight_component() else {
            return false;
        };
        match self.image.get_pixel_mut_checked(x, y) {
            Some(pixel) => {
                pixel.0[c] = weight;
                true
            }
            None => false,
        }
    }

    /// Normalized R, G, B, A weights at a terrain uv in `[0, 1]`, nearest pixel
    pub fn weights_at_uv(&self, u: f32, v: f32) -> [f32; 4] {
        let x = (u.clamp(0.0, 1.0) * (self.width() - 1) as f32).round() as u32;
        let y = (v.clamp(0.0, 1.0) * (self.height() - 1) as f32).round() as u32;
        let Rgba(p) = *self.image.get_pixel(x, y);
        p.map(|w| w as f32 / 255.0)
    }

    /// Zero one channel everywhere. BASE is a no-op.
    pub fn clear_channel(&mut self, channel: SplatChannel) {
        if let Some(c) = channel.weight_component() {
            for pixel in self.image.pixels_mut() {
                pixel.0[c] = 0;
            }
        }
    }

    /// True if any pixel has a non-zero weight for the channel
    pub fn has_weights(&self, channel: SplatChannel) -> bool {
        channel
            .weight_component()
            .is_some_and(|c| self.image.pixels().any(|p| p.0[c] != 0))
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    pub fn load_png(path: &Path) -> Result<Self> {
        let image = image::open(path)?.to_rgba8();
        Self::from_image(image)
    }
}

/// Diffuse and normal texture assignment for the five terrain channels.
///
/// Textures are shared with the asset table; dropping the set never frees them.
#[derive(Clone, Debug, Default)]
pub struct SplatChannelSet {
    diffuse: [Option<Arc<TextureAsset>>; 5],
    normal: [Option<Arc<TextureAsset>>; 5],
    splat_map: Option<SplatMap>,
    triplanar: bool,
}

impl SplatChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_channel(&mut self, channel: SplatChannel, texture: Arc<TextureAsset>) {
        self.diffuse[channel.index()] = Some(texture);
    }

    /// Unassign a diffuse texture and erase its painted weights
    pub fn remove_channel(&mut self, channel: SplatChannel) {
        self.diffuse[channel.index()] = None;
        if let Some(map) = self.splat_map.as_mut() {
            map.clear_channel(channel);
        }
    }

    pub fn set_normal_channel(&mut self, channel: SplatChannel, texture: Arc<TextureAsset>) {
        self.normal[channel.index()] = Some(texture);
    }

    /// Unassign a normal map. Painted weights are left alone.
    pub fn remove_normal_channel(&mut self, channel: SplatChannel) {
        self.normal[channel.index()] = None;
    }

    pub fn diffuse(&self, channel: SplatChannel) -> Option<&Arc<TextureAsset>> {
        self.diffuse[channel.index()].as_ref()
    }

    pub fn normal(&self, channel: SplatChannel) -> Option<&Arc<TextureAsset>> {
        self.normal[channel.index()].as_ref()
    }

    /// First channel without a diffuse texture, in BASE, R, G, B, A order
    pub fn next_free_channel(&self) -> Option<SplatChannel> {
        SplatChannel::ALL
            .into_iter()
            .find(|c| self.diffuse[c.index()].is_none())
    }

    pub fn count_assigned_diffuse_channels(&self) -> usize {
        self.diffuse.iter().filter(|t| t.is_some()).count()
    }

    pub fn has_diffuse_channel(&self, channel: SplatChannel) -> bool {
        self.diffuse[channel.index()].is_some()
    }

    pub fn has_normal_channel(&self, channel: SplatChannel) -> bool {
        self.normal[channel.index()].is_some()
    }

    pub fn has_any_normal_channels(&self) -> bool {
        self.normal.iter().any(|t| t.is_some())
    }

    /// True if the texture is bound to any diffuse or normal channel
    pub fn uses_texture(&self, id: AssetId) -> bool {
        self.diffuse
            .iter()
            .chain(self.normal.iter())
            .flatten()
            .any(|t| t.id == id)
    }

    pub fn splat_map(&self) -> Option<&SplatMap> {
        self.splat_map.as_ref()
    }

    pub fn splat_map_mut(&mut self) -> Option<&mut SplatMap> {
        self.splat_map.as_mut()
    }

    pub fn set_splat_map(&mut self, map: Option<SplatMap>) {
        self.splat_map = map;
    }

    pub fn triplanar(&self) -> bool {
        self.triplanar
    }

    pub fn set_triplanar(&mut self, triplanar: bool) {
        self.triplanar = triplanar;
    }
}
