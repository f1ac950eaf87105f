//! Shader feature selection for terrain
//!
//! Shader compilation and uniform binding are the renderer's job. This module
//! only derives which variant a terrain needs from its splat channels.

use crate::terrain::{SplatChannel, SplatChannelSet};

/// Feature switches for the terrain shader variant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TerrainShaderFeatures {
    /// Bit `i` set when diffuse channel `SplatChannel::ALL[i]` is assigned
    pub diffuse_mask: u8,
    /// Same layout for normal map channels
    pub normal_mask: u8,
    pub splat_map: bool,
    pub triplanar: bool,
}

impl TerrainShaderFeatures {
    pub fn from_channels(channels: &SplatChannelSet) -> Self {
        let mut features = Self {
            splat_map: channels.splat_map().is_some(),
            triplanar: channels.triplanar(),
            ..Self::default()
        };
        for channel in SplatChannel::ALL {
            let bit = 1u8 << channel.index();
            if channels.has_diffuse_channel(channel) {
                features.diffuse_mask |= bit;
            }
            if channels.has_normal_channel(channel) {
                features.normal_mask |= bit;
            }
        }
        features
    }

    pub fn has_diffuse(&self, channel: SplatChannel) -> bool {
        self.diffuse_mask & (1 << channel.index()) != 0
    }

    pub fn has_normal_maps(&self) -> bool {
        self.normal_mask != 0
    }

    /// Blending needs a splat map and more than the base channel
    pub fn needs_blending(&self) -> bool {
        self.splat_map && self.diffuse_mask & !1 != 0
    }
}
