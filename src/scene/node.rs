//! Object transform

use glam::{Mat4, Quat};
use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;

/// Placement of a terrain object in the world.
///
/// Terrains are axis-aligned, so there is no rotation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Identity transform (no translation or scaling).
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a translation-only transform.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to a 4x4 matrix.
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, Quat::IDENTITY, self.position)
    }

    pub fn local_to_world(&self, p: Vec3) -> Vec3 {
        p * self.scale + self.position
    }

    /// Inverse of [`local_to_world`](Self::local_to_world). Zero scale axes map to zero.
    pub fn world_to_local(&self, p: Vec3) -> Vec3 {
        let inv = Vec3::select(self.scale.cmpeq(Vec3::ZERO), Vec3::ZERO, self.scale.recip());
        (p - self.position) * inv
    }
}
