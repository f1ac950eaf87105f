//! Scene camera as seen by the terrain subsystem
//!
//! The editor owns camera movement; terrain code only reads the eye
//! position, the far clip distance and the view-projection used for culling.

use crate::core::types::{Mat4, Vec3};
use crate::math::Frustum;

const DEFAULT_FOV_DEGREES: f32 = 60.0;
const DEFAULT_ASPECT: f32 = 16.0 / 9.0;

/// Perspective eye looking along `direction`
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    /// Unit view direction
    pub direction: Vec3,
    pub up: Vec3,
    /// Vertical field of view, radians
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    /// Far clip distance, also the reference range for LOD selection
    pub far: f32,
}

impl Camera {
    /// Eye at `position` aimed at `target`
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let direction = (target - position).try_normalize().unwrap_or(Vec3::NEG_Z);
        Self {
            position,
            direction,
            up,
            fov_y: DEFAULT_FOV_DEGREES.to_radians(),
            aspect: DEFAULT_ASPECT,
            near: 0.5,
            far: 5000.0,
        }
    }

    pub fn with_far(mut self, far: f32) -> Self {
        self.far = far;
        self
    }

    pub fn with_viewport(mut self, width: f32, height: f32) -> Self {
        if height > 0.0 {
            self.aspect = width / height;
        }
        self
    }

    pub fn forward(&self) -> Vec3 {
        self.direction
    }

    pub fn view_projection(&self) -> Mat4 {
        let view = Mat4::look_to_rh(self.position, self.direction, self.up);
        let projection = Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far);
        projection * view
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 50.0, 100.0), Vec3::ZERO, Vec3::Y)
    }
}
