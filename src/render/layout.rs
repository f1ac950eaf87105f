//! Interleaved vertex layout for terrain meshes

use serde::{Deserialize, Serialize};

/// Attribute set of an interleaved terrain vertex.
///
/// Attributes are packed in the order position, uv, normal. Position is
/// always present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexLayout {
    pub uv: bool,
    pub normal: bool,
}

impl VertexLayout {
    /// Position + uv + normal, 8 floats per vertex
    pub const FULL: VertexLayout = VertexLayout { uv: true, normal: true };
    /// Position + normal, used by shadow/depth passes
    pub const POSITION_NORMAL: VertexLayout = VertexLayout { uv: false, normal: true };
    /// Position only
    pub const POSITION: VertexLayout = VertexLayout { uv: false, normal: false };

    /// Floats per vertex
    pub const fn stride(&self) -> usize {
        3 + if self.uv { 2 } else { 0 } + if self.normal { 3 } else { 0 }
    }

    /// Byte size of one vertex
    pub const fn stride_bytes(&self) -> usize {
        self.stride() * std::mem::size_of::<f32>()
    }

    pub const fn position_offset(&self) -> usize {
        0
    }

    /// Float offset of the uv pair, if present
    pub const fn uv_offset(&self) -> Option<usize> {
        if self.uv { Some(3) } else { None }
    }

    /// Float offset of the normal triple, if present
    pub const fn normal_offset(&self) -> Option<usize> {
        if !self.normal {
            None
        } else if self.uv {
            Some(5)
        } else {
            Some(3)
        }
    }
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::FULL
    }
}
