//! Error types for the terrain core

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Corrupt or truncated terrain file. Fatal for that asset only.
    #[error("Terrain format error: {0}")]
    Format(String),

    /// Geometry parameters that would produce a degenerate mesh.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Missing dependency: {owner} references unknown asset {missing}")]
    MissingDependency { owner: String, missing: String },

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    pub(crate) fn geometry(msg: impl Into<String>) -> Self {
        Error::InvalidGeometry(msg.into())
    }
}
