//! Canvas error types

use thiserror::Error;

use crate::backend::BackendError;

/// Errors from fallible canvas operations
#[derive(Error, Debug)]
pub enum CanvasError {
    /// Image bytes could not be decoded
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Captured pixels could not be written out
    #[error("Failed to encode {path}: {reason}")]
    Encode { path: String, reason: String },

    /// Framebuffer readback failed
    #[error("Readback failed: {0}")]
    Readback(String),

    /// Backend could not allocate a texture
    #[error("Texture allocation failed: {0}")]
    TextureAllocation(String),

    /// Capture rectangle covers no pixels
    #[error("Capture rectangle is empty")]
    EmptyCapture,

    /// GPU context is gone until the next surface change
    #[error("GPU context lost")]
    ContextLost,
}

impl From<BackendError> for CanvasError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::TextureAllocation(msg) => CanvasError::TextureAllocation(msg),
            BackendError::Readback(msg) => CanvasError::Readback(msg),
            BackendError::ContextLost => CanvasError::ContextLost,
        }
    }
}

/// Result type for canvas operations
pub type Result<T> = std::result::Result<T, CanvasError>;
