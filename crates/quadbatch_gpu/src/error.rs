//! GPU error types

use quadbatch_core::BackendError;
use thiserror::Error;

/// wgpu backend errors
#[derive(Error, Debug)]
pub enum GpuError {
    /// No adapter matched the request
    #[error("No suitable GPU adapter found")]
    AdapterNotFound,

    /// Device request was rejected
    #[error("Failed to request GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// Readback buffer could not be mapped
    #[error("Failed to map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),

    /// Requested texture exceeds device limits
    #[error("Texture {width}x{height} exceeds the {max} pixel limit")]
    TextureTooLarge { width: u32, height: u32, max: u32 },

    /// Pixel data does not match the region it is written to
    #[error("Expected {expected} bytes of pixel data, got {actual}")]
    PixelData { expected: usize, actual: usize },
}

impl From<GpuError> for BackendError {
    fn from(err: GpuError) -> Self {
        match err {
            GpuError::Map(_) => BackendError::Readback(err.to_string()),
            other => BackendError::TextureAllocation(other.to_string()),
        }
    }
}
