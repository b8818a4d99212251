//! GPU backend seam
//!
//! The frame builder never talks to a graphics API directly. Everything it
//! needs from the GPU goes through [`RenderBackend`]: texture and buffer
//! management, draw submission and framebuffer readback.

use thiserror::Error;

use crate::quad::Vertex;

/// Backend failures
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("texture allocation failed: {0}")]
    TextureAllocation(String),

    #[error("framebuffer readback failed: {0}")]
    Readback(String),

    #[error("GPU context lost")]
    ContextLost,
}

/// Size of the render target in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Pixel rectangle in framebuffer coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Size in bytes of the RGBA8 pixels covered by this rect
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Row order of pixels returned by [`RenderBackend::read_pixels`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadbackOrigin {
    /// First row is the top of the image
    TopLeft,
    /// First row is the bottom of the image, y grows upward
    BottomLeft,
}

/// One batched draw
pub struct DrawCall<'a, T, B> {
    pub texture: &'a T,
    pub vertices: &'a B,
    pub indices: &'a B,
    pub index_count: u32,
    /// Bind the per-vertex color attribute
    pub uses_color: bool,
}

/// Everything the frame builder needs from a GPU
pub trait RenderBackend {
    type Texture;
    type Buffer;

    /// Allocate an RGBA8 texture with undefined contents.
    fn create_texture(&mut self, width: u32, height: u32) -> Result<Self::Texture, BackendError>;

    /// Upload tightly packed RGBA8 `pixels` into a region of `texture`.
    fn write_texture(
        &mut self,
        texture: &Self::Texture,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), BackendError>;

    /// Release a texture. Never called for handles invalidated by context loss.
    fn delete_texture(&mut self, texture: Self::Texture);

    /// Replace `previous` with a buffer sized for exactly `vertices`, filled with them.
    fn allocate_vertex_buffer(
        &mut self,
        previous: Option<Self::Buffer>,
        vertices: &[Vertex],
    ) -> Self::Buffer;

    /// Overwrite the first `vertices.len()` vertices of an existing buffer.
    fn write_vertex_buffer(&mut self, buffer: &Self::Buffer, vertices: &[Vertex]);

    fn allocate_index_buffer(&mut self, previous: Option<Self::Buffer>, indices: &[u32]) -> Self::Buffer;

    /// Apply a new surface size and the projection size mapped onto it.
    fn set_projection(&mut self, viewport: Viewport, ortho: Viewport);

    fn begin_frame(&mut self, clear: [f32; 3]);

    fn draw(&mut self, call: DrawCall<'_, Self::Texture, Self::Buffer>);

    /// Submit every draw recorded since `begin_frame`.
    fn end_draws(&mut self);

    /// Read RGBA8 pixels of `rect` from the rendered frame.
    fn read_pixels(&mut self, rect: PixelRect) -> Result<Vec<u8>, BackendError>;

    fn readback_origin(&self) -> ReadbackOrigin;

    fn end_frame(&mut self) {}
}
