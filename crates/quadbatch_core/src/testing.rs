//! In-memory backend and codec for tests and benchmarks
//!
//! [`RecordingBackend`] logs every call it receives and keeps buffer contents
//! and a CPU framebuffer so tests can assert on exactly what reached the
//! GPU. [`MemoryCodec`] stands in for PNG files.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use crate::backend::{
    BackendError, DrawCall, PixelRect, ReadbackOrigin, RenderBackend, Viewport,
};
use crate::codec::{DecodedImage, ImageCodec};
use crate::error::{CanvasError, Result};
use crate::quad::Vertex;

/// Texture handle issued by [`RecordingBackend`]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordedTexture(pub usize);

/// Buffer handle issued by [`RecordingBackend`]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordedBuffer(pub usize);

/// One call into the backend
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    CreateTexture { texture: usize, width: u32, height: u32 },
    WriteTexture { texture: usize, x: u32, y: u32, width: u32, height: u32 },
    DeleteTexture { texture: usize },
    AllocateVertexBuffer { buffer: usize, count: usize, replaced: Option<usize> },
    WriteVertexBuffer { buffer: usize, count: usize },
    AllocateIndexBuffer { count: usize },
    SetProjection { viewport: Viewport, ortho: Viewport },
    BeginFrame { clear: [f32; 3] },
    Draw { texture: usize, buffer: usize, index_count: u32, uses_color: bool },
    EndDraws,
    ReadPixels { rect: PixelRect },
    EndFrame,
}

/// Backend that records calls instead of rendering
#[derive(Debug)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    buffers: Vec<Vec<Vertex>>,
    next_texture: usize,
    viewport: Viewport,
    framebuffer: Vec<u8>,
    origin: ReadbackOrigin,
    pub fail_texture_allocation: bool,
    pub fail_readback: bool,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        let viewport = Viewport::new(width, height);
        Self {
            calls: Vec::new(),
            buffers: Vec::new(),
            next_texture: 0,
            viewport,
            framebuffer: vec![0; width as usize * height as usize * 4],
            origin: ReadbackOrigin::TopLeft,
            fail_texture_allocation: false,
            fail_readback: false,
        }
    }

    /// Report readback rows bottom-first, like a GL framebuffer.
    pub fn with_origin(mut self, origin: ReadbackOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// A texture handle the host created itself.
    pub fn external_texture(&mut self) -> RecordedTexture {
        self.next_texture += 1;
        RecordedTexture(self.next_texture)
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|&c| pred(c)).count()
    }

    /// Draw calls in submission order
    pub fn draws(&self) -> Vec<&BackendCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Draw { .. }))
            .collect()
    }

    pub fn buffer_vertices(&self, buffer: &RecordedBuffer) -> &[Vertex] {
        self.buffers.get(buffer.0).map_or(&[], Vec::as_slice)
    }

    /// Fill each framebuffer row (top first) with one color.
    pub fn fill_rows(&mut self, color_of_row: impl Fn(u32) -> [u8; 4]) {
        let stride = self.viewport.width as usize * 4;
        if stride == 0 {
            return;
        }
        for (row, line) in self.framebuffer.chunks_exact_mut(stride).enumerate() {
            let color = color_of_row(row as u32);
            for px in line.chunks_exact_mut(4) {
                px.copy_from_slice(&color);
            }
        }
    }
}

impl RenderBackend for RecordingBackend {
    type Texture = RecordedTexture;
    type Buffer = RecordedBuffer;

    fn create_texture(&mut self, width: u32, height: u32) -> std::result::Result<RecordedTexture, BackendError> {
        if self.fail_texture_allocation {
            return Err(BackendError::TextureAllocation(format!(
                "refusing {width}x{height} texture"
            )));
        }
        let texture = self.external_texture();
        self.calls.push(BackendCall::CreateTexture {
            texture: texture.0,
            width,
            height,
        });
        Ok(texture)
    }

    fn write_texture(
        &mut self,
        texture: &RecordedTexture,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> std::result::Result<(), BackendError> {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        self.calls.push(BackendCall::WriteTexture {
            texture: texture.0,
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    fn delete_texture(&mut self, texture: RecordedTexture) {
        self.calls.push(BackendCall::DeleteTexture { texture: texture.0 });
    }

    fn allocate_vertex_buffer(
        &mut self,
        previous: Option<RecordedBuffer>,
        vertices: &[Vertex],
    ) -> RecordedBuffer {
        let buffer = self.buffers.len();
        self.buffers.push(vertices.to_vec());
        self.calls.push(BackendCall::AllocateVertexBuffer {
            buffer,
            count: vertices.len(),
            replaced: previous.map(|b| b.0),
        });
        RecordedBuffer(buffer)
    }

    fn write_vertex_buffer(&mut self, buffer: &RecordedBuffer, vertices: &[Vertex]) {
        if let Some(contents) = self.buffers.get_mut(buffer.0) {
            let n = vertices.len().min(contents.len());
            contents[..n].copy_from_slice(&vertices[..n]);
        }
        self.calls.push(BackendCall::WriteVertexBuffer {
            buffer: buffer.0,
            count: vertices.len(),
        });
    }

    fn allocate_index_buffer(&mut self, _previous: Option<RecordedBuffer>, indices: &[u32]) -> RecordedBuffer {
        self.calls.push(BackendCall::AllocateIndexBuffer {
            count: indices.len(),
        });
        RecordedBuffer(usize::MAX)
    }

    fn set_projection(&mut self, viewport: Viewport, ortho: Viewport) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.framebuffer = vec![0; viewport.width as usize * viewport.height as usize * 4];
        }
        self.calls.push(BackendCall::SetProjection { viewport, ortho });
    }

    fn begin_frame(&mut self, clear: [f32; 3]) {
        self.calls.push(BackendCall::BeginFrame { clear });
    }

    fn draw(&mut self, call: DrawCall<'_, RecordedTexture, RecordedBuffer>) {
        self.calls.push(BackendCall::Draw {
            texture: call.texture.0,
            buffer: call.vertices.0,
            index_count: call.index_count,
            uses_color: call.uses_color,
        });
    }

    fn end_draws(&mut self) {
        self.calls.push(BackendCall::EndDraws);
    }

    fn read_pixels(&mut self, rect: PixelRect) -> std::result::Result<Vec<u8>, BackendError> {
        self.calls.push(BackendCall::ReadPixels { rect });
        if self.fail_readback {
            return Err(BackendError::Readback("readback disabled".to_string()));
        }
        if rect.x + rect.width > self.viewport.width || rect.y + rect.height > self.viewport.height {
            return Err(BackendError::Readback(format!("{rect:?} outside framebuffer")));
        }

        let stride = self.viewport.width as usize * 4;
        let mut out = Vec::with_capacity(rect.byte_len());
        for i in 0..rect.height {
            // Bottom-left readback counts rows up from the last framebuffer row.
            let row = match self.origin {
                ReadbackOrigin::TopLeft => rect.y + i,
                ReadbackOrigin::BottomLeft => self.viewport.height - 1 - (rect.y + i),
            } as usize;
            let start = row * stride + rect.x as usize * 4;
            out.extend_from_slice(&self.framebuffer[start..start + rect.width as usize * 4]);
        }
        Ok(out)
    }

    fn readback_origin(&self) -> ReadbackOrigin {
        self.origin
    }

    fn end_frame(&mut self) {
        self.calls.push(BackendCall::EndFrame);
    }
}

/// Codec that keeps "files" in memory
///
/// Encoded bytes are `width` and `height` as little-endian `u32` followed by
/// the raw RGBA8 pixels.
#[derive(Debug, Default)]
pub struct MemoryCodec {
    written: RefCell<Vec<(PathBuf, DecodedImage)>>,
    pub fail_encode: bool,
}

impl MemoryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize an image into the byte format [`decode`](ImageCodec::decode) reads.
    pub fn encode_image(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + pixels.len());
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.extend_from_slice(pixels);
        bytes
    }

    /// Images written so far, oldest first
    pub fn written(&self) -> Vec<(PathBuf, DecodedImage)> {
        self.written.borrow().clone()
    }
}

impl ImageCodec for MemoryCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        let header = |range: std::ops::Range<usize>| -> Result<u32> {
            bytes
                .get(range)
                .and_then(|b| b.try_into().ok())
                .map(u32::from_le_bytes)
                .ok_or_else(|| CanvasError::Decode("truncated header".to_string()))
        };
        let width = header(0..4)?;
        let height = header(4..8)?;
        let pixels = &bytes[8..];
        if pixels.len() != width as usize * height as usize * 4 {
            return Err(CanvasError::Decode(format!(
                "expected {} pixel bytes, got {}",
                width as usize * height as usize * 4,
                pixels.len()
            )));
        }
        Ok(DecodedImage {
            width,
            height,
            pixels: pixels.to_vec(),
        })
    }

    fn encode_png(&self, path: &Path, pixels: &[u8], width: u32, height: u32) -> Result<()> {
        if self.fail_encode {
            return Err(CanvasError::Encode {
                path: path.display().to_string(),
                reason: "encoder disabled".to_string(),
            });
        }
        self.written.borrow_mut().push((
            path.to_path_buf(),
            DecodedImage {
                width,
                height,
                pixels: pixels.to_vec(),
            },
        ));
        Ok(())
    }
}
