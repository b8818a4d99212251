//! quadbatch frame builder
//!
//! Turns a compact textual command stream into per-texture batches of
//! textured quads.
//!
//! # Features
//!
//! - Single-letter command language with save/restore transforms
//! - Floor-snapped quad generation with a global alpha tint
//! - Per-texture streams reused by slot across frames, grow-only buffers
//! - One shared index buffer for every stream
//! - Queued framebuffer captures with host callbacks
//!
//! The GPU sits behind [`RenderBackend`]; `quadbatch_gpu` provides the wgpu
//! implementation and [`testing::RecordingBackend`] records calls for tests.
//!
//! ```
//! use quadbatch_core::testing::{MemoryCodec, RecordingBackend};
//! use quadbatch_core::{Canvas, CanvasConfig};
//!
//! let mut backend = RecordingBackend::new(320, 240);
//! let atlas = backend.external_texture();
//! let mut canvas = Canvas::with_codec(backend, MemoryCodec::new(), CanvasConfig::default(), 320, 240);
//! canvas.add_texture(1, atlas, 64, 64);
//! canvas.render("l10,10;d1,0,0,32,32,0,0,32,32;");
//! assert_eq!(canvas.streams()[0].quad_count(), 1);
//! ```

pub mod backend;
pub mod canvas;
pub mod capture;
pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod index;
pub mod overlay;
pub mod quad;
pub mod stats;
pub mod stream;
pub mod testing;
pub mod texture;
pub mod transform;

pub use backend::{BackendError, DrawCall, PixelRect, ReadbackOrigin, RenderBackend, Viewport};
pub use canvas::Canvas;
pub use capture::{Callback, CaptureRequest, MAX_FIELD_LEN};
pub use codec::{DecodedImage, ImageCodec, PngCodec};
pub use command::{Command, CommandParser};
pub use config::CanvasConfig;
pub use error::{CanvasError, Result};
pub use quad::{Clip, Color, Quad, Vertex};
pub use stats::FrameStats;
pub use stream::{Stream, StreamBatcher};
pub use texture::{TextureKey, TextureRegistry, FONT_TEXTURE_ID};
pub use transform::{Transform, TransformStack};
