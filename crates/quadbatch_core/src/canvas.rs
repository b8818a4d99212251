//! The canvas context object
//!
//! [`Canvas`] owns every piece of frame-builder state: registered textures,
//! the transform stack, the tint, the persistent streams, the shared index
//! buffer and the capture/callback queues. The host drives it with one
//! `render` call per frame.

use std::path::Path;

use tracing::{debug, info, trace, warn};

use crate::backend::{DrawCall, ReadbackOrigin, RenderBackend, Viewport};
use crate::capture::{flip_rows, to_backend_rect, Callback, CaptureQueues, CaptureRequest};
use crate::codec::{power_of_two_at_least, ImageCodec, PngCodec};
use crate::command::{Command, CommandParser};
use crate::config::{CanvasConfig, DEFAULT_ORTHO};
use crate::error::{CanvasError, Result};
use crate::index::IndexBuffer;
use crate::overlay::DebugOverlay;
use crate::quad::{Clip, Color, Quad};
use crate::stats::FrameStats;
use crate::stream::{Stream, StreamBatcher};
use crate::texture::{TextureKey, TextureRegistry, FONT_TEXTURE_ID};
use crate::transform::{Transform, TransformStack};

/// Frame builder bound to one GPU backend
pub struct Canvas<B: RenderBackend, C: ImageCodec = PngCodec> {
    backend: B,
    codec: C,
    config: CanvasConfig,
    textures: TextureRegistry<B::Texture>,
    transform: TransformStack,
    tint: Color,
    batcher: StreamBatcher<B::Buffer>,
    index: IndexBuffer<B::Buffer>,
    overlay: DebugOverlay<B::Buffer>,
    captures: CaptureQueues,
    stats: FrameStats,
    viewport: Viewport,
    ortho: Option<Viewport>,
    context_lost: bool,
}

impl<B: RenderBackend> Canvas<B, PngCodec> {
    /// Canvas for a `width` x `height` surface with default settings.
    pub fn new(backend: B, width: u32, height: u32) -> Self {
        Self::with_config(backend, CanvasConfig::default(), width, height)
    }

    pub fn with_config(backend: B, config: CanvasConfig, width: u32, height: u32) -> Self {
        Self::with_codec(backend, PngCodec, config, width, height)
    }
}

impl<B: RenderBackend, C: ImageCodec> Canvas<B, C> {
    pub fn with_codec(backend: B, codec: C, config: CanvasConfig, width: u32, height: u32) -> Self {
        let mut canvas = Self {
            backend,
            codec,
            textures: TextureRegistry::new(),
            transform: TransformStack::new(),
            tint: Color::WHITE,
            batcher: StreamBatcher::new(),
            index: IndexBuffer::new(),
            overlay: DebugOverlay::new(),
            captures: CaptureQueues::new(),
            stats: FrameStats::new(config.stats_window),
            viewport: Viewport::default(),
            ortho: config.ortho.map(|[w, h]| Viewport::new(w, h)),
            context_lost: false,
            config,
        };
        canvas.on_surface_changed(width, height);
        canvas
    }

    // =========================================================================
    // Textures
    // =========================================================================

    /// Register a texture the host already created. An existing texture with
    /// the same ID is released first.
    pub fn add_texture(&mut self, id: i32, handle: B::Texture, width: u32, height: u32) {
        let (_, previous) = self.textures.insert(id, handle, width, height);
        if let Some((old_key, old)) = previous {
            self.forget_streams_of(old_key);
            self.backend.delete_texture(old.handle);
            debug!(id, "replaced texture");
        }
        debug!(id, width, height, "added texture");
    }

    /// Decode `bytes`, upload them into a power-of-two texture and register
    /// it under `id`. Returns the padded texture size.
    pub fn add_image_texture(&mut self, id: i32, bytes: &[u8]) -> Result<(u32, u32)> {
        let image = self.codec.decode(bytes)?;
        let width = power_of_two_at_least(image.width);
        let height = power_of_two_at_least(image.height);
        let padded = image.padded(width, height);

        let handle = self.backend.create_texture(width, height)?;
        if let Err(err) = self
            .backend
            .write_texture(&handle, 0, 0, width, height, &padded.pixels)
        {
            self.backend.delete_texture(handle);
            return Err(err.into());
        }

        debug!(
            id,
            source_width = image.width,
            source_height = image.height,
            width,
            height,
            "decoded image texture"
        );
        self.add_texture(id, handle, width, height);
        Ok((width, height))
    }

    /// Release the texture registered under `id`. Streams drawing it are reset.
    pub fn remove_texture(&mut self, id: i32) {
        match self.textures.remove(id) {
            Some((key, entry)) => {
                self.forget_streams_of(key);
                self.backend.delete_texture(entry.handle);
                debug!(id, "removed texture");
            }
            None => trace!(id, "remove of unknown texture"),
        }
    }

    fn forget_streams_of(&mut self, key: TextureKey) {
        let reset = self.batcher.invalidate(key);
        self.overlay.invalidate(key);
        if reset > 0 {
            debug!(reset, "reset streams of released texture");
        }
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Interpret `commands`, draw the resulting streams and service queued
    /// captures. Empty `commands` redraws the previous frame's streams.
    pub fn render(&mut self, commands: &str) {
        if self.context_lost {
            trace!("render skipped while context is lost");
            return;
        }

        self.tint = Color::WHITE;
        if !commands.is_empty() {
            self.stats.record_message(commands.len());
            self.build_streams(commands);
        }
        self.stats.record_frame();

        let mut index_count = self.batcher.max_index_count();
        if self.config.debug_overlay {
            let text = self
                .stats
                .summary(self.batcher.streams().len(), self.batcher.quad_count());
            let font = self.textures.lookup(FONT_TEXTURE_ID).map(|(key, _)| key);
            self.overlay.update(&mut self.backend, font, &text);
            index_count = index_count.max(self.overlay.stream().index_count());
        }
        self.index.ensure(&mut self.backend, index_count);

        self.backend.begin_frame(self.config.background);
        self.draw_streams();
        self.backend.end_draws();
        self.process_captures();
        self.backend.end_frame();
    }

    fn build_streams(&mut self, commands: &str) {
        self.batcher.begin_frame();

        for command in CommandParser::new(commands) {
            match command {
                Command::SetTransform(t) => self.transform.replace(t),
                Command::ResetTransform => self.transform.set_identity(),
                Command::Save => self.transform.push(),
                Command::Restore => self.transform.pop(),
                Command::GlobalAlpha(alpha) => self.tint = self.tint.with_alpha(alpha),
                Command::DrawImage(clip) => self.draw_image(&clip),
                Command::Unknown(op) => {
                    trace!(opcode = %char::from(op), "skipped unknown command");
                }
                other => {
                    if let Some(t) = other.as_transform() {
                        self.transform.compose(t);
                    }
                }
            }
        }

        self.batcher.finish(&mut self.backend);
    }

    fn draw_image(&mut self, clip: &Clip) {
        let Some((key, entry)) = self.textures.lookup(clip.texture_id) else {
            trace!(texture_id = clip.texture_id, "dropped draw of unknown texture");
            return;
        };
        let quad = Quad::new(
            clip,
            entry.width,
            entry.height,
            &self.transform.current(),
            self.tint,
        );
        self.batcher
            .push_quad(&mut self.backend, key, &quad, !self.tint.is_white());
    }

    fn draw_streams(&mut self) {
        let Some(indices) = self.index.buffer() else {
            return;
        };

        let overlay = self
            .config
            .debug_overlay
            .then(|| self.overlay.stream());
        for stream in self.batcher.streams().iter().chain(overlay) {
            if !stream.is_drawable() {
                continue;
            }
            let (Some(key), Some(vertices)) = (stream.texture(), stream.buffer()) else {
                continue;
            };
            // Stale keys belong to removed textures.
            let Some(entry) = self.textures.get(key) else {
                continue;
            };
            self.backend.draw(DrawCall {
                texture: &entry.handle,
                vertices,
                indices,
                index_count: stream.index_count() as u32,
                uses_color: stream.uses_color(),
            });
        }
    }

    // =========================================================================
    // Capture
    // =========================================================================

    /// Queue a readback of the next rendered frame. Negative `width` or
    /// `height` selects the whole viewport on that axis.
    pub fn queue_capture(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        callback_id: &str,
        output_path: &str,
    ) {
        let request = CaptureRequest::new(x, y, width, height, callback_id, output_path);
        debug!(callback_id = %request.callback_id, "queued capture");
        self.captures.queue(request);
    }

    fn process_captures(&mut self) {
        for request in self.captures.take_pending() {
            let callback = match self.capture(&request) {
                Ok(()) => {
                    debug!(path = %request.output_path, "capture written");
                    Callback::success(&request.callback_id, &request.output_path)
                }
                Err(err) => {
                    warn!(callback_id = %request.callback_id, "capture failed: {err}");
                    Callback::error(&request.callback_id, &err.to_string())
                }
            };
            self.captures.push_callback(callback);
        }
    }

    fn capture(&mut self, request: &CaptureRequest) -> Result<()> {
        let rect = request
            .resolve(self.viewport)
            .ok_or(CanvasError::EmptyCapture)?;
        let origin = self.backend.readback_origin();
        let mut pixels = self
            .backend
            .read_pixels(to_backend_rect(rect, self.viewport, origin))?;
        if pixels.len() != rect.byte_len() {
            return Err(CanvasError::Readback(format!(
                "expected {} bytes, got {}",
                rect.byte_len(),
                pixels.len()
            )));
        }
        if origin == ReadbackOrigin::BottomLeft {
            flip_rows(&mut pixels, rect.width, rect.height);
        }
        self.codec.encode_png(
            Path::new(&request.output_path),
            &pixels,
            rect.width,
            rect.height,
        )
    }

    /// Oldest undelivered callback
    pub fn next_callback(&self) -> Option<&Callback> {
        self.captures.next_callback()
    }

    pub fn pop_callback(&mut self) -> Option<Callback> {
        self.captures.pop_callback()
    }

    pub fn pending_captures(&self) -> usize {
        self.captures.pending_len()
    }

    // =========================================================================
    // Surface lifecycle
    // =========================================================================

    /// The GPU context is gone. Every handle is dropped without deletion
    /// calls and rendering stops until the next surface change.
    pub fn on_context_lost(&mut self) {
        self.context_lost = true;
        self.textures.clear();
        self.batcher.clear();
        self.index.clear();
        self.overlay.clear();
        info!("context lost, GPU state dropped");
    }

    /// Apply a new surface size. A fixed ortho size, if set, is kept.
    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
        self.apply_projection();
        self.context_lost = false;
        info!("surface changed: {}x{}", width, height);
    }

    /// Fix the projection size. Non-positive dimensions fall back to 800x600.
    pub fn set_ortho(&mut self, width: i32, height: i32) {
        let width = if width > 0 { width as u32 } else { DEFAULT_ORTHO.width };
        let height = if height > 0 { height as u32 } else { DEFAULT_ORTHO.height };
        self.ortho = Some(Viewport::new(width, height));
        self.apply_projection();
    }

    fn apply_projection(&mut self) {
        let size = self.ortho.unwrap_or(self.viewport);
        let ortho = Viewport::new(
            if size.width > 0 { size.width } else { DEFAULT_ORTHO.width },
            if size.height > 0 { size.height } else { DEFAULT_ORTHO.height },
        );
        self.backend.set_projection(self.viewport, ortho);
    }

    pub fn set_background_color(&mut self, r: f32, g: f32, b: f32) {
        self.config.background = [r, g, b];
    }

    pub fn set_debug_overlay(&mut self, enabled: bool) {
        self.config.debug_overlay = enabled;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn transform(&self) -> Transform {
        self.transform.current()
    }

    /// Unmatched saves
    pub fn transform_depth(&self) -> usize {
        self.transform.depth()
    }

    pub fn tint(&self) -> Color {
        self.tint
    }

    pub fn streams(&self) -> &[Stream<B::Buffer>] {
        self.batcher.streams()
    }

    /// Last stream slot filled by the latest frame
    pub fn active_stream(&self) -> Option<usize> {
        self.batcher.active_index()
    }

    /// Uploads performed while building the latest frame
    pub fn flush_count(&self) -> usize {
        self.batcher.flush_count()
    }

    pub fn index_buffer(&self) -> &IndexBuffer<B::Buffer> {
        &self.index
    }

    pub fn overlay(&self) -> &DebugOverlay<B::Buffer> {
        &self.overlay
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn textures(&self) -> &TextureRegistry<B::Texture> {
        &self.textures
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }
}

impl<B: RenderBackend, C: ImageCodec> Drop for Canvas<B, C> {
    fn drop(&mut self) {
        if self.context_lost {
            return;
        }
        for entry in self.textures.drain() {
            self.backend.delete_texture(entry.handle);
        }
    }
}
