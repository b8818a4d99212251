//! Per-texture quad batching
//!
//! A frame is turned into an ordered list of [`Stream`]s, one per run of
//! consecutive draws that share a texture. Streams are kept by slot position
//! between frames so their vertex buffers survive: slot `n` of the next frame
//! reuses the buffer of slot `n` of this one, whatever texture it ends up
//! holding.
//!
//! When the texture changes the batcher always advances to the next slot,
//! so a sequence `A, B, A` produces three streams and three uploads. Draw
//! order is therefore exactly command order.

use crate::backend::RenderBackend;
use crate::quad::{Quad, Vertex};
use crate::texture::TextureKey;

/// One batch of same-texture quads and its vertex buffer
#[derive(Debug)]
pub struct Stream<B> {
    texture: Option<TextureKey>,
    buffer: Option<B>,
    capacity: usize,
    vertex_count: usize,
    uses_color: bool,
}

impl<B> Default for Stream<B> {
    fn default() -> Self {
        Self {
            texture: None,
            buffer: None,
            capacity: 0,
            vertex_count: 0,
            uses_color: false,
        }
    }
}

impl<B> Stream<B> {
    pub fn texture(&self) -> Option<TextureKey> {
        self.texture
    }

    pub fn buffer(&self) -> Option<&B> {
        self.buffer.as_ref()
    }

    /// Vertices the GPU buffer can hold
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.vertex_count * Quad::INDEX_COUNT / Quad::VERTEX_COUNT
    }

    pub fn quad_count(&self) -> usize {
        self.vertex_count / Quad::VERTEX_COUNT
    }

    /// Whether any vertex in this batch is tinted
    pub fn uses_color(&self) -> bool {
        self.uses_color
    }

    /// Has a texture, an uploaded buffer and at least one quad.
    pub fn is_drawable(&self) -> bool {
        self.texture.is_some() && self.buffer.is_some() && self.vertex_count > 0
    }

    pub(crate) fn assign(&mut self, texture: TextureKey) {
        self.texture = Some(texture);
        self.vertex_count = 0;
        self.uses_color = false;
    }

    pub(crate) fn mark_colored(&mut self) {
        self.uses_color = true;
    }

    /// Forget the texture but keep the buffer for reuse.
    pub fn reset(&mut self) {
        self.texture = None;
        self.vertex_count = 0;
        self.uses_color = false;
    }

    /// Upload `vertices`, growing the buffer only when it is too small.
    pub fn upload<R>(&mut self, backend: &mut R, vertices: &[Vertex])
    where
        R: RenderBackend<Buffer = B>,
    {
        let count = vertices.len();
        match self.buffer.take() {
            Some(buffer) if count <= self.capacity => {
                backend.write_vertex_buffer(&buffer, vertices);
                self.buffer = Some(buffer);
            }
            previous => {
                self.buffer = Some(backend.allocate_vertex_buffer(previous, vertices));
                self.capacity = count;
            }
        }
        self.vertex_count = count;
    }
}

/// Builds streams from a sequence of quads
#[derive(Debug)]
pub struct StreamBatcher<B> {
    streams: Vec<Stream<B>>,
    active: Option<usize>,
    scratch: Vec<Vertex>,
    flushes: usize,
}

impl<B> Default for StreamBatcher<B> {
    fn default() -> Self {
        Self {
            streams: Vec::new(),
            active: None,
            scratch: Vec::new(),
            flushes: 0,
        }
    }
}

impl<B> StreamBatcher<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn streams(&self) -> &[Stream<B>] {
        &self.streams
    }

    /// Slot receiving quads, or the last one used once the frame is finished
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Streams filled so far in the current frame
    pub fn used(&self) -> usize {
        self.active.map_or(0, |index| index + 1)
    }

    /// Uploads performed since `begin_frame`
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Largest index count any stream needs this frame
    pub fn max_index_count(&self) -> usize {
        self.streams
            .iter()
            .filter(|s| s.texture.is_some())
            .map(Stream::index_count)
            .max()
            .unwrap_or(0)
    }

    /// Quads held by streams that have a texture
    pub fn quad_count(&self) -> usize {
        self.streams
            .iter()
            .filter(|s| s.texture.is_some())
            .map(Stream::quad_count)
            .sum()
    }

    /// Detach every stream from its texture and start a new frame.
    pub fn begin_frame(&mut self) {
        for stream in &mut self.streams {
            stream.reset();
        }
        self.scratch.clear();
        self.active = None;
        self.flushes = 0;
    }

    /// Append a quad drawn from `texture`.
    pub fn push_quad<R>(&mut self, backend: &mut R, texture: TextureKey, quad: &Quad, tinted: bool)
    where
        R: RenderBackend<Buffer = B>,
    {
        let same_texture = self
            .active
            .is_some_and(|index| self.streams[index].texture == Some(texture));

        if !same_texture {
            self.flush(backend);
            let next = self.active.map_or(0, |index| index + 1);
            if next == self.streams.len() {
                self.streams.push(Stream::default());
            }
            self.streams[next].assign(texture);
            self.scratch.clear();
            self.active = Some(next);
        }

        self.scratch.extend_from_slice(&quad.vertices);
        if tinted {
            if let Some(index) = self.active {
                self.streams[index].mark_colored();
            }
        }
    }

    /// Upload the active stream. Call once after the last quad of a frame.
    pub fn finish<R>(&mut self, backend: &mut R)
    where
        R: RenderBackend<Buffer = B>,
    {
        self.flush(backend);
        self.scratch.clear();
    }

    fn flush<R>(&mut self, backend: &mut R)
    where
        R: RenderBackend<Buffer = B>,
    {
        let Some(index) = self.active else {
            return;
        };
        if self.scratch.is_empty() {
            return;
        }
        self.streams[index].upload(backend, &self.scratch);
        self.flushes += 1;
    }

    /// Reset every stream drawing from `texture`. Returns how many were reset.
    pub fn invalidate(&mut self, texture: TextureKey) -> usize {
        let mut reset = 0;
        for stream in self
            .streams
            .iter_mut()
            .filter(|s| s.texture == Some(texture))
        {
            stream.reset();
            reset += 1;
        }
        reset
    }

    /// Drop every stream and buffer without telling the backend.
    pub fn clear(&mut self) {
        self.streams.clear();
        self.scratch.clear();
        self.active = None;
        self.flushes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quad::{Clip, Color};
    use crate::testing::{BackendCall, RecordingBackend};
    use crate::transform::Transform;
    use slotmap::SlotMap;

    fn keys(n: usize) -> Vec<TextureKey> {
        let mut map: SlotMap<TextureKey, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    fn quad(x: f32) -> Quad {
        let clip = Clip {
            px: x,
            pw: 1.0,
            ph: 1.0,
            cw: 1.0,
            ch: 1.0,
            ..Default::default()
        };
        Quad::new(&clip, 1, 1, &Transform::IDENTITY, Color::WHITE)
    }

    #[test]
    fn same_texture_appends_to_one_stream() {
        let k = keys(1);
        let mut backend = RecordingBackend::new(64, 64);
        let mut batcher = StreamBatcher::new();

        batcher.begin_frame();
        batcher.push_quad(&mut backend, k[0], &quad(0.0), false);
        batcher.push_quad(&mut backend, k[0], &quad(1.0), false);
        batcher.push_quad(&mut backend, k[0], &quad(2.0), false);
        batcher.finish(&mut backend);

        assert_eq!(batcher.used(), 1);
        assert_eq!(batcher.flush_count(), 1);
        assert_eq!(batcher.streams()[0].vertex_count(), 12);
        assert_eq!(batcher.streams()[0].index_count(), 18);
    }

    #[test]
    fn a_b_a_takes_three_slots() {
        let k = keys(2);
        let mut backend = RecordingBackend::new(64, 64);
        let mut batcher = StreamBatcher::new();

        batcher.begin_frame();
        batcher.push_quad(&mut backend, k[0], &quad(0.0), false);
        batcher.push_quad(&mut backend, k[1], &quad(1.0), false);
        batcher.push_quad(&mut backend, k[0], &quad(2.0), false);
        batcher.finish(&mut backend);

        assert_eq!(batcher.flush_count(), 3);
        assert_eq!(batcher.streams().len(), 3);
        let textures: Vec<_> = batcher.streams().iter().map(|s| s.texture()).collect();
        assert_eq!(textures, vec![Some(k[0]), Some(k[1]), Some(k[0])]);
    }

    #[test]
    fn slots_are_reused_across_frames() {
        let k = keys(2);
        let mut backend = RecordingBackend::new(64, 64);
        let mut batcher = StreamBatcher::new();

        batcher.begin_frame();
        batcher.push_quad(&mut backend, k[0], &quad(0.0), false);
        batcher.push_quad(&mut backend, k[1], &quad(0.0), false);
        batcher.finish(&mut backend);
        let allocations = backend.count(|c| matches!(c, BackendCall::AllocateVertexBuffer { .. }));
        assert_eq!(allocations, 2);

        // Swap the textures: both slots keep their buffers.
        batcher.begin_frame();
        batcher.push_quad(&mut backend, k[1], &quad(0.0), false);
        batcher.push_quad(&mut backend, k[0], &quad(0.0), false);
        batcher.finish(&mut backend);

        let allocations = backend.count(|c| matches!(c, BackendCall::AllocateVertexBuffer { .. }));
        let writes = backend.count(|c| matches!(c, BackendCall::WriteVertexBuffer { .. }));
        assert_eq!(allocations, 2);
        assert_eq!(writes, 2);
        assert_eq!(batcher.streams()[0].texture(), Some(k[1]));
    }

    #[test]
    fn capacity_never_shrinks() {
        let k = keys(1);
        let mut backend = RecordingBackend::new(64, 64);
        let mut batcher = StreamBatcher::new();

        batcher.begin_frame();
        for i in 0..3 {
            batcher.push_quad(&mut backend, k[0], &quad(i as f32), false);
        }
        batcher.finish(&mut backend);
        assert_eq!(batcher.streams()[0].capacity(), 12);

        batcher.begin_frame();
        batcher.push_quad(&mut backend, k[0], &quad(0.0), false);
        batcher.finish(&mut backend);
        assert_eq!(batcher.streams()[0].capacity(), 12);
        assert_eq!(batcher.streams()[0].vertex_count(), 4);
        assert!(matches!(
            backend.calls().last(),
            Some(BackendCall::WriteVertexBuffer { count: 4, .. })
        ));

        batcher.begin_frame();
        for i in 0..5 {
            batcher.push_quad(&mut backend, k[0], &quad(i as f32), false);
        }
        batcher.finish(&mut backend);
        assert_eq!(batcher.streams()[0].capacity(), 20);
    }

    #[test]
    fn unused_slots_keep_buffers_but_lose_texture() {
        let k = keys(2);
        let mut backend = RecordingBackend::new(64, 64);
        let mut batcher = StreamBatcher::new();

        batcher.begin_frame();
        batcher.push_quad(&mut backend, k[0], &quad(0.0), false);
        batcher.push_quad(&mut backend, k[1], &quad(0.0), false);
        batcher.finish(&mut backend);

        batcher.begin_frame();
        batcher.push_quad(&mut backend, k[0], &quad(0.0), false);
        batcher.finish(&mut backend);

        let second = &batcher.streams()[1];
        assert!(second.texture().is_none());
        assert!(second.buffer().is_some());
        assert!(!second.is_drawable());
    }

    #[test]
    fn tint_flag_is_per_stream() {
        let k = keys(2);
        let mut backend = RecordingBackend::new(64, 64);
        let mut batcher = StreamBatcher::new();

        batcher.begin_frame();
        batcher.push_quad(&mut backend, k[0], &quad(0.0), false);
        batcher.push_quad(&mut backend, k[1], &quad(0.0), true);
        batcher.finish(&mut backend);

        assert!(!batcher.streams()[0].uses_color());
        assert!(batcher.streams()[1].uses_color());

        batcher.begin_frame();
        assert!(!batcher.streams()[1].uses_color());
    }

    #[test]
    fn invalidate_resets_matching_streams() {
        let k = keys(2);
        let mut backend = RecordingBackend::new(64, 64);
        let mut batcher = StreamBatcher::new();

        batcher.begin_frame();
        batcher.push_quad(&mut backend, k[0], &quad(0.0), false);
        batcher.push_quad(&mut backend, k[1], &quad(0.0), false);
        batcher.push_quad(&mut backend, k[0], &quad(0.0), false);
        batcher.finish(&mut backend);

        assert_eq!(batcher.invalidate(k[0]), 2);
        assert!(batcher.streams()[0].texture().is_none());
        assert_eq!(batcher.streams()[1].texture(), Some(k[1]));
        assert!(batcher.streams()[2].texture().is_none());
    }

    #[test]
    fn clear_drops_everything_silently() {
        let k = keys(1);
        let mut backend = RecordingBackend::new(64, 64);
        let mut batcher = StreamBatcher::new();

        batcher.begin_frame();
        batcher.push_quad(&mut backend, k[0], &quad(0.0), false);
        batcher.finish(&mut backend);
        let calls = backend.calls().len();

        batcher.clear();
        assert!(batcher.streams().is_empty());
        assert_eq!(backend.calls().len(), calls);
    }
}
