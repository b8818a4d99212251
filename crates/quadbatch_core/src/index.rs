//! Shared quad index buffer
//!
//! Every stream draws quads with the same index pattern, so one buffer sized
//! for the largest stream serves all of them.

use crate::backend::RenderBackend;

/// Indices of one quad, offset by `4 * quad`
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 3, 2];

/// Grow-only index buffer
#[derive(Debug)]
pub struct IndexBuffer<B> {
    indices: Vec<u32>,
    buffer: Option<B>,
}

impl<B> Default for IndexBuffer<B> {
    fn default() -> Self {
        Self {
            indices: Vec::new(),
            buffer: None,
        }
    }
}

impl<B> IndexBuffer<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn buffer(&self) -> Option<&B> {
        self.buffer.as_ref()
    }

    /// Make sure at least `count` indices exist. `count` should be a
    /// multiple of 6; other values are rounded up to the next quad.
    pub fn ensure<R>(&mut self, backend: &mut R, count: usize)
    where
        R: RenderBackend<Buffer = B>,
    {
        debug_assert!(count % 6 == 0, "index count {count} is not a whole number of quads");
        let count = count.div_ceil(6) * 6;
        if count <= self.indices.len() {
            return;
        }

        let start_quad = self.indices.len() / 6;
        let quads = count / 6;
        self.indices.reserve(count - self.indices.len());
        for quad in start_quad..quads {
            let base = quad as u32 * 4;
            self.indices.extend(QUAD_INDICES.iter().map(|i| i + base));
        }

        let previous = self.buffer.take();
        self.buffer = Some(backend.allocate_index_buffer(previous, &self.indices));
        tracing::trace!(count, "grew shared index buffer");
    }

    /// Forget the buffer and pattern without telling the backend.
    pub fn clear(&mut self) {
        self.indices.clear();
        self.buffer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BackendCall, RecordingBackend};

    #[test]
    fn pattern_is_offset_per_quad() {
        let mut backend = RecordingBackend::new(1, 1);
        let mut index = IndexBuffer::new();
        index.ensure(&mut backend, 12);
        assert_eq!(index.indices(), &[0, 1, 2, 0, 3, 2, 4, 5, 6, 4, 7, 6]);
    }

    #[test]
    fn grows_but_never_shrinks() {
        let mut backend = RecordingBackend::new(1, 1);
        let mut index = IndexBuffer::new();

        index.ensure(&mut backend, 18);
        index.ensure(&mut backend, 6);
        index.ensure(&mut backend, 0);
        assert_eq!(index.len(), 18);
        assert_eq!(
            backend.count(|c| matches!(c, BackendCall::AllocateIndexBuffer { .. })),
            1
        );

        index.ensure(&mut backend, 24);
        assert_eq!(index.len(), 24);
        assert_eq!(&index.indices()[18..], &[12, 13, 14, 12, 15, 14]);
        assert!(matches!(
            backend.calls().last(),
            Some(BackendCall::AllocateIndexBuffer { count: 24 })
        ));
    }

    #[test]
    fn zero_needs_no_buffer() {
        let mut backend = RecordingBackend::new(1, 1);
        let mut index = IndexBuffer::new();
        index.ensure(&mut backend, 0);
        assert!(index.buffer().is_none());
        assert!(backend.calls().is_empty());
    }
}
