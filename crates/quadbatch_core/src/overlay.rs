//! Debug text overlay
//!
//! Renders one line of ASCII text with a bitmap font texture laid out as a
//! 16x8 grid of glyphs starting at space (32). The overlay has its own stream
//! and is drawn after every command stream, untransformed and untinted.

use crate::backend::RenderBackend;
use crate::quad::{Color, Quad, Vertex};
use crate::stream::Stream;
use crate::texture::TextureKey;

const GLYPH_COLUMNS: u32 = 16;
const GLYPH_ROWS: u32 = 8;
const FIRST_GLYPH: u8 = 32;

const ORIGIN: [f32; 2] = [10.0, 10.0];
const ADVANCE: f32 = 24.0;
const GLYPH_SIZE: f32 = 30.0;

/// Overlay text stream
#[derive(Debug)]
pub struct DebugOverlay<B> {
    stream: Stream<B>,
    scratch: Vec<Vertex>,
}

impl<B> Default for DebugOverlay<B> {
    fn default() -> Self {
        Self {
            stream: Stream::default(),
            scratch: Vec::new(),
        }
    }
}

impl<B> DebugOverlay<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(&self) -> &Stream<B> {
        &self.stream
    }

    /// Lay out `text` and upload it. Without a font the overlay is cleared.
    pub fn update<R>(&mut self, backend: &mut R, font: Option<TextureKey>, text: &str)
    where
        R: RenderBackend<Buffer = B>,
    {
        let Some(font) = font else {
            self.stream.reset();
            return;
        };

        self.scratch.clear();
        for (i, byte) in text.bytes().enumerate() {
            let quad = glyph_quad(i, byte);
            self.scratch.extend_from_slice(&quad.vertices);
        }

        self.stream.assign(font);
        if self.scratch.is_empty() {
            return;
        }
        self.stream.upload(backend, &self.scratch);
    }

    /// Detach from `font` if it is the texture in use.
    pub fn invalidate(&mut self, font: TextureKey) {
        if self.stream.texture() == Some(font) {
            self.stream.reset();
        }
    }

    /// Drop the stream without telling the backend.
    pub fn clear(&mut self) {
        self.stream = Stream::default();
        self.scratch.clear();
    }
}

fn glyph_quad(position: usize, byte: u8) -> Quad {
    let glyph = byte.wrapping_sub(FIRST_GLYPH) as u32 % (GLYPH_COLUMNS * GLYPH_ROWS);
    let u = (glyph % GLYPH_COLUMNS) as f32 / GLYPH_COLUMNS as f32;
    let v = (glyph / GLYPH_COLUMNS) as f32 / GLYPH_ROWS as f32;
    let du = 1.0 / GLYPH_COLUMNS as f32;
    let dv = 1.0 / GLYPH_ROWS as f32;

    let x = ORIGIN[0] + ADVANCE * position as f32;
    let y = ORIGIN[1];
    let color = Color::WHITE.to_array();
    let corner = |px: f32, py: f32, tu: f32, tv: f32| Vertex {
        position: [px, py],
        tex_coords: [tu, tv],
        color,
    };

    Quad {
        vertices: [
            corner(x, y, u, v),
            corner(x + GLYPH_SIZE, y, u + du, v),
            corner(x + GLYPH_SIZE, y + GLYPH_SIZE, u + du, v + dv),
            corner(x, y + GLYPH_SIZE, u, v + dv),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingBackend;
    use slotmap::SlotMap;

    #[test]
    fn glyph_cell_lookup() {
        // 'A' is 65 -> glyph 33 -> column 1, row 2
        let quad = glyph_quad(0, b'A');
        assert_eq!(quad.vertices[0].tex_coords, [1.0 / 16.0, 2.0 / 8.0]);
        assert_eq!(quad.vertices[0].position, [10.0, 10.0]);
        assert_eq!(quad.vertices[2].position, [40.0, 40.0]);

        let second = glyph_quad(1, b' ');
        assert_eq!(second.vertices[0].position, [34.0, 10.0]);
        assert_eq!(second.vertices[0].tex_coords, [0.0, 0.0]);
    }

    #[test]
    fn update_uploads_one_quad_per_byte() {
        let mut fonts: SlotMap<TextureKey, ()> = SlotMap::with_key();
        let font = fonts.insert(());
        let mut backend = RecordingBackend::new(64, 64);
        let mut overlay = DebugOverlay::new();

        overlay.update(&mut backend, Some(font), "60 [60]");
        assert_eq!(overlay.stream().quad_count(), 7);
        assert!(overlay.stream().is_drawable());
        assert!(!overlay.stream().uses_color());

        overlay.update(&mut backend, None, "60 [60]");
        assert!(!overlay.stream().is_drawable());
    }
}
