//! Quad geometry
//!
//! Turns a source clip and destination rectangle into four vertices in the
//! order top-left, top-right, bottom-right, bottom-left. Positions are
//! floor-snapped to whole target pixels.

use bytemuck::{Pod, Zeroable};

use crate::transform::Transform;

/// RGBA8 color
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque white leaves texels unchanged, so the color attribute can be
    /// skipped for streams that only ever see it.
    pub fn is_white(&self) -> bool {
        *self == Self::WHITE
    }

    /// Replace alpha from a `0.0..=1.0` float, rounded to the nearest step.
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A single quad corner as uploaded to the GPU
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
    pub color: [u8; 4],
}

impl Vertex {
    pub const SIZE: usize = std::mem::size_of::<Vertex>();
}

/// Source and destination rectangles of one draw
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Clip {
    pub texture_id: i32,
    /// Source rect in texture pixels
    pub cx: f32,
    pub cy: f32,
    pub cw: f32,
    pub ch: f32,
    /// Destination rect in local units
    pub px: f32,
    pub py: f32,
    pub pw: f32,
    pub ph: f32,
}

/// Four vertices of one textured rectangle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub vertices: [Vertex; 4],
}

impl Quad {
    pub const VERTEX_COUNT: usize = 4;
    pub const INDEX_COUNT: usize = 6;

    /// Build the quad for `clip` drawn from a `texture_width` x
    /// `texture_height` texture under `transform`, tinted with `tint`.
    pub fn new(
        clip: &Clip,
        texture_width: u32,
        texture_height: u32,
        transform: &Transform,
        tint: Color,
    ) -> Self {
        let corners = [
            (clip.px, clip.py),
            (clip.px + clip.pw, clip.py),
            (clip.px + clip.pw, clip.py + clip.ph),
            (clip.px, clip.py + clip.ph),
        ];

        let w = texture_width.max(1) as f32;
        let h = texture_height.max(1) as f32;
        let u0 = clip.cx / w;
        let v0 = clip.cy / h;
        let u1 = (clip.cx + clip.cw) / w;
        let v1 = (clip.cy + clip.ch) / h;
        let uvs = [[u0, v0], [u1, v0], [u1, v1], [u0, v1]];

        let color = tint.to_array();
        let vertices = std::array::from_fn(|i| {
            let (x, y) = transform.transform_point(corners[i].0, corners[i].1);
            Vertex {
                position: [x.floor(), y.floor()],
                tex_coords: uvs[i],
                color,
            }
        });

        Self { vertices }
    }

    /// Axis-aligned bounds of the snapped positions as `(min, max)`.
    pub fn bounds(&self) -> ([f32; 2], [f32; 2]) {
        let mut min = [f32::INFINITY; 2];
        let mut max = [f32::NEG_INFINITY; 2];
        for v in &self.vertices {
            for axis in 0..2 {
                min[axis] = min[axis].min(v.position[axis]);
                max[axis] = max[axis].max(v.position[axis]);
            }
        }
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_packed() {
        assert_eq!(Vertex::SIZE, 20);
    }

    #[test]
    fn identity_quad_covers_destination() {
        let clip = Clip {
            texture_id: 5,
            cw: 16.0,
            ch: 16.0,
            pw: 32.0,
            ph: 32.0,
            ..Default::default()
        };
        let quad = Quad::new(&clip, 16, 16, &Transform::IDENTITY, Color::WHITE);

        let positions: Vec<_> = quad.vertices.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![[0.0, 0.0], [32.0, 0.0], [32.0, 32.0], [0.0, 32.0]]
        );
        let uvs: Vec<_> = quad.vertices.iter().map(|v| v.tex_coords).collect();
        assert_eq!(uvs, vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
    }

    #[test]
    fn positions_are_floored() {
        let clip = Clip {
            pw: 1.0,
            ph: 1.0,
            ..Default::default()
        };
        let transform = Transform::translation(9.6, -0.4);
        let quad = Quad::new(&clip, 1, 1, &transform, Color::WHITE);
        assert_eq!(quad.vertices[0].position, [9.0, -1.0]);
        assert_eq!(quad.vertices[2].position, [10.0, 0.0]);
    }

    #[test]
    fn sub_rect_texture_coordinates() {
        let clip = Clip {
            cx: 8.0,
            cy: 4.0,
            cw: 8.0,
            ch: 4.0,
            pw: 8.0,
            ph: 4.0,
            ..Default::default()
        };
        let quad = Quad::new(&clip, 16, 16, &Transform::IDENTITY, Color::WHITE);
        assert_eq!(quad.vertices[0].tex_coords, [0.5, 0.25]);
        assert_eq!(quad.vertices[2].tex_coords, [1.0, 0.5]);
    }

    #[test]
    fn tint_is_copied_to_every_vertex() {
        let tint = Color::WHITE.with_alpha(0.5);
        assert_eq!(tint.a, 128);
        let quad = Quad::new(&Clip::default(), 1, 1, &Transform::IDENTITY, tint);
        assert!(quad.vertices.iter().all(|v| v.color == [255, 255, 255, 128]));
    }

    #[test]
    fn alpha_is_clamped() {
        assert_eq!(Color::WHITE.with_alpha(2.0).a, 255);
        assert_eq!(Color::WHITE.with_alpha(-1.0).a, 0);
        assert!(!Color::WHITE.with_alpha(0.0).is_white());
    }

    #[test]
    fn bounds_of_scaled_quad() {
        let clip = Clip {
            pw: 4.0,
            ph: 2.0,
            ..Default::default()
        };
        let quad = Quad::new(&clip, 1, 1, &Transform::scale(2.0, 3.0), Color::WHITE);
        assert_eq!(quad.bounds(), ([0.0, 0.0], [8.0, 6.0]));
    }
}
