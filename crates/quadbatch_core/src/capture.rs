//! Frame capture requests and host callbacks
//!
//! Captures are queued by the host at any time and serviced by the next
//! `render`, after all draws, in FIFO order. Each serviced request yields one
//! [`Callback`].

use std::collections::VecDeque;

use crate::backend::{PixelRect, ReadbackOrigin, Viewport};

/// Longest callback ID, path or result string kept, in bytes
pub const MAX_FIELD_LEN: usize = 511;

/// Copy `s`, truncated to [`MAX_FIELD_LEN`] bytes on a char boundary.
pub fn bounded(s: &str) -> String {
    if s.len() <= MAX_FIELD_LEN {
        return s.to_owned();
    }
    let mut end = MAX_FIELD_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_owned()
}

/// A queued framebuffer capture
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureRequest {
    pub x: i32,
    pub y: i32,
    /// Negative means the full viewport width
    pub width: i32,
    /// Negative means the full viewport height
    pub height: i32,
    pub callback_id: String,
    pub output_path: String,
}

impl CaptureRequest {
    pub fn new(x: i32, y: i32, width: i32, height: i32, callback_id: &str, output_path: &str) -> Self {
        Self {
            x,
            y,
            width,
            height,
            callback_id: bounded(callback_id),
            output_path: bounded(output_path),
        }
    }

    /// Clamp the requested rect to `viewport` in top-left coordinates. An
    /// axis that would overflow the viewport is reset to cover all of it.
    /// Returns `None` when nothing is left to read.
    pub fn resolve(&self, viewport: Viewport) -> Option<PixelRect> {
        let (x, width) = resolve_axis(self.x, self.width, viewport.width);
        let (y, height) = resolve_axis(self.y, self.height, viewport.height);
        let rect = PixelRect {
            x,
            y,
            width,
            height,
        };
        (!rect.is_empty()).then_some(rect)
    }
}

fn resolve_axis(origin: i32, extent: i32, limit: u32) -> (u32, u32) {
    let origin = origin.max(0) as u64;
    let extent = if extent < 0 { limit as u64 } else { extent as u64 };
    if origin + extent > limit as u64 {
        (0, limit)
    } else {
        (origin as u32, extent as u32)
    }
}

/// Map a top-left rect into the backend's readback coordinates.
pub fn to_backend_rect(rect: PixelRect, viewport: Viewport, origin: ReadbackOrigin) -> PixelRect {
    match origin {
        ReadbackOrigin::TopLeft => rect,
        ReadbackOrigin::BottomLeft => PixelRect {
            y: viewport.height.saturating_sub(rect.y + rect.height),
            ..rect
        },
    }
}

/// Reverse the row order of a tightly packed RGBA8 image in place.
pub fn flip_rows(pixels: &mut [u8], width: u32, height: u32) {
    let stride = width as usize * 4;
    let height = height as usize;
    if stride == 0 || pixels.len() < stride * height {
        return;
    }
    for row in 0..height / 2 {
        let (top, bottom) = pixels.split_at_mut((height - row - 1) * stride);
        top[row * stride..(row + 1) * stride].swap_with_slice(&mut bottom[..stride]);
    }
}

/// Completion notice for the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Callback {
    pub callback_id: String,
    /// Output path on success, diagnostic on failure
    pub result: String,
    pub is_error: bool,
}

impl Callback {
    pub fn success(callback_id: &str, result: &str) -> Self {
        Self {
            callback_id: bounded(callback_id),
            result: bounded(result),
            is_error: false,
        }
    }

    pub fn error(callback_id: &str, diagnostic: &str) -> Self {
        Self {
            callback_id: bounded(callback_id),
            result: bounded(diagnostic),
            is_error: true,
        }
    }
}

/// Pending captures plus completed callbacks
#[derive(Debug, Default)]
pub struct CaptureQueues {
    pending: VecDeque<CaptureRequest>,
    callbacks: VecDeque<Callback>,
}

impl CaptureQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&mut self, request: CaptureRequest) {
        self.pending.push_back(request);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Take every pending request, oldest first.
    pub fn take_pending(&mut self) -> Vec<CaptureRequest> {
        self.pending.drain(..).collect()
    }

    pub fn push_callback(&mut self, callback: Callback) {
        self.callbacks.push_back(callback);
    }

    pub fn next_callback(&self) -> Option<&Callback> {
        self.callbacks.front()
    }

    pub fn pop_callback(&mut self) -> Option<Callback> {
        self.callbacks.pop_front()
    }

    pub fn callbacks_len(&self) -> usize {
        self.callbacks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEW: Viewport = Viewport::new(100, 50);

    fn rect(x: u32, y: u32, width: u32, height: u32) -> PixelRect {
        PixelRect {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn negative_extent_means_full_viewport() {
        let request = CaptureRequest::new(-1, -1, -1, -1, "cb", "out.png");
        assert_eq!(request.resolve(VIEW), Some(rect(0, 0, 100, 50)));
    }

    #[test]
    fn in_bounds_rect_is_kept() {
        let request = CaptureRequest::new(10, 5, 20, 10, "cb", "out.png");
        assert_eq!(request.resolve(VIEW), Some(rect(10, 5, 20, 10)));
    }

    #[test]
    fn overflowing_axis_resets_to_full() {
        let request = CaptureRequest::new(90, 5, 20, 10, "cb", "out.png");
        assert_eq!(request.resolve(VIEW), Some(rect(0, 5, 100, 10)));

        let request = CaptureRequest::new(10, 45, 20, 10, "cb", "out.png");
        assert_eq!(request.resolve(VIEW), Some(rect(10, 0, 20, 50)));
    }

    #[test]
    fn zero_area_resolves_to_none() {
        let request = CaptureRequest::new(0, 0, 0, 10, "cb", "out.png");
        assert_eq!(request.resolve(VIEW), None);
        assert_eq!(
            CaptureRequest::new(0, 0, -1, -1, "cb", "out.png").resolve(Viewport::new(0, 0)),
            None
        );
    }

    #[test]
    fn bottom_left_origin_flips_y() {
        let r = rect(10, 5, 20, 10);
        assert_eq!(to_backend_rect(r, VIEW, ReadbackOrigin::TopLeft), r);
        assert_eq!(
            to_backend_rect(r, VIEW, ReadbackOrigin::BottomLeft),
            rect(10, 35, 20, 10)
        );
    }

    #[test]
    fn flip_rows_reverses_order() {
        // 1x3 image, one byte tag per row.
        let mut pixels = vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3];
        flip_rows(&mut pixels, 1, 3);
        assert_eq!(pixels, vec![3, 3, 3, 3, 2, 2, 2, 2, 1, 1, 1, 1]);
    }

    #[test]
    fn long_strings_are_truncated_on_char_boundary() {
        let long = "é".repeat(400);
        let kept = bounded(&long);
        assert!(kept.len() <= MAX_FIELD_LEN);
        assert_eq!(kept.len(), 510);
        assert!(kept.chars().all(|c| c == 'é'));
        assert_eq!(bounded("short"), "short");
    }

    #[test]
    fn queues_are_fifo() {
        let mut queues = CaptureQueues::new();
        queues.queue(CaptureRequest::new(0, 0, -1, -1, "a", "a.png"));
        queues.queue(CaptureRequest::new(0, 0, -1, -1, "b", "b.png"));
        let ids: Vec<_> = queues
            .take_pending()
            .into_iter()
            .map(|r| r.callback_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(queues.pending_len(), 0);

        queues.push_callback(Callback::success("a", "a.png"));
        queues.push_callback(Callback::error("b", "boom"));
        assert_eq!(queues.next_callback().map(|c| c.callback_id.as_str()), Some("a"));
        assert_eq!(queues.pop_callback().map(|c| c.is_error), Some(false));
        assert_eq!(queues.pop_callback().map(|c| c.is_error), Some(true));
        assert!(queues.pop_callback().is_none());
    }
}
