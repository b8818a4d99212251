//! Frame rate and command throughput sampling

use std::time::{Duration, Instant};

/// Rolling frame statistics, recomputed every `window` frames
#[derive(Clone, Debug)]
pub struct FrameStats {
    window: u32,
    frames: u32,
    messages: u32,
    bytes: u64,
    window_start: Instant,
    total_frames: u64,
    fps: f32,
    messages_per_sec: f32,
    bytes_per_sec: f32,
}

impl FrameStats {
    pub fn new(window: u32) -> Self {
        Self::starting_at(window, Instant::now())
    }

    pub fn starting_at(window: u32, start: Instant) -> Self {
        Self {
            window: window.max(1),
            frames: 0,
            messages: 0,
            bytes: 0,
            window_start: start,
            total_frames: 0,
            fps: 0.0,
            messages_per_sec: 0.0,
            bytes_per_sec: 0.0,
        }
    }

    /// Count one non-empty command buffer of `len` bytes.
    pub fn record_message(&mut self, len: usize) {
        self.messages += 1;
        self.bytes += len as u64;
    }

    pub fn record_frame(&mut self) {
        self.record_frame_at(Instant::now());
    }

    pub fn record_frame_at(&mut self, now: Instant) {
        self.frames += 1;
        self.total_frames += 1;
        if self.frames < self.window {
            return;
        }

        let elapsed = now.saturating_duration_since(self.window_start);
        // A zero-length window keeps the previous sample.
        if elapsed > Duration::ZERO {
            let secs = elapsed.as_secs_f64();
            self.fps = (self.frames as f64 / secs) as f32;
            self.messages_per_sec = (self.messages as f64 / secs) as f32;
            self.bytes_per_sec = (self.bytes as f64 / secs) as f32;
        }

        self.frames = 0;
        self.messages = 0;
        self.bytes = 0;
        self.window_start = now;
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn messages_per_sec(&self) -> f32 {
        self.messages_per_sec
    }

    pub fn bytes_per_sec(&self) -> f32 {
        self.bytes_per_sec
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// `"{fps} [{mps}] dc={draws} kbps={kbps} quads={quads}"`
    pub fn summary(&self, draw_calls: usize, quads: usize) -> String {
        format!(
            "{} [{}] dc={} kbps={} quads={}",
            (self.fps + 0.5) as i32,
            (self.messages_per_sec + 0.5) as i32,
            draw_calls,
            self.bytes_per_sec as i64 / 1024,
            quads
        )
    }
}
