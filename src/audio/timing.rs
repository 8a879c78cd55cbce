// Audio timing - the output stream's frame counter used as the audio clock

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared frame position of the output stream
#[derive(Clone)]
pub struct AudioTiming {
    /// Frames rendered so far (incremented by the audio callback)
    frame_position: Arc<AtomicU64>,
    sample_rate: f64,
}

impl AudioTiming {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            frame_position: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate as f64,
        }
    }

    /// Frames rendered so far (called from the control thread)
    pub fn current_frame(&self) -> u64 {
        self.frame_position.load(Ordering::Relaxed)
    }

    /// Advance the position (called from the audio callback)
    pub fn advance(&self, frames: usize) {
        self.frame_position
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    /// Audio clock time in seconds
    pub fn seconds(&self) -> f64 {
        self.frames_to_seconds(self.current_frame())
    }

    /// Frame at which an audio-clock time falls; negative times map to 0
    pub fn seconds_to_frames(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate).round() as u64
    }

    pub fn frames_to_seconds(&self, frames: u64) -> f64 {
        frames as f64 / self.sample_rate
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate as f32
    }
}
