//! Frame schedule: maps frame indices onto animation timeline offsets.

use crate::{Error, Result};

/// A single frame of the schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Zero-based frame index
    pub index: u64,
    /// Timeline position in milliseconds (`index * 1000 / frame_rate`)
    pub offset_ms: f64,
}

/// Fixed-rate frame schedule for one render.
///
/// The total frame count is decided up front and never changes while
/// frames are captured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSchedule {
    frame_rate: u32,
    total_frames: u64,
}

impl FrameSchedule {
    /// Build a schedule of `round(frame_rate * duration_secs)` frames.
    pub fn new(frame_rate: u32, duration_secs: f64) -> Result<Self> {
        if frame_rate == 0 {
            return Err(Error::ConfigError("frame rate must be positive".into()));
        }
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(Error::ConfigError(format!(
                "duration must be a positive number of seconds, got {}",
                duration_secs
            )));
        }

        let total_frames = (f64::from(frame_rate) * duration_secs).round() as u64;
        Ok(Self { frame_rate, total_frames })
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Milliseconds between two consecutive frames
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / f64::from(self.frame_rate)
    }

    /// Timeline offset of `index` in milliseconds
    pub fn offset_ms(&self, index: u64) -> f64 {
        index as f64 * self.frame_interval_ms()
    }

    /// Every frame of the schedule, in increasing index order.
    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        (0..self.total_frames).map(move |index| Frame {
            index,
            offset_ms: self.offset_ms(index),
        })
    }
}
