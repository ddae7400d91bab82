//! Media asset metadata.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Probed metadata for a video file.
///
/// Derived once per file and never edited; extraction and composition
/// produce new assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoAsset {
    /// Location on disk
    pub path: PathBuf,
    /// Duration in seconds
    pub duration: f64,
    /// Frame rate (fps)
    pub fps: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Total number of frames
    pub frame_count: u64,
    /// Whether the container carries an audio stream
    #[serde(default)]
    pub has_audio: bool,
}

impl VideoAsset {
    /// Duration of one frame in seconds.
    pub fn frame_duration(&self) -> f64 {
        if self.fps > 0.0 {
            1.0 / self.fps
        } else {
            0.0
        }
    }

    /// Index of the last decodable frame.
    pub fn last_frame_index(&self) -> u64 {
        self.frame_count.saturating_sub(1)
    }

    /// Timestamp of a frame index.
    pub fn timestamp_of(&self, frame_index: u64) -> f64 {
        if self.fps > 0.0 {
            frame_index as f64 / self.fps
        } else {
            0.0
        }
    }

    /// Raw rgb24 frame size in bytes.
    pub fn rgb_frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// An audio file plus the gain it should be mixed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioTrack {
    /// Location on disk
    pub path: PathBuf,
    /// Duration in seconds
    pub duration: f64,
    /// Linear gain in [0, 1]
    pub gain: f32,
}

impl AudioTrack {
    pub fn new(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            path: path.into(),
            duration,
            gain: 1.0,
        }
    }

    /// Returns a copy with gain clamped into [0, 1]. NaN maps to silence.
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = if gain.is_nan() { 0.0 } else { gain.clamp(0.0, 1.0) };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> VideoAsset {
        VideoAsset {
            path: PathBuf::from("in.mp4"),
            duration: 10.0,
            fps: 30.0,
            width: 320,
            height: 240,
            frame_count: 300,
            has_audio: true,
        }
    }

    #[test]
    fn test_frame_math() {
        let a = asset();
        assert_eq!(a.last_frame_index(), 299);
        assert!((a.timestamp_of(90) - 3.0).abs() < 1e-9);
        assert!((a.frame_duration() - 1.0 / 30.0).abs() < 1e-9);
        assert_eq!(a.rgb_frame_len(), 320 * 240 * 3);
    }

    #[test]
    fn test_gain_is_clamped() {
        assert_eq!(AudioTrack::new("a.mp3", 1.0).with_gain(1.7).gain, 1.0);
        assert_eq!(AudioTrack::new("a.mp3", 1.0).with_gain(-0.2).gain, 0.0);
        assert_eq!(AudioTrack::new("a.mp3", 1.0).with_gain(f32::NAN).gain, 0.0);
        assert!((AudioTrack::new("a.mp3", 1.0).with_gain(0.15).gain - 0.15).abs() < f32::EPSILON);
    }
}
