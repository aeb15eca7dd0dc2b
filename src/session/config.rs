use std::time::Duration;

use crate::capture::{CaptureConfig, ChunkFormat};
use crate::config::Config;

/// Configuration for a recording session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique identifier for this recording attempt.
    pub recording_id: String,

    pub sample_rate: u32,

    /// 1 = mono, 2 = stereo
    pub channels: u16,

    /// Cadence of chunk emission during capture.
    pub chunk_interval: Duration,

    /// Delay between the stop request and the hard device stop, so the
    /// in-flight final chunk is not lost.
    pub stop_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recording_id: format!("recording-{}", uuid::Uuid::new_v4()),
            sample_rate: 16000,
            channels: 1,
            chunk_interval: Duration::from_millis(250),
            stop_grace: Duration::from_millis(100),
        }
    }
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
            chunk_interval: config.chunk_interval(),
            stop_grace: config.stop_grace(),
            ..Self::default()
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            chunk_interval: self.chunk_interval,
            preferred_formats: vec![ChunkFormat::Wav, ChunkFormat::RawPcm],
        }
    }
}
