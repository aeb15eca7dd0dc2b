use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub audio: AudioConfig,
    pub streaming: StreamingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend, e.g. "https://api.example.com/v1".
    /// The streaming endpoint and all REST paths are derived from it.
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Cadence at which the capture layer emits encoded chunks.
    pub chunk_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamingConfig {
    /// Delay between stop request and hard device stop, so the final
    /// buffered chunk is not lost.
    pub stop_grace_ms: u64,
    /// Delay between the `recording_end` control frame and socket close.
    pub drain_delay_ms: u64,
    /// How long to wait for the server's `completed` status before
    /// giving up on the session.
    pub completion_timeout_secs: u64,
    /// Cap on audio buffered while the channel is still connecting.
    pub max_buffered_bytes: usize,
}

impl Config {
    /// Load configuration: built-in defaults, then an optional config
    /// file, then SPEAKSET-prefixed environment overrides
    /// (e.g. SPEAKSET__API__BASE_URL).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("api.base_url", "http://localhost:8000")?
            .set_default("audio.sample_rate", 16000i64)?
            .set_default("audio.channels", 1i64)?
            .set_default("audio.chunk_interval_ms", 250i64)?
            .set_default("streaming.stop_grace_ms", 100i64)?
            .set_default("streaming.drain_delay_ms", 500i64)?
            .set_default("streaming.completion_timeout_secs", 60i64)?
            .set_default("streaming.max_buffered_bytes", 64i64 * 1024 * 1024)?;

        builder = match path {
            Some(p) => builder.add_source(config::File::with_name(p)),
            None => builder.add_source(config::File::with_name("config/speakset").required(false)),
        };

        builder = builder.add_source(config::Environment::with_prefix("SPEAKSET").separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn chunk_interval(&self) -> Duration {
        Duration::from_millis(self.audio.chunk_interval_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.streaming.stop_grace_ms)
    }

    pub fn drain_delay(&self) -> Duration {
        Duration::from_millis(self.streaming.drain_delay_ms)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.streaming.completion_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
            },
            audio: AudioConfig {
                sample_rate: 16000,
                channels: 1,
                chunk_interval_ms: 250,
            },
            streaming: StreamingConfig {
                stop_grace_ms: 100,
                drain_delay_ms: 500,
                completion_timeout_secs: 60,
                max_buffered_bytes: 64 * 1024 * 1024,
            },
        }
    }
}
