use std::time::Duration;
use tokio::sync::mpsc;

use super::encoder::ChunkFormat;
use crate::error::CaptureError;

/// One encoded audio segment emitted during capture.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Encoded bytes in the capture's chunk container format.
    pub bytes: Vec<u8>,
    /// Milliseconds since capture started.
    pub timestamp_ms: u64,
}

/// Configuration for a capture backend.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    /// 1 = mono, 2 = stereo
    pub channels: u16,
    /// A chunk is emitted at least this often while capturing.
    pub chunk_interval: Duration,
    /// Container formats in preference order; the first one the
    /// environment supports wins.
    pub preferred_formats: Vec<ChunkFormat>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            chunk_interval: Duration::from_millis(250),
            preferred_formats: vec![ChunkFormat::Wav, ChunkFormat::RawPcm],
        }
    }
}

/// Microphone capture backend trait
///
/// Implementations:
/// - `CpalMicrophone`: live input device via cpal
/// - `ScriptedCapture`: predefined sample batches (tests/offline use)
#[async_trait::async_trait]
pub trait MicrophoneCapture: Send {
    /// Request exclusive device access and start emitting chunks.
    ///
    /// Returns a channel receiver for the encoded chunks. The receiver
    /// closes after the final flush once `close()` is called, or early
    /// on a mid-capture device failure.
    async fn open(
        &mut self,
        config: &CaptureConfig,
    ) -> Result<mpsc::Receiver<AudioChunk>, CaptureError>;

    /// Flush the final pending chunk and release the device. Idempotent.
    async fn close(&mut self) -> Result<(), CaptureError>;

    /// Whether the device is currently held.
    fn is_capturing(&self) -> bool;

    /// MIME type of the chunks produced by the active format.
    fn mime_type(&self) -> &'static str;
}

/// Capture source type
pub enum CaptureSource {
    /// Live microphone input
    Microphone,
    /// Predefined sample batches, one chunk each
    Scripted(Vec<Vec<i16>>),
}

/// Capture backend factory
pub struct CaptureFactory;

impl CaptureFactory {
    pub fn create(source: CaptureSource) -> Box<dyn MicrophoneCapture> {
        match source {
            CaptureSource::Microphone => Box::new(super::mic::CpalMicrophone::new()),
            CaptureSource::Scripted(batches) => {
                Box::new(super::scripted::ScriptedCapture::new(batches))
            }
        }
    }
}
