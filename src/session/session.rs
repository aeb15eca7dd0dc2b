use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::artifact::{assemble, RecordingArtifact};
use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::capture::{AudioChunk, ChunkFormat, MicrophoneCapture};
use crate::error::{CaptureError, RecordError};

/// Recording lifecycle state.
///
/// Idle -> Recording -> Stopped | Cancelled. A fresh `start()` from a
/// terminal state begins a new attempt; nothing else leaves a terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Recording,
    Stopped,
    Cancelled,
}

/// One recording attempt: owns the capture device between start and
/// stop/cancel, stores chunks append-only while Recording, and
/// assembles the final artifact on stop.
pub struct RecordingSession {
    config: SessionConfig,
    capture: Box<dyn MicrophoneCapture>,
    state: SessionState,
    chunks: Arc<Mutex<Vec<AudioChunk>>>,
    chunk_format: ChunkFormat,
    started_at: Option<DateTime<Utc>>,
    artifact: Option<RecordingArtifact>,
    pump: Option<JoinHandle<()>>,
}

impl RecordingSession {
    pub fn new(config: SessionConfig, capture: Box<dyn MicrophoneCapture>) -> Self {
        Self {
            config,
            capture,
            state: SessionState::Idle,
            chunks: Arc::new(Mutex::new(Vec::new())),
            chunk_format: ChunkFormat::Wav,
            started_at: None,
            artifact: None,
            pump: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// MIME type of the chunks produced by the current attempt.
    pub fn mime_type(&self) -> &'static str {
        self.capture.mime_type()
    }

    /// Begin a new attempt. Valid from Idle or a terminal state.
    ///
    /// Captured chunks are stored locally and forwarded through
    /// `chunk_tx` as they arrive. A device failure leaves the state
    /// unchanged and acquires nothing.
    pub async fn start(&mut self, chunk_tx: mpsc::Sender<AudioChunk>) -> Result<(), RecordError> {
        if self.state == SessionState::Recording {
            return Err(RecordError::AlreadyRecording);
        }

        info!("Starting recording session: {}", self.config.recording_id);

        let capture_config = self.config.capture_config();
        let mut chunk_rx = self.capture.open(&capture_config).await?;
        self.chunk_format = match self.capture.mime_type() {
            "audio/l16" => ChunkFormat::RawPcm,
            _ => ChunkFormat::Wav,
        };

        self.chunks.lock().unwrap().clear();
        self.artifact = None;
        self.started_at = Some(Utc::now());
        self.state = SessionState::Recording;

        let chunks = Arc::clone(&self.chunks);
        self.pump = Some(tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                chunks.lock().unwrap().push(chunk.clone());
                if chunk_tx.send(chunk).await.is_err() {
                    // Relay is gone; keep collecting for the artifact.
                    warn!("Chunk consumer closed, continuing local capture only");
                    while let Some(chunk) = chunk_rx.recv().await {
                        chunks.lock().unwrap().push(chunk);
                    }
                    break;
                }
            }
        }));

        Ok(())
    }

    /// Finish the attempt and assemble the artifact.
    ///
    /// Waits the stop-grace delay before hard-stopping the device so
    /// the in-flight final chunk lands. A second call is a no-op that
    /// returns the already-assembled artifact. Zero captured chunks is
    /// an explicit `NoAudio` error, never an empty artifact.
    pub async fn stop(&mut self) -> Result<RecordingArtifact, RecordError> {
        match self.state {
            SessionState::Recording => {}
            SessionState::Stopped => {
                return self.artifact.clone().ok_or(RecordError::NoAudio);
            }
            _ => return Err(RecordError::NotRecording),
        }

        info!("Stopping recording session: {}", self.config.recording_id);

        // The pump only exits early if the device died mid-capture; a
        // partial take must not be presented as a complete artifact.
        let device_failed = self.pump.as_ref().is_some_and(|p| p.is_finished());

        tokio::time::sleep(self.config.stop_grace).await;
        self.capture.close().await?;
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }
        self.state = SessionState::Stopped;

        if device_failed {
            return Err(RecordError::Capture(CaptureError::Device(
                "capture device stopped before stop was requested".to_string(),
            )));
        }

        let chunks = self.chunks.lock().unwrap().clone();
        if chunks.is_empty() {
            warn!("Stop requested with zero captured chunks");
            return Err(RecordError::NoAudio);
        }

        let artifact = assemble(
            &chunks,
            self.chunk_format,
            self.config.sample_rate,
            self.config.channels,
        )?;
        self.artifact = Some(artifact.clone());
        Ok(artifact)
    }

    /// Abort the attempt: release the device before returning, discard
    /// every chunk, produce nothing. Idempotent.
    pub async fn cancel(&mut self) -> Result<(), RecordError> {
        if self.state != SessionState::Recording {
            return Ok(());
        }

        info!("Cancelling recording session: {}", self.config.recording_id);

        // Stop forwarding first so no late chunk escapes to the relay.
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.capture.close().await?;
        self.chunks.lock().unwrap().clear();
        self.artifact = None;
        self.state = SessionState::Cancelled;
        Ok(())
    }

    pub fn stats(&self) -> SessionStats {
        let chunks = self.chunks.lock().unwrap();
        let byte_count = chunks.iter().map(|c| c.bytes.len()).sum();
        let duration_secs = match (self.started_at, &self.artifact) {
            (_, Some(artifact)) => artifact.duration_secs,
            (Some(started), None) => {
                Utc::now().signed_duration_since(started).num_milliseconds() as f64 / 1000.0
            }
            (None, None) => 0.0,
        };

        SessionStats {
            recording_id: self.config.recording_id.clone(),
            state: self.state,
            started_at: self.started_at,
            duration_secs,
            chunk_count: chunks.len(),
            byte_count,
        }
    }
}
