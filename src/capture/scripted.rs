use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use super::backend::{AudioChunk, CaptureConfig, MicrophoneCapture};
use super::encoder::{ChunkEncoder, ChunkFormat};
use crate::error::CaptureError;

/// Capture backend fed by predefined sample batches.
///
/// Each scripted batch becomes one chunk, emitted as soon as capture
/// opens. An optional final batch is emitted only when `close()` is
/// called, mirroring the live backend's final flush. Used for tests
/// and offline/batch processing.
pub struct ScriptedCapture {
    batches: Vec<Vec<i16>>,
    final_batch: Option<Vec<i16>>,
    die_after_batches: bool,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
    capturing: bool,
    format: ChunkFormat,
    opens: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

/// Counters observing a `ScriptedCapture`'s device lifecycle.
#[derive(Clone)]
pub struct CaptureProbe {
    opens: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl CaptureProbe {
    /// How many times the device was acquired.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// How many times the device was released.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl ScriptedCapture {
    pub fn new(batches: Vec<Vec<i16>>) -> Self {
        Self {
            batches,
            final_batch: None,
            die_after_batches: false,
            stop_tx: None,
            task: None,
            capturing: false,
            format: ChunkFormat::Wav,
            opens: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Batch held back until `close()`, emitted as the final chunk.
    pub fn with_final_batch(mut self, batch: Vec<i16>) -> Self {
        self.final_batch = Some(batch);
        self
    }

    /// Simulate the device dying mid-capture: the chunk stream closes
    /// on its own after the scripted batches, before `close()` is
    /// called.
    pub fn with_device_failure(mut self) -> Self {
        self.die_after_batches = true;
        self
    }

    pub fn probe(&self) -> CaptureProbe {
        CaptureProbe {
            opens: Arc::clone(&self.opens),
            releases: Arc::clone(&self.releases),
        }
    }
}

#[async_trait::async_trait]
impl MicrophoneCapture for ScriptedCapture {
    async fn open(
        &mut self,
        config: &CaptureConfig,
    ) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if self.capturing {
            return Err(CaptureError::Device(
                "capture device already held".to_string(),
            ));
        }

        self.format =
            ChunkFormat::probe(&config.preferred_formats, config.sample_rate, config.channels);
        let encoder = ChunkEncoder::new(self.format, config.sample_rate, config.channels);
        let interval_ms = config.chunk_interval.as_millis() as u64;

        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        let (stop_tx, stop_rx) = oneshot::channel();

        let batches = self.batches.clone();
        let final_batch = self.final_batch.clone();
        let die_after_batches = self.die_after_batches;

        self.task = Some(tokio::spawn(async move {
            for (i, batch) in batches.iter().enumerate() {
                let Ok(bytes) = encoder.encode(batch) else {
                    continue;
                };
                let chunk = AudioChunk {
                    bytes,
                    timestamp_ms: i as u64 * interval_ms,
                };
                if chunk_tx.send(chunk).await.is_err() {
                    return;
                }
            }

            // Dropping chunk_tx here closes the stream early, the way
            // a dead device would.
            if die_after_batches {
                return;
            }

            // Hold the channel open until the device is closed.
            let _ = stop_rx.await;

            if let Some(batch) = final_batch {
                if let Ok(bytes) = encoder.encode(&batch) {
                    let chunk = AudioChunk {
                        bytes,
                        timestamp_ms: batches.len() as u64 * interval_ms,
                    };
                    let _ = chunk_tx.send(chunk).await;
                }
            }
        }));

        self.stop_tx = Some(stop_tx);
        self.capturing = true;
        self.opens.fetch_add(1, Ordering::SeqCst);
        info!("Scripted capture started ({} batches)", self.batches.len());

        Ok(chunk_rx)
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        if !self.capturing {
            return Ok(());
        }
        self.capturing = false;
        self.releases.fetch_add(1, Ordering::SeqCst);

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}
