use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::backend::{AudioChunk, CaptureConfig, MicrophoneCapture};
use super::encoder::{ChunkEncoder, ChunkFormat};
use crate::error::CaptureError;

/// Live microphone capture via cpal.
///
/// `cpal::Stream` is not `Send`, so the stream lives on a dedicated
/// thread; the callback hands raw samples to an async pump task that
/// slices them into encoded chunks at the configured cadence.
pub struct CpalMicrophone {
    stop: Arc<AtomicBool>,
    stream_thread: Option<std::thread::JoinHandle<()>>,
    pump: Option<tokio::task::JoinHandle<()>>,
    capturing: bool,
    format: ChunkFormat,
}

impl CpalMicrophone {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            stream_thread: None,
            pump: None,
            capturing: false,
            format: ChunkFormat::Wav,
        }
    }
}

impl Default for CpalMicrophone {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MicrophoneCapture for CpalMicrophone {
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

        let (sample_tx, sample_rx) = mpsc::unbounded_channel::<Vec<i16>>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), CaptureError>>();

        self.stop.store(false, Ordering::Release);
        let stop = Arc::clone(&self.stop);
        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // The stream must be created and dropped on the same thread.
        let thread = std::thread::spawn(move || {
            let host = cpal::default_host();
            let device = match host.default_input_device() {
                Some(device) => device,
                None => {
                    let _ = ready_tx.send(Err(CaptureError::UnsupportedEnvironment));
                    return;
                }
            };

            info!(
                "Using input device: {}",
                device.name().unwrap_or_else(|_| "unknown".to_string())
            );

            let stream = match device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let samples: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    let _ = sample_tx.send(samples);
                },
                |err| {
                    error!("Input stream error: {}", err);
                },
                None,
            ) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(map_build_error(e)));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(CaptureError::Device(e.to_string())));
                return;
            }

            let _ = ready_tx.send(Ok(()));

            while !stop.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_millis(50));
            }

            // Dropping the stream stops capture and closes the sample
            // channel, which triggers the pump's final flush.
            drop(stream);
        });

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(CaptureError::Device(
                    "capture thread exited before stream start".to_string(),
                ));
            }
        }

        self.stream_thread = Some(thread);

        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        let encoder = ChunkEncoder::new(self.format, config.sample_rate, config.channels);
        let chunk_interval = config.chunk_interval;

        self.pump = Some(tokio::spawn(pump_samples(
            sample_rx,
            chunk_tx,
            encoder,
            chunk_interval,
        )));

        self.capturing = true;
        info!(
            "Microphone capture started ({}Hz, {}ch, {:?} chunks)",
            config.sample_rate, config.channels, self.format
        );

        Ok(chunk_rx)
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        if !self.capturing {
            return Ok(());
        }
        self.capturing = false;

        self.stop.store(true, Ordering::Release);

        if let Some(thread) = self.stream_thread.take() {
            let joined = tokio::task::spawn_blocking(move || thread.join()).await;
            if joined.is_err() {
                warn!("Capture thread join was cancelled");
            }
        }

        // The pump flushes the final partial chunk before it exits.
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }

        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Accumulate raw samples and emit one encoded chunk per interval,
/// plus a final partial chunk when the sample stream closes.
async fn pump_samples(
    mut sample_rx: mpsc::UnboundedReceiver<Vec<i16>>,
    chunk_tx: mpsc::Sender<AudioChunk>,
    encoder: ChunkEncoder,
    chunk_interval: Duration,
) {
    let started = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(chunk_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending: Vec<i16> = Vec::new();

    loop {
        tokio::select! {
            batch = sample_rx.recv() => match batch {
                Some(samples) => pending.extend_from_slice(&samples),
                None => break,
            },
            _ = ticker.tick() => {
                if pending.is_empty() {
                    continue;
                }
                match encoder.encode(&pending) {
                    Ok(bytes) => {
                        pending.clear();
                        let chunk = AudioChunk {
                            bytes,
                            timestamp_ms: started.elapsed().as_millis() as u64,
                        };
                        if chunk_tx.send(chunk).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Dropping unencodable chunk: {}", e);
                        pending.clear();
                    }
                }
            }
        }
    }

    if !pending.is_empty() {
        if let Ok(bytes) = encoder.encode(&pending) {
            let chunk = AudioChunk {
                bytes,
                timestamp_ms: started.elapsed().as_millis() as u64,
            };
            let _ = chunk_tx.send(chunk).await;
        }
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::PermissionDenied,
        other => CaptureError::Device(other.to_string()),
    }
}
