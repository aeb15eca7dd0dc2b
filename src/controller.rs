use anyhow::Result;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::capture::{AudioChunk, MicrophoneCapture};
use crate::channel::{
    stream_endpoint, ChannelStatus, ControlStatus, ServerFrame, StreamingChannel,
};
use crate::config::Config;
use crate::error::{ProtocolError, RecordError};
use crate::relay::{ChunkRelay, ChunkSink};
use crate::session::{
    RecordingArtifact, RecordingSession, SessionConfig, SessionState, SessionStats,
};
use crate::tracker::{ProcessingStatusTracker, SessionOutcome};

/// Composition root wiring session, channel, relay and tracker into
/// the start/stop/cancel operations the caller sees.
pub struct RecordingController {
    session: RecordingSession,
    channel: Arc<StreamingChannel>,
    relay: Arc<StdMutex<ChunkRelay>>,
    relay_task: Option<JoinHandle<()>>,
    outcome_rx: mpsc::Receiver<Result<SessionOutcome, ProtocolError>>,
    completion_timeout: std::time::Duration,
}

impl RecordingController {
    /// Build a controller for one auth token. The token is an explicit
    /// constructor input; refreshing it means building a new controller
    /// (and with it a new channel), never mutating ambient state.
    pub fn new(
        config: &Config,
        token: &str,
        capture: Box<dyn MicrophoneCapture>,
    ) -> Result<Self> {
        let endpoint = stream_endpoint(&config.api.base_url, token)?;

        let (frame_tx, frame_rx) = mpsc::channel::<ServerFrame>(64);
        let channel = Arc::new(StreamingChannel::new(
            endpoint,
            frame_tx,
            config.drain_delay(),
        ));

        let (outcome_tx, outcome_rx) = mpsc::channel(1);
        tokio::spawn(track_statuses(frame_rx, outcome_tx));

        let session_config = SessionConfig::from_config(config);
        let session = RecordingSession::new(session_config, capture);

        Ok(Self {
            session,
            channel,
            relay: Arc::new(StdMutex::new(ChunkRelay::new(
                config.streaming.max_buffered_bytes,
            ))),
            relay_task: None,
            outcome_rx,
            completion_timeout: config.completion_timeout(),
        })
    }

    /// Begin recording and connecting concurrently.
    ///
    /// The channel handshake is not awaited before capture starts, so
    /// the user hears no connect latency; the relay absorbs the gap.
    pub async fn start(&mut self) -> Result<(), RecordError> {
        self.channel.connect().await;

        let (chunk_tx, chunk_rx) = mpsc::channel::<AudioChunk>(64);
        self.session.start(chunk_tx).await?;

        self.relay_task = Some(spawn_relay_loop(
            Arc::clone(&self.relay),
            chunk_rx,
            self.channel.subscribe(),
            Arc::clone(&self.channel) as Arc<dyn ChunkSink>,
        ));

        Ok(())
    }

    /// Stop recording, flush whatever is still buffered, and tell the
    /// server the recording is complete. Returns the assembled
    /// artifact.
    pub async fn stop(&mut self) -> Result<RecordingArtifact, RecordError> {
        // Single reconnect attempt if the channel died mid-recording.
        if matches!(
            self.channel.status(),
            ChannelStatus::Disconnected | ChannelStatus::Error
        ) {
            info!("Channel down at stop, attempting one reconnect");
            self.channel.connect().await;
        }

        let artifact = self.session.stop().await?;

        // Give the reconnect a moment to land before the final control
        // frame; if it still is not up, the frame is dropped
        // best-effort like any other disconnected send.
        let mut status_rx = self.channel.subscribe();
        let connected = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            status_rx.wait_for(|s| *s == ChannelStatus::Connected),
        )
        .await;
        if connected.is_err() {
            warn!("Channel not connected after stop; completion frame will be dropped");
        }

        // All chunks are queued ahead of the completion frame: the
        // relay loop exits once the chunk stream has closed and the
        // buffer is flushed, so drain it before sending.
        if let Some(mut task) = self.relay_task.take() {
            if tokio::time::timeout(std::time::Duration::from_secs(5), &mut task)
                .await
                .is_err()
            {
                warn!("Relay did not drain in time; some chunks may be unsent");
                task.abort();
            }
        }
        {
            let mut relay = self.relay.lock().unwrap();
            let status = self.channel.status();
            relay.on_status(self.channel.as_ref(), status);
        }
        self.channel.send_control(ControlStatus::RecordingCompleted);

        Ok(artifact)
    }

    /// Cancel the attempt. The device is released and the buffer
    /// discarded before the best-effort cancel notification goes out.
    /// Idempotent: a repeated cancel notifies the server only once.
    pub async fn cancel(&mut self) -> Result<(), RecordError> {
        let was_recording = self.session.state() == SessionState::Recording;

        self.session.cancel().await?;
        self.relay.lock().unwrap().discard();
        if let Some(task) = self.relay_task.take() {
            task.abort();
        }

        if was_recording && self.channel.status() == ChannelStatus::Connected {
            self.channel.send_control(ControlStatus::RecordingCancelled);
        }
        Ok(())
    }

    /// Await the server's terminal status, then tear the channel down.
    ///
    /// A session with no terminal status does not hang forever: the
    /// completion timeout converts it into an explicit error.
    pub async fn wait_finished(&mut self) -> Result<SessionOutcome, ProtocolError> {
        let outcome = match tokio::time::timeout(self.completion_timeout, self.outcome_rx.recv())
            .await
        {
            Err(_) => Err(ProtocolError::CompletionTimeout(self.completion_timeout)),
            Ok(None) => Err(ProtocolError::ChannelClosed),
            Ok(Some(result)) => result,
        };

        self.channel.close().await;
        outcome
    }

    pub fn channel_status(&self) -> ChannelStatus {
        self.channel.status()
    }

    pub fn session_stats(&self) -> SessionStats {
        self.session.stats()
    }

    /// Chunks rejected because the pre-connect buffer overflowed.
    pub fn dropped_chunks(&self) -> u64 {
        self.relay.lock().unwrap().dropped_chunks()
    }
}

/// Pump chunk events and channel status transitions into the relay.
///
/// Keeps running after capture ends while chunks are still buffered,
/// so a late reconnect (the stop path) can flush them.
fn spawn_relay_loop(
    relay: Arc<StdMutex<ChunkRelay>>,
    mut chunk_rx: mpsc::Receiver<AudioChunk>,
    mut status_rx: watch::Receiver<ChannelStatus>,
    sink: Arc<dyn ChunkSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut capture_done = false;
        loop {
            if capture_done && !relay.lock().unwrap().is_buffering() {
                break;
            }
            tokio::select! {
                chunk = chunk_rx.recv(), if !capture_done => match chunk {
                    Some(chunk) => {
                        let result = {
                            let mut relay = relay.lock().unwrap();
                            relay.offer(sink.as_ref(), chunk.bytes)
                        };
                        if let Err(e) = result {
                            error!("Chunk relay rejected chunk: {}", e);
                        }
                    }
                    None => capture_done = true,
                },
                changed = status_rx.changed() => match changed {
                    Ok(()) => {
                        let status = *status_rx.borrow();
                        relay.lock().unwrap().on_status(sink.as_ref(), status);
                    }
                    Err(_) => break,
                },
            }
        }
    })
}

/// Fold inbound server frames into at most one terminal outcome.
async fn track_statuses(
    mut frame_rx: mpsc::Receiver<ServerFrame>,
    outcome_tx: mpsc::Sender<Result<SessionOutcome, ProtocolError>>,
) {
    let mut tracker = ProcessingStatusTracker::new();
    while let Some(frame) = frame_rx.recv().await {
        match tracker.observe(frame) {
            Ok(Some(outcome)) => {
                let _ = outcome_tx.send(Ok(outcome)).await;
            }
            Ok(None) => {}
            Err(e) => {
                let _ = outcome_tx.send(Err(e)).await;
            }
        }
    }
}
