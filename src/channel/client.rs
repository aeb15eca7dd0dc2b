use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use super::messages::{ClientFrame, ControlStatus, ServerFrame};
use crate::relay::ChunkSink;

/// Connection state of the streaming channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Build the streaming endpoint from the base API URL and auth token.
///
/// `https://host/api` becomes `wss://host/api/ws/stream/audio?token=...`;
/// plain `http` maps to `ws`.
pub fn stream_endpoint(base_url: &str, token: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).context("invalid base API URL")?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow!("cannot derive websocket scheme from {}", base_url))?;

    let path = format!("{}/ws/stream/audio", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.query_pairs_mut().clear().append_pair("token", token);

    Ok(url)
}

enum Outbound {
    Chunk(Vec<u8>),
    Control(ControlStatus),
    Shutdown,
}

/// One bidirectional streaming connection to the processing server.
///
/// `connect()` never blocks on the handshake; callers observe the
/// resolution through the status watch. Sends are valid only while
/// Connected and are dropped (with a log line) otherwise; buffering
/// across the connection gap is the relay's job, not the channel's.
pub struct StreamingChannel {
    endpoint: Url,
    drain_delay: Duration,
    status_tx: watch::Sender<ChannelStatus>,
    frame_tx: mpsc::Sender<ServerFrame>,
    outbound: StdMutex<Option<mpsc::Sender<Outbound>>>,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl StreamingChannel {
    pub fn new(endpoint: Url, frame_tx: mpsc::Sender<ServerFrame>, drain_delay: Duration) -> Self {
        let (status_tx, _) = watch::channel(ChannelStatus::Disconnected);
        Self {
            endpoint,
            drain_delay,
            status_tx,
            frame_tx,
            outbound: StdMutex::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn status(&self) -> ChannelStatus {
        *self.status_tx.borrow()
    }

    /// Watch receiver for connection-state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ChannelStatus> {
        self.status_tx.subscribe()
    }

    /// Open the socket. Closes any prior socket first, sets Connecting
    /// and returns; the handshake resolves asynchronously to
    /// Connected, Error, or Disconnected.
    pub async fn connect(&self) {
        self.shutdown_socket().await;

        let _ = self.status_tx.send(ChannelStatus::Connecting);
        info!("Connecting streaming channel");

        let (out_tx, out_rx) = mpsc::channel(256);
        *self.outbound.lock().unwrap() = Some(out_tx);

        let handle = tokio::spawn(run_socket(
            self.endpoint.clone(),
            out_rx,
            self.status_tx.clone(),
            self.frame_tx.clone(),
        ));
        *self.task.lock().await = Some(handle);
    }

    /// Queue one binary audio chunk. No-op unless Connected; never
    /// blocks. A dropped chunk is logged, not fatal.
    pub fn send_chunk(&self, bytes: Vec<u8>) {
        if self.status() != ChannelStatus::Connected {
            debug!("Channel not connected, dropping {}-byte chunk", bytes.len());
            return;
        }
        let guard = self.outbound.lock().unwrap();
        if let Some(tx) = guard.as_ref() {
            if let Err(e) = tx.try_send(Outbound::Chunk(bytes)) {
                warn!("Failed to queue audio chunk: {}", e);
            }
        }
    }

    /// Queue one control frame. Same drop policy as chunks.
    pub fn send_control(&self, status: ControlStatus) {
        if self.status() != ChannelStatus::Connected {
            debug!("Channel not connected, dropping control {:?}", status);
            return;
        }
        let guard = self.outbound.lock().unwrap();
        if let Some(tx) = guard.as_ref() {
            if let Err(e) = tx.try_send(Outbound::Control(status)) {
                warn!("Failed to queue control frame: {}", e);
            }
        }
    }

    /// Send `recording_end`, wait the drain delay so the server can
    /// flush in-flight state, then close the socket. Idempotent.
    pub async fn close(&self) {
        if self.status() == ChannelStatus::Connected {
            self.send_control(ControlStatus::RecordingEnd);
            tokio::time::sleep(self.drain_delay).await;
        }
        self.shutdown_socket().await;
        info!("Streaming channel closed");
    }

    async fn shutdown_socket(&self) {
        let out_tx = self.outbound.lock().unwrap().take();
        if let Some(tx) = out_tx {
            let _ = tx.send(Outbound::Shutdown).await;
        }
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            let _ = task.await;
        }
        let _ = self.status_tx.send(ChannelStatus::Disconnected);
    }
}

impl ChunkSink for StreamingChannel {
    fn status(&self) -> ChannelStatus {
        StreamingChannel::status(self)
    }

    fn send_chunk(&self, bytes: Vec<u8>) {
        StreamingChannel::send_chunk(self, bytes)
    }

    fn send_control(&self, status: ControlStatus) {
        StreamingChannel::send_control(self, status)
    }
}

/// Socket task: performs the handshake, then ships outbound messages
/// in queue order and forwards parsed inbound status frames.
async fn run_socket(
    endpoint: Url,
    mut out_rx: mpsc::Receiver<Outbound>,
    status_tx: watch::Sender<ChannelStatus>,
    frame_tx: mpsc::Sender<ServerFrame>,
) {
    let ws = match connect_async(endpoint.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            warn!("Channel connect failed: {}", e);
            let _ = status_tx.send(ChannelStatus::Error);
            return;
        }
    };

    info!("Streaming channel connected");
    let _ = status_tx.send(ChannelStatus::Connected);

    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Some(Outbound::Chunk(bytes)) => {
                    if let Err(e) = sink.send(Message::Binary(bytes)).await {
                        warn!("Chunk send failed: {}", e);
                        let _ = status_tx.send(ChannelStatus::Error);
                        break;
                    }
                }
                Some(Outbound::Control(status)) => {
                    let frame = ClientFrame::Status { status };
                    match serde_json::to_string(&frame) {
                        Ok(json) => {
                            if let Err(e) = sink.send(Message::Text(json)).await {
                                warn!("Control send failed: {}", e);
                                let _ = status_tx.send(ChannelStatus::Error);
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to serialize control frame: {}", e),
                    }
                }
                Some(Outbound::Shutdown) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = status_tx.send(ChannelStatus::Disconnected);
                    break;
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(frame) => {
                            let _ = frame_tx.send(frame).await;
                        }
                        // Unknown or malformed payloads are not fatal.
                        Err(e) => warn!("Ignoring unparseable server frame: {}", e),
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Channel closed by server");
                    let _ = status_tx.send(ChannelStatus::Disconnected);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Channel read error: {}", e);
                    let _ = status_tx.send(ChannelStatus::Error);
                    break;
                }
                None => {
                    let _ = status_tx.send(ChannelStatus::Disconnected);
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_from_https_base() {
        let url = stream_endpoint("https://api.example.com/v1", "tok123").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://api.example.com/v1/ws/stream/audio?token=tok123"
        );
    }

    #[test]
    fn endpoint_from_http_base_with_trailing_slash() {
        let url = stream_endpoint("http://localhost:8000/", "t").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws/stream/audio?token=t");
    }

    #[test]
    fn endpoint_encodes_token() {
        let url = stream_endpoint("http://localhost:8000", "a b+c").unwrap();
        assert!(url.as_str().ends_with("token=a+b%2Bc"));
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!(stream_endpoint("not a url", "t").is_err());
    }
}
