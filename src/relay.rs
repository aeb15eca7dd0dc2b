use std::collections::VecDeque;
use tracing::{debug, info};

use crate::channel::{ChannelStatus, ControlStatus};
use crate::error::RelayError;

/// Destination for relayed chunks. Implemented by `StreamingChannel`;
/// tests substitute an in-memory sink.
pub trait ChunkSink: Send + Sync {
    fn status(&self) -> ChannelStatus;
    fn send_chunk(&self, bytes: Vec<u8>);
    fn send_control(&self, status: ControlStatus);
}

/// Reconciles the independent lifecycles of capture (starts at once)
/// and the channel (connects asynchronously).
///
/// Chunks arriving before the channel is Connected are buffered FIFO
/// and flushed, in arrival order, the moment the channel opens. A
/// chunk captured pre-connect is never silently dropped; `discard()`
/// exists so cancelled audio never reaches the server.
///
/// The buffer is bounded. On overflow the incoming chunk is rejected
/// with an error and counted; capture and the local artifact continue
/// unaffected.
pub struct ChunkRelay {
    pending: VecDeque<Vec<u8>>,
    pending_bytes: usize,
    buffering: bool,
    max_buffered_bytes: usize,
    dropped_chunks: u64,
}

impl ChunkRelay {
    pub fn new(max_buffered_bytes: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            pending_bytes: 0,
            buffering: false,
            max_buffered_bytes,
            dropped_chunks: 0,
        }
    }

    /// Handle one chunk event: forward immediately when the channel is
    /// Connected (and nothing is queued ahead of it), buffer otherwise.
    pub fn offer(&mut self, sink: &dyn ChunkSink, bytes: Vec<u8>) -> Result<(), RelayError> {
        if sink.status() == ChannelStatus::Connected {
            if self.buffering {
                // Older chunks are still queued; keep capture order.
                self.push(bytes)?;
                self.flush(sink);
            } else {
                sink.send_chunk(bytes);
            }
            return Ok(());
        }

        self.push(bytes)
    }

    /// Handle a channel status transition; flushes on Connected.
    pub fn on_status(&mut self, sink: &dyn ChunkSink, status: ChannelStatus) {
        if status == ChannelStatus::Connected && self.buffering {
            self.flush(sink);
        }
    }

    /// Drop everything unsent. Called on cancel.
    pub fn discard(&mut self) {
        if !self.pending.is_empty() {
            debug!("Discarding {} buffered chunks", self.pending.len());
        }
        self.pending.clear();
        self.pending_bytes = 0;
        self.buffering = false;
    }

    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    pub fn buffered_chunks(&self) -> usize {
        self.pending.len()
    }

    pub fn dropped_chunks(&self) -> u64 {
        self.dropped_chunks
    }

    fn push(&mut self, bytes: Vec<u8>) -> Result<(), RelayError> {
        if self.pending_bytes + bytes.len() > self.max_buffered_bytes {
            self.dropped_chunks += 1;
            return Err(RelayError::BufferOverflow {
                buffered_bytes: self.pending_bytes,
            });
        }
        self.pending_bytes += bytes.len();
        self.pending.push_back(bytes);
        self.buffering = true;
        Ok(())
    }

    fn flush(&mut self, sink: &dyn ChunkSink) {
        let count = self.pending.len();
        while let Some(bytes) = self.pending.pop_front() {
            sink.send_chunk(bytes);
        }
        self.pending_bytes = 0;
        self.buffering = false;
        if count > 0 {
            info!("Flushed {} buffered chunks", count);
        }
    }
}
