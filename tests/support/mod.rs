// Shared test doubles for the streaming pipeline tests.

use std::sync::Mutex;

use speakset::{ChannelStatus, ChunkSink, ControlStatus};

/// What a sink saw, in send order.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Chunk(Vec<u8>),
    Control(ControlStatus),
}

/// In-memory stand-in for the streaming channel.
pub struct FakeSink {
    status: Mutex<ChannelStatus>,
    sent: Mutex<Vec<Sent>>,
}

impl FakeSink {
    pub fn new(status: ChannelStatus) -> Self {
        Self {
            status: Mutex::new(status),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_status(&self, status: ChannelStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn chunks(&self) -> Vec<Vec<u8>> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Chunk(bytes) => Some(bytes),
                Sent::Control(_) => None,
            })
            .collect()
    }
}

impl ChunkSink for FakeSink {
    fn status(&self) -> ChannelStatus {
        *self.status.lock().unwrap()
    }

    fn send_chunk(&self, bytes: Vec<u8>) {
        self.sent.lock().unwrap().push(Sent::Chunk(bytes));
    }

    fn send_control(&self, status: ControlStatus) {
        self.sent.lock().unwrap().push(Sent::Control(status));
    }
}
