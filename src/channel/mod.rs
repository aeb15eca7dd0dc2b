//! Streaming channel
//!
//! One WebSocket connection per recording attempt. Binary frames carry
//! raw audio chunks; small JSON envelopes carry status in both
//! directions. Send order is preserved by funnelling every outbound
//! message through a single writer task.

pub mod client;
pub mod messages;

pub use client::{stream_endpoint, ChannelStatus, StreamingChannel};
pub use messages::{ClientFrame, ControlStatus, ProcessingStatus, ServerFrame};
