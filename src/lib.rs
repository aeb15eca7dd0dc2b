pub mod api;
pub mod capture;
pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod relay;
pub mod session;
pub mod tracker;

pub use capture::{
    AudioChunk, CaptureConfig, CaptureFactory, CaptureSource, ChunkEncoder, ChunkFormat,
    MicrophoneCapture, ScriptedCapture,
};
pub use channel::{
    ChannelStatus, ClientFrame, ControlStatus, ProcessingStatus, ServerFrame, StreamingChannel,
};
pub use config::Config;
pub use controller::RecordingController;
pub use error::{CaptureError, ProtocolError, RecordError, RelayError};
pub use relay::{ChunkRelay, ChunkSink};
pub use session::{RecordingArtifact, RecordingSession, SessionConfig, SessionState, SessionStats};
pub use tracker::{ProcessingStatusTracker, SessionOutcome};
