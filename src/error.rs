use std::time::Duration;
use thiserror::Error;

/// Errors raised by the microphone capture layer.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The user or platform refused access to the input device.
    #[error("microphone access denied")]
    PermissionDenied,

    /// No capture host or input device exists in this environment.
    #[error("no audio capture device available")]
    UnsupportedEnvironment,

    /// The device failed mid-capture (unplugged, stream error, ...).
    #[error("audio device error: {0}")]
    Device(String),

    /// Encoding captured samples into the chunk container failed.
    #[error("chunk encoding failed: {0}")]
    Encode(String),
}

/// Errors raised by the recording session and controller.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    /// Stop was requested but zero chunks were captured.
    #[error("no audio recorded")]
    NoAudio,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("failed to assemble recording artifact: {0}")]
    Artifact(String),
}

/// Errors raised by the chunk relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The pre-connection buffer hit its configured cap. The incoming
    /// chunk is rejected; capture and the local artifact are unaffected.
    #[error("chunk buffer full ({buffered_bytes} bytes buffered), chunk rejected")]
    BufferOverflow { buffered_bytes: usize },
}

/// Errors raised while interpreting the server status protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The server reported `completed` without a task set id. The UI
    /// cannot navigate without one, so this is surfaced, not swallowed.
    #[error("completed status did not carry a task set id")]
    MissingTaskSetId,

    /// No terminal status arrived within the completion timeout.
    #[error("no completion status received within {0:?}")]
    CompletionTimeout(Duration),

    /// The channel closed before a terminal status arrived.
    #[error("channel closed before a terminal status arrived")]
    ChannelClosed,
}
