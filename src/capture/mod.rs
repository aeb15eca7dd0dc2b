//! Microphone capture
//!
//! This module provides the `MicrophoneCapture` abstraction that owns
//! exclusive access to the input device between open and close, encodes
//! accumulated samples into timed binary chunks, and flushes a final
//! partial chunk when capture is closed.

pub mod backend;
pub mod encoder;
pub mod mic;
pub mod scripted;

pub use backend::{AudioChunk, CaptureConfig, CaptureFactory, CaptureSource, MicrophoneCapture};
pub use encoder::{ChunkEncoder, ChunkFormat};
pub use mic::CpalMicrophone;
pub use scripted::{CaptureProbe, ScriptedCapture};
