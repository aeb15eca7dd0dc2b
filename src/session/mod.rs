//! Recording session management
//!
//! This module provides the `RecordingSession` state machine that owns
//! one recording attempt:
//! - exclusive microphone access between start and stop/cancel
//! - the append-only chunk store (mutated only while Recording)
//! - the stop-grace delay and final-chunk flush
//! - assembly of the collected chunks into one playable artifact

mod artifact;
mod config;
mod session;
mod stats;

pub use artifact::RecordingArtifact;
pub use config::SessionConfig;
pub use session::{RecordingSession, SessionState};
pub use stats::SessionStats;
