use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::SessionState;

/// Statistics about a recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub recording_id: String,

    pub state: SessionState,

    /// When the current attempt started, if one has started.
    pub started_at: Option<DateTime<Utc>>,

    pub duration_secs: f64,

    /// Number of chunks captured so far in this attempt.
    pub chunk_count: usize,

    /// Total encoded bytes captured so far in this attempt.
    pub byte_count: usize,
}
