use serde::{Deserialize, Serialize};

/// Status names the client sends to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    RecordingCompleted,
    RecordingCancelled,
    RecordingEnd,
}

/// Status names the server sends back during processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Connected,
    RecordingReceived,
    Verifying,
    Processing,
    Completed,
    RecordingCancelled,
}

/// Client -> server control frame: `{"type":"status","status":<name>}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Status { status: ControlStatus },
}

/// Server -> client frame:
/// `{"type":"status","status":<name>,"task_set_id"?:<id>}`
///
/// `task_set_id` is only expected alongside `completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Status {
        status: ProcessingStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_set_id: Option<String>,
    },
}
