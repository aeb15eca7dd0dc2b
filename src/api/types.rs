use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer credentials returned by `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
}

impl AuthToken {
    /// Value for the Authorization header.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
}

impl LoginResponse {
    pub fn token(&self) -> AuthToken {
        AuthToken {
            access_token: self.access_token.clone(),
            token_type: self.token_type.clone(),
        }
    }
}

/// A server-generated ordered collection of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSet {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One quiz task (multiple choice, fill-in-the-blank, speak-the-word).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// A user answer paired with its task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAnswer {
    pub task_id: String,
    pub value: String,
    #[serde(default)]
    pub correct: Option<bool>,
}

/// Body for `POST /tasks/task/submit`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSubmission {
    pub task_id: String,
    pub value: String,
}

/// Query parameters for `GET /tasks/task-sets/filtered`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskSetFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// Resolved media file reference.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaFile {
    pub url: String,
}
