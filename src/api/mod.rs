//! REST collaborators
//!
//! Typed client for the backend endpoints surrounding the streaming
//! core: multi-tenant login, task-set/task CRUD and scoring, and media
//! file upload/resolution. Every authenticated call carries
//! `Authorization: <token_type> <token>`.

mod client;
mod types;

pub use client::ApiClient;
pub use types::{
    AuthToken, LoginResponse, MediaFile, Task, TaskAnswer, TaskSet, TaskSetFilter, TaskSubmission,
};
