use tracing::{debug, info};

use crate::channel::{ProcessingStatus, ServerFrame};
use crate::error::ProtocolError;

/// Terminal result of one recording attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The server finished processing and generated a task set.
    Completed { task_set_id: String },
    /// The server acknowledged a client-initiated cancel.
    Cancelled,
}

/// Folds inbound server statuses into at most one terminal outcome.
///
/// The expected pipeline is recording_received -> verifying ->
/// processing -> completed, with recording_cancelled reachable at any
/// point; intermediate statuses are observed but not enforced.
#[derive(Debug, Default)]
pub struct ProcessingStatusTracker {
    finished: bool,
    last_status: Option<ProcessingStatus>,
}

impl ProcessingStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one inbound frame. Returns `Some(outcome)` exactly once per
    /// recording attempt; everything after a terminal status is ignored.
    ///
    /// `completed` without a task set id is a protocol error: the
    /// caller cannot navigate without one, so it is surfaced rather
    /// than silently leaving the session stuck.
    pub fn observe(
        &mut self,
        frame: ServerFrame,
    ) -> Result<Option<SessionOutcome>, ProtocolError> {
        let ServerFrame::Status {
            status,
            task_set_id,
        } = frame;

        if self.finished {
            debug!("Ignoring status {:?} after terminal outcome", status);
            return Ok(None);
        }
        self.last_status = Some(status);

        match status {
            ProcessingStatus::Completed => {
                self.finished = true;
                match task_set_id {
                    Some(id) => {
                        info!("Processing completed, task set {}", id);
                        Ok(Some(SessionOutcome::Completed { task_set_id: id }))
                    }
                    None => Err(ProtocolError::MissingTaskSetId),
                }
            }
            ProcessingStatus::RecordingCancelled => {
                self.finished = true;
                info!("Server acknowledged cancel");
                Ok(Some(SessionOutcome::Cancelled))
            }
            other => {
                debug!("Processing status: {:?}", other);
                Ok(None)
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn last_status(&self) -> Option<ProcessingStatus> {
        self.last_status
    }
}
