// Tests for the server status tracker: exactly one terminal outcome
// per recording attempt, and explicit errors for protocol violations.

use speakset::{ProcessingStatus, ProcessingStatusTracker, ProtocolError, ServerFrame, SessionOutcome};

fn status(status: ProcessingStatus) -> ServerFrame {
    ServerFrame::Status {
        status,
        task_set_id: None,
    }
}

fn completed(id: &str) -> ServerFrame {
    ServerFrame::Status {
        status: ProcessingStatus::Completed,
        task_set_id: Some(id.to_string()),
    }
}

#[test]
fn completed_fires_single_outcome_with_id() {
    let mut tracker = ProcessingStatusTracker::new();

    // The usual pipeline, with a repeated intermediate status.
    assert_eq!(tracker.observe(status(ProcessingStatus::Connected)).unwrap(), None);
    assert_eq!(
        tracker.observe(status(ProcessingStatus::RecordingReceived)).unwrap(),
        None
    );
    assert_eq!(tracker.observe(status(ProcessingStatus::Verifying)).unwrap(), None);
    assert_eq!(tracker.observe(status(ProcessingStatus::Processing)).unwrap(), None);
    assert_eq!(tracker.observe(status(ProcessingStatus::Processing)).unwrap(), None);

    let outcome = tracker.observe(completed("abc123")).unwrap();
    assert_eq!(
        outcome,
        Some(SessionOutcome::Completed {
            task_set_id: "abc123".to_string()
        })
    );
    assert!(tracker.is_finished());

    // Anything after the terminal status is ignored.
    assert_eq!(tracker.observe(completed("zzz999")).unwrap(), None);
    assert_eq!(
        tracker.observe(status(ProcessingStatus::Processing)).unwrap(),
        None
    );
}

#[test]
fn completed_without_id_is_a_protocol_error() {
    let mut tracker = ProcessingStatusTracker::new();

    let err = tracker
        .observe(status(ProcessingStatus::Completed))
        .unwrap_err();
    assert!(matches!(err, ProtocolError::MissingTaskSetId));

    // Still terminal: the attempt must not produce a second outcome.
    assert!(tracker.is_finished());
    assert_eq!(tracker.observe(completed("late")).unwrap(), None);
}

#[test]
fn cancel_acknowledgment_is_terminal() {
    let mut tracker = ProcessingStatusTracker::new();

    assert_eq!(
        tracker.observe(status(ProcessingStatus::RecordingReceived)).unwrap(),
        None
    );
    let outcome = tracker
        .observe(status(ProcessingStatus::RecordingCancelled))
        .unwrap();
    assert_eq!(outcome, Some(SessionOutcome::Cancelled));

    // A completed arriving after the cancel ack changes nothing.
    assert_eq!(tracker.observe(completed("abc")).unwrap(), None);
}

#[test]
fn cancel_is_reachable_at_any_point() {
    let mut tracker = ProcessingStatusTracker::new();

    let outcome = tracker
        .observe(status(ProcessingStatus::RecordingCancelled))
        .unwrap();
    assert_eq!(outcome, Some(SessionOutcome::Cancelled));
}

#[test]
fn last_status_tracks_pipeline_progress() {
    let mut tracker = ProcessingStatusTracker::new();
    assert_eq!(tracker.last_status(), None);

    tracker.observe(status(ProcessingStatus::Verifying)).unwrap();
    assert_eq!(tracker.last_status(), Some(ProcessingStatus::Verifying));
}
