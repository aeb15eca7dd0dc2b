// Tests for the recording session state machine: lifecycle
// transitions, device exclusivity, the final-chunk flush on stop, and
// artifact assembly.

use anyhow::Result;
use speakset::capture::ScriptedCapture;
use speakset::{CaptureError, RecordError, RecordingSession, SessionConfig, SessionState};
use std::io::Cursor;
use std::time::Duration;
use tokio::sync::mpsc;

fn quick_config() -> SessionConfig {
    SessionConfig {
        stop_grace: Duration::from_millis(10),
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn stop_assembles_artifact_from_all_chunks() -> Result<()> {
    let capture = ScriptedCapture::new(vec![vec![100i16; 1600], vec![200i16; 1600]])
        .with_final_batch(vec![50i16; 800]);
    let mut session = RecordingSession::new(quick_config(), Box::new(capture));

    let (chunk_tx, mut chunk_rx) = mpsc::channel(64);
    session.start(chunk_tx).await?;
    assert_eq!(session.state(), SessionState::Recording);

    let artifact = session.stop().await?;
    assert_eq!(session.state(), SessionState::Stopped);

    // Two scripted chunks plus the final flush on close.
    assert_eq!(artifact.chunk_count, 3);
    assert_eq!(artifact.mime_type, "audio/wav");

    // 16kHz mono: 1600 + 1600 + 800 samples = 0.25s.
    assert!((artifact.duration_secs - 0.25).abs() < 1e-9);

    // The artifact is one playable WAV carrying every sample.
    let reader = hound::WavReader::new(Cursor::new(&artifact.bytes))?;
    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.len(), 4000);

    // The same chunks were forwarded downstream, in order.
    let mut forwarded = Vec::new();
    while let Ok(chunk) = chunk_rx.try_recv() {
        forwarded.push(chunk);
    }
    assert_eq!(forwarded.len(), 3);
    Ok(())
}

#[tokio::test]
async fn stop_with_zero_chunks_is_no_audio() -> Result<()> {
    let capture = ScriptedCapture::new(vec![]);
    let mut session = RecordingSession::new(quick_config(), Box::new(capture));

    let (chunk_tx, _chunk_rx) = mpsc::channel(64);
    session.start(chunk_tx).await?;

    let err = session.stop().await.unwrap_err();
    assert!(matches!(err, RecordError::NoAudio));

    // The failed attempt still ends in a released, Stopped state.
    assert_eq!(session.state(), SessionState::Stopped);
    Ok(())
}

#[tokio::test]
async fn double_stop_is_idempotent_and_releases_once() -> Result<()> {
    let capture = ScriptedCapture::new(vec![vec![1i16; 160]]);
    let probe = capture.probe();
    let mut session = RecordingSession::new(quick_config(), Box::new(capture));

    let (chunk_tx, _chunk_rx) = mpsc::channel(64);
    session.start(chunk_tx).await?;

    let first = session.stop().await?;
    let second = session.stop().await?;

    assert_eq!(first.bytes, second.bytes);
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(probe.releases(), 1, "device must be released exactly once");
    Ok(())
}

#[tokio::test]
async fn double_cancel_is_idempotent_and_releases_once() -> Result<()> {
    let capture = ScriptedCapture::new(vec![vec![1i16; 160], vec![2i16; 160]]);
    let probe = capture.probe();
    let mut session = RecordingSession::new(quick_config(), Box::new(capture));

    let (chunk_tx, _chunk_rx) = mpsc::channel(64);
    session.start(chunk_tx).await?;

    session.cancel().await?;
    session.cancel().await?;

    assert_eq!(session.state(), SessionState::Cancelled);
    assert_eq!(probe.releases(), 1);

    // Cancelled attempts keep nothing.
    assert_eq!(session.stats().chunk_count, 0);

    // And stop after cancel is rejected, not resurrecting anything.
    let err = session.stop().await.unwrap_err();
    assert!(matches!(err, RecordError::NotRecording));
    Ok(())
}

#[tokio::test]
async fn start_while_recording_fails_without_second_device() -> Result<()> {
    let capture = ScriptedCapture::new(vec![vec![1i16; 160]]);
    let probe = capture.probe();
    let mut session = RecordingSession::new(quick_config(), Box::new(capture));

    let (chunk_tx, _chunk_rx) = mpsc::channel(64);
    session.start(chunk_tx).await?;

    let (second_tx, _second_rx) = mpsc::channel(64);
    let err = session.start(second_tx).await.unwrap_err();
    assert!(matches!(err, RecordError::AlreadyRecording));
    assert_eq!(probe.opens(), 1, "no second device handle may be acquired");

    session.stop().await?;
    Ok(())
}

#[tokio::test]
async fn restart_after_stop_begins_fresh_attempt() -> Result<()> {
    let capture = ScriptedCapture::new(vec![vec![1i16; 160]]);
    let probe = capture.probe();
    let mut session = RecordingSession::new(quick_config(), Box::new(capture));

    let (chunk_tx, _chunk_rx) = mpsc::channel(64);
    session.start(chunk_tx).await?;
    let first = session.stop().await?;
    assert_eq!(first.chunk_count, 1);

    // A new start from the terminal state re-acquires the device and
    // clears the previous attempt's chunks.
    let (chunk_tx, _chunk_rx) = mpsc::channel(64);
    session.start(chunk_tx).await?;
    assert_eq!(session.state(), SessionState::Recording);
    assert_eq!(probe.opens(), 2);

    let second = session.stop().await?;
    assert_eq!(second.chunk_count, 1);
    Ok(())
}

#[tokio::test]
async fn device_death_mid_capture_surfaces_error_not_artifact() -> Result<()> {
    let capture = ScriptedCapture::new(vec![vec![1i16; 160], vec![2i16; 160]])
        .with_device_failure();
    let mut session = RecordingSession::new(quick_config(), Box::new(capture));

    let (chunk_tx, _chunk_rx) = mpsc::channel(64);
    session.start(chunk_tx).await?;

    // Let the scripted chunk stream run out before stop is requested.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = session.stop().await.unwrap_err();
    assert!(matches!(
        err,
        RecordError::Capture(CaptureError::Device(_))
    ));

    // The failed attempt still ends released and Stopped, and the
    // partial take is not offered by a repeated stop either.
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(session.stop().await.is_err());
    Ok(())
}

#[tokio::test]
async fn artifact_saves_as_playable_wav() -> Result<()> {
    let capture = ScriptedCapture::new(vec![vec![7i16; 320]]);
    let mut session = RecordingSession::new(quick_config(), Box::new(capture));

    let (chunk_tx, _chunk_rx) = mpsc::channel(64);
    session.start(chunk_tx).await?;
    let artifact = session.stop().await?;

    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("recording.wav");
    artifact.save(&path)?;

    let reader = hound::WavReader::open(&path)?;
    assert_eq!(reader.len(), 320);
    Ok(())
}
