//! Recording session lifecycle against the simulated controller
#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::sync::Arc;
use std::time::Duration;

use errors::KilnError;
use futures::future::join_all;
use kiln_protocol::SimulatedController;
use kilnsrv::device::{DeltaDriver, DeviceHandle};
use kilnsrv::SamplingRecorder;
use tempfile::TempDir;

fn recorder(dir: &TempDir, interval: Duration) -> Arc<SamplingRecorder> {
    let sim = SimulatedController::new(1);
    let device = DeviceHandle::blocking(DeltaDriver::new(sim, 1));
    Arc::new(SamplingRecorder::new(
        device,
        dir.path().join("recording.txt"),
        interval,
    ))
}

#[tokio::test]
async fn test_three_samples_in_three_and_a_half_seconds() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = recorder(&dir, Duration::from_secs(1));

    recorder.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    recorder.stop().await.unwrap();

    let samples = recorder.query().await.unwrap();
    assert_eq!(samples.len(), 3);
    assert!(samples
        .windows(2)
        .all(|pair| pair[0].time_passed < pair[1].time_passed));
    assert!(samples[0].time_passed >= 1.0);
    assert!(samples.iter().all(|s| s.temperature == 25.0));

    let content = std::fs::read_to_string(recorder.path()).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(content.ends_with('\n'));
}

#[tokio::test]
async fn test_concurrent_starts_have_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = recorder(&dir, Duration::from_millis(100));

    let attempts = (0..8).map(|_| {
        let recorder = Arc::clone(&recorder);
        tokio::spawn(async move { recorder.start().await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, KilnError::RecordingConflict { .. })));

    let winner = results.iter().find_map(|r| r.as_ref().ok()).unwrap();
    assert_eq!(recorder.status().await.started_at, winner.started_at);

    tokio::time::sleep(Duration::from_millis(350)).await;
    recorder.stop().await.unwrap();
    assert!(!recorder.is_recording().await);

    // Only the winning session's samples, one interval apart from its start
    let samples = recorder.query().await.unwrap();
    assert!((2..=4).contains(&samples.len()), "{} samples", samples.len());
    assert!(samples[0].time_passed >= 0.1);
    assert!(samples
        .windows(2)
        .all(|pair| pair[0].time_passed < pair[1].time_passed));
    let content = std::fs::read_to_string(recorder.path()).unwrap();
    assert_eq!(content.lines().count(), samples.len());
}

#[tokio::test]
async fn test_stop_when_idle_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = recorder(&dir, Duration::from_millis(100));

    let err = recorder.stop().await.unwrap_err();
    assert!(matches!(err, KilnError::RecordingConflict { .. }));
    assert!(!recorder.path().exists());
}

#[tokio::test]
async fn test_second_start_does_not_disturb_running_session() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = recorder(&dir, Duration::from_millis(100));

    let first = recorder.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    let before = recorder.query().await.unwrap().len();
    assert!(before >= 1);

    let err = recorder.start().await.unwrap_err();
    assert!(matches!(err, KilnError::RecordingConflict { .. }));
    assert_eq!(recorder.status().await.started_at, first.started_at);
    assert!(recorder.query().await.unwrap().len() >= before);

    recorder.stop().await.unwrap();
}

#[tokio::test]
async fn test_restart_truncates_log() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = recorder(&dir, Duration::from_millis(100));

    recorder.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(350)).await;
    recorder.stop().await.unwrap();
    assert!(!recorder.query().await.unwrap().is_empty());

    recorder.start().await.unwrap();
    recorder.stop().await.unwrap();
    assert!(recorder.query().await.unwrap().is_empty());
    assert!(recorder.path().exists());
}

#[tokio::test]
async fn test_no_samples_after_stop() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = recorder(&dir, Duration::from_millis(50));

    recorder.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    recorder.stop().await.unwrap();
    let after_stop = recorder.query().await.unwrap().len();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(recorder.query().await.unwrap().len(), after_stop);
}
