//! Background temperature recording
//!
//! A [`SamplingRecorder`] is either idle or running exactly one sampling task.
//! The task reads PV once per interval through the device handle and appends
//! one JSON line per successful read:
//!
//! ```json
//! {"timestamp":"2024-05-01T10:00:01.002+02:00","time_passed":1.0,"temperature":25.3}
//! ```
//!
//! The log is truncated when a session starts. A failed read is logged and
//! skipped; the session keeps going until stopped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use errors::{KilnError, KilnResult};
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::device::DeviceHandle;

/// One line of the recording log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub timestamp: DateTime<Local>,
    /// Seconds since the session started, 2 decimals
    pub time_passed: f64,
    pub temperature: f64,
}

impl SampleRecord {
    pub fn new(timestamp: DateTime<Local>, elapsed: Duration, temperature: f64) -> Self {
        Self {
            timestamp,
            time_passed: (elapsed.as_secs_f64() * 100.0).round() / 100.0,
            temperature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingStatus {
    pub recording: bool,
    pub started_at: Option<DateTime<Local>>,
    pub path: PathBuf,
}

struct ActiveSession {
    started_at: DateTime<Local>,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

enum RecorderState {
    Idle,
    Recording(ActiveSession),
}

pub struct SamplingRecorder {
    device: DeviceHandle,
    path: PathBuf,
    interval: Duration,
    state: Mutex<RecorderState>,
}

impl SamplingRecorder {
    pub fn new(device: DeviceHandle, path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            device,
            path: path.into(),
            interval,
            state: Mutex::new(RecorderState::Idle),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the log and start sampling
    ///
    /// Fails with `RecordingConflict` if a session is already running; the
    /// running session and its log are left alone.
    pub async fn start(&self) -> KilnResult<RecordingStatus> {
        let mut state = self.state.lock().await;
        if let RecorderState::Recording(_) = *state {
            return Err(KilnError::conflict("Recording already in progress"));
        }

        let file = open_log(&self.path).await.map_err(|e| {
            KilnError::io(format!(
                "Failed to create recording log {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let started_at = Local::now();
        let origin = Instant::now();
        let token = CancellationToken::new();
        let span = info_span!("recording", path = %self.path.display());
        let handle = tokio::spawn(
            sampling_loop(
                self.device.clone(),
                file,
                origin,
                self.interval,
                token.clone(),
            )
            .instrument(span),
        );

        *state = RecorderState::Recording(ActiveSession {
            started_at,
            token,
            handle,
        });
        info!(
            "Recording started: {} every {:?}",
            self.path.display(),
            self.interval
        );

        Ok(self.status_of(&state))
    }

    /// Cancel the running session and wait for its task to finish
    ///
    /// Fails with `RecordingConflict` when idle, without touching the log.
    /// The recorder stays in `Recording` until the task has exited.
    pub async fn stop(&self) -> KilnResult<RecordingStatus> {
        let mut state = self.state.lock().await;
        let RecorderState::Recording(session) = &mut *state else {
            return Err(KilnError::conflict("No recording in progress"));
        };

        session.token.cancel();
        if let Err(e) = (&mut session.handle).await {
            error!("Sampling task ended abnormally: {}", e);
        }
        *state = RecorderState::Idle;
        info!("Recording stopped: {}", self.path.display());

        Ok(self.status_of(&state))
    }

    pub async fn status(&self) -> RecordingStatus {
        let state = self.state.lock().await;
        self.status_of(&state)
    }

    pub async fn is_recording(&self) -> bool {
        matches!(*self.state.lock().await, RecorderState::Recording(_))
    }

    /// Every well-formed record in the log, in file order
    pub async fn query(&self) -> KilnResult<Vec<SampleRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("Skipping malformed log line: {}", e);
                    None
                },
            })
            .collect())
    }

    /// Stop an active session; no-op when idle
    pub async fn shutdown(&self) {
        if self.is_recording().await {
            if let Err(e) = self.stop().await {
                debug!("Recorder shutdown: {}", e);
            }
        }
    }

    fn status_of(&self, state: &RecorderState) -> RecordingStatus {
        RecordingStatus {
            recording: matches!(state, RecorderState::Recording(_)),
            started_at: match state {
                RecorderState::Recording(session) => Some(session.started_at),
                RecorderState::Idle => None,
            },
            path: self.path.clone(),
        }
    }
}

async fn sampling_loop(
    device: DeviceHandle,
    mut file: File,
    origin: Instant,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = interval_at(origin + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticker.tick() => {},
        }

        match device.read_pv().await {
            Ok(temperature) => {
                let record = SampleRecord::new(Local::now(), origin.elapsed(), temperature);
                if let Err(e) = append_record(&mut file, &record).await {
                    error!("Failed to append sample: {}", e);
                }
            },
            Err(e) => warn!("Sample failed: {}", e),
        }
    }

    debug!("Sampling task stopped");
}

/// Truncate the log, then reopen it for appending
async fn open_log(path: &Path) -> std::io::Result<File> {
    File::create(path).await?;
    OpenOptions::new().append(true).open(path).await
}

/// One write per record so a line is never interleaved or split
async fn append_record(file: &mut File, record: &SampleRecord) -> KilnResult<()> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    file.write_all(&line).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::device::DeltaDriver;
    use kiln_protocol::SimulatedController;

    fn recorder(dir: &tempfile::TempDir) -> (SimulatedController, SamplingRecorder) {
        let sim = SimulatedController::new(1);
        let device = DeviceHandle::blocking(DeltaDriver::new(sim.clone(), 1));
        let recorder = SamplingRecorder::new(
            device,
            dir.path().join("recording.txt"),
            Duration::from_millis(100),
        );
        (sim, recorder)
    }

    #[test]
    fn test_time_passed_rounds_to_two_decimals() {
        let record = SampleRecord::new(Local::now(), Duration::from_millis(1_004_567), 25.0);
        assert_eq!(record.time_passed, 1004.57);
    }

    #[test]
    fn test_record_line_format() {
        let record = SampleRecord::new(Local::now(), Duration::from_millis(1500), 31.2);
        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert!(obj["timestamp"].is_string());
        assert_eq!(obj["time_passed"], 1.5);
        assert_eq!(obj["temperature"], 31.2);

        let back: SampleRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_sampling_failures_are_logged_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (sim, recorder) = recorder(&dir);

        sim.set_silent(true);
        recorder.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(recorder.query().await.unwrap().is_empty());

        sim.set_silent(false);
        tokio::time::sleep(Duration::from_millis(350)).await;
        recorder.stop().await.unwrap();

        let samples = recorder.query().await.unwrap();
        assert!(!samples.is_empty());
        assert!(samples.iter().all(|s| s.temperature == 25.0));
        assert!(logs_contain("Sample failed"));
    }

    #[tokio::test]
    async fn test_dropped_stop_keeps_session_until_task_exits() {
        let dir = tempfile::tempdir().unwrap();
        let (_sim, recorder) = recorder(&dir);
        recorder.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        // Abandon a stop before it can observe the task finishing
        let abandoned = tokio::time::timeout(Duration::ZERO, recorder.stop()).await;
        if abandoned.is_err() {
            assert!(recorder.is_recording().await);
            assert!(matches!(
                recorder.start().await,
                Err(KilnError::RecordingConflict { .. })
            ));
            recorder.stop().await.unwrap();
        }
        assert!(!recorder.is_recording().await);

        recorder.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        recorder.stop().await.unwrap();

        let content = tokio::fs::read(recorder.path()).await.unwrap();
        assert!(!content.contains(&0u8));
        let samples = recorder.query().await.unwrap();
        assert!(!samples.is_empty());
        assert!(samples[0].time_passed < 0.2);
    }

    #[tokio::test]
    async fn test_log_is_appended_after_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        tokio::fs::write(&path, b"old session\n").await.unwrap();

        let mut file = open_log(&path).await.unwrap();
        let record = SampleRecord::new(Local::now(), Duration::from_secs(1), 20.0);
        append_record(&mut file, &record).await.unwrap();
        append_record(&mut file, &record).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(!content.contains("old session"));
    }

    #[tokio::test]
    async fn test_query_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let (_sim, recorder) = recorder(&dir);
        let good = concat!(
            r#"{"timestamp":"2024-05-01T10:00:01+02:00","#,
            r#""time_passed":1.0,"temperature":25.3}"#
        );
        let content = format!("{good}\nnot json\n\n{{\"time_passed\":2}}\n{good}\n");
        tokio::fs::write(recorder.path(), content).await.unwrap();

        let samples = recorder.query().await.unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].temperature, 25.3);
    }

    #[tokio::test]
    async fn test_query_without_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (_sim, recorder) = recorder(&dir);
        assert!(recorder.query().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (_sim, recorder) = recorder(&dir);

        recorder.shutdown().await;
        assert!(!recorder.status().await.recording);

        let status = recorder.start().await.unwrap();
        assert!(status.recording);
        assert!(status.started_at.is_some());

        recorder.shutdown().await;
        let status = recorder.status().await;
        assert!(!status.recording);
        assert!(status.started_at.is_none());
    }
}
