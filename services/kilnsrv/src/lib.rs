//! Kiln controller service
//!
//! Exposes a Delta DTB temperature controller as named logical parameters,
//! either over a local serial line or through another kilnsrv over HTTP, and
//! records the process value in the background.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod device;
pub mod ops;
pub mod recorder;

use std::sync::Arc;

pub use config::KilnConfig;
pub use device::{DeviceHandle, KilnDevice};
pub use ops::{OpOutput, OpResponse, Operation};
pub use recorder::{RecordingStatus, SampleRecord, SamplingRecorder};

/// Application state shared by the API handlers
#[derive(Clone)]
pub struct AppState {
    pub device: DeviceHandle,
    pub recorder: Arc<SamplingRecorder>,
}
