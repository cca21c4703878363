//! kilnsrv configuration
//!
//! Loaded through `common::load_config`: defaults, then `config/kilnsrv.yaml`
//! (or `--config`), then `KILNSRV_*` environment variables, e.g.
//! `KILNSRV_SERIAL__PORT=/dev/ttyUSB1`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::LogConfig;
use errors::{KilnError, KilnResult};
use kiln_protocol::SerialSettings;
use serde::{Deserialize, Serialize};

pub const SERVICE_NAME: &str = "kilnsrv";

/// Where device operations go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMode {
    /// Local controller on a serial line
    #[default]
    Serial,
    /// Another kilnsrv owning the controller
    Remote,
    /// In-process simulated controller
    Simulated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub mode: DeviceMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 2000,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// NDJSON log, truncated at every session start
    pub path: PathBuf,
    pub interval_ms: u64,
    /// Start a session as soon as the service is up
    pub autostart: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("recording.txt"),
            interval_ms: 1000,
            autostart: false,
        }
    }
}

impl RecordingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KilnConfig {
    pub device: DeviceConfig,
    pub serial: SerialSettings,
    pub remote: RemoteConfig,
    pub recording: RecordingConfig,
    pub api: ApiConfig,
    pub logging: LogConfig,
}

impl KilnConfig {
    pub fn load(path: Option<&Path>) -> KilnResult<Self> {
        common::load_config(SERVICE_NAME, path)
    }

    pub fn validate(&self) -> KilnResult<()> {
        self.serial.validate()?;
        if self.device.mode == DeviceMode::Remote {
            if !(self.remote.base_url.starts_with("http://")
                || self.remote.base_url.starts_with("https://"))
            {
                return Err(KilnError::config(format!(
                    "remote.base_url must be an http(s) URL, got '{}'",
                    self.remote.base_url
                )));
            }
            if self.remote.timeout_ms == 0 {
                return Err(KilnError::config("remote.timeout_ms must be positive"));
            }
        }
        if self.recording.interval_ms == 0 {
            return Err(KilnError::config("recording.interval_ms must be positive"));
        }
        if self.recording.path.as_os_str().is_empty() {
            return Err(KilnError::config("recording.path must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = KilnConfig::default();
        assert_eq!(config.device.mode, DeviceMode::Serial);
        assert_eq!(config.recording.interval(), Duration::from_secs(1));
        assert_eq!(config.api.bind_address(), "0.0.0.0:8000");
        config.validate().unwrap();
    }

    #[test]
    fn test_short_serial_timeout_rejected() {
        let mut config = KilnConfig::default();
        config.serial.timeout_ms = 100;
        assert!(matches!(config.validate(), Err(KilnError::Config { .. })));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = KilnConfig::default();
        config.recording.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_remote_url_checked_only_in_remote_mode() {
        let mut config = KilnConfig::default();
        config.remote.base_url = "kiln.local".to_string();
        config.validate().unwrap();
        config.device.mode = DeviceMode::Remote;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let yaml = "\
device:
  mode: simulated
serial:
  slave_id: 3
recording:
  path: /tmp/kiln.ndjson
  interval_ms: 250
api:
  port: 9100";
        writeln!(file, "{yaml}").unwrap();

        let config = KilnConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.device.mode, DeviceMode::Simulated);
        assert_eq!(config.serial.slave_id, 3);
        assert_eq!(config.serial.baud_rate, 38400);
        assert_eq!(config.recording.interval_ms, 250);
        assert_eq!(config.api.port, 9100);
        assert!(config.api.enabled);
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let err = KilnConfig::load(Some(Path::new("/nonexistent/kilnsrv.yaml"))).unwrap_err();
        assert!(matches!(err, KilnError::Config { .. }));
    }
}
