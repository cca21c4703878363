//! Unified error handling for the kiln controller services
//!
//! Every layer (register algebra, wire codec, driver, remote proxy, recorder)
//! reports failures through [`KilnError`]. The type is serializable so that a
//! device-side failure can cross the proxy boundary and be re-raised unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// ErrorInfo - API error response type
// ============================================================================

/// Standard error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code (HTTP status)
    pub code: u16,
    /// Error message
    pub message: String,
    /// Field-specific errors for validation
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub field_errors: HashMap<String, Vec<String>>,
}

impl ErrorInfo {
    /// Create a new ErrorInfo with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: 500,
            message: message.into(),
            field_errors: HashMap::new(),
        }
    }

    /// Set the error code
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    /// Add a field error
    pub fn add_field_error(mut self, field: impl Into<String>, error: impl Into<String>) -> Self {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(error.into());
        self
    }
}

// ============================================================================
// KilnError - Main error type
// ============================================================================

/// Main error type for the kiln controller workspace
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KilnError {
    // ======================================
    // Client input errors
    // ======================================
    /// Pattern, step, alarm or output index outside its valid range
    #[error("Invalid {index} index: {value} not in [{min}, {max}]")]
    InvalidIndex {
        index: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Scaled value does not fit the parameter's raw register domain
    #[error("Out of range: {parameter}={value} (raw domain [{min}, {max}])")]
    OutOfRange {
        parameter: String,
        value: f64,
        min: i64,
        max: i64,
    },

    #[error("Invalid parameter: {parameter}: {reason}")]
    InvalidParameter { parameter: String, reason: String },

    // ======================================
    // Transport errors
    // ======================================
    #[error("Transport timeout: {message}")]
    TransportTimeout { message: String },

    #[error("Frame error: {message}")]
    FrameError { message: String },

    // ======================================
    // Recorder errors
    // ======================================
    #[error("Recording conflict: {message}")]
    RecordingConflict { message: String },

    // ======================================
    // System errors
    // ======================================
    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result alias used across the workspace
pub type KilnResult<T> = std::result::Result<T, KilnError>;

impl KilnError {
    pub fn invalid_index(index: impl Into<String>, value: i64, min: i64, max: i64) -> Self {
        Self::InvalidIndex {
            index: index.into(),
            value,
            min,
            max,
        }
    }

    pub fn out_of_range(parameter: impl Into<String>, value: f64, min: i64, max: i64) -> Self {
        Self::OutOfRange {
            parameter: parameter.into(),
            value,
            min,
            max,
        }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::TransportTimeout {
            message: message.into(),
        }
    }

    pub fn frame(message: impl Into<String>) -> Self {
        Self::FrameError {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::RecordingConflict {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::InvalidIndex { .. } | Self::OutOfRange { .. } | Self::InvalidParameter { .. } => {
                400
            },

            // 409 Conflict
            Self::RecordingConflict { .. } => 409,

            // 502 Bad Gateway
            Self::FrameError { .. } => 502,

            // 504 Gateway Timeout
            Self::TransportTimeout { .. } => 504,

            // 500 Internal Server Error
            Self::Io { .. } | Self::Config { .. } | Self::Internal { .. } => 500,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportTimeout { .. } | Self::FrameError { .. }
        )
    }

    /// Caller supplied bad input; retrying the same call cannot succeed
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIndex { .. } | Self::OutOfRange { .. } | Self::InvalidParameter { .. }
        )
    }

    /// Convert to API ErrorInfo for HTTP responses
    pub fn to_error_info(&self) -> ErrorInfo {
        let mut error_info = ErrorInfo::new(self.to_string()).with_code(self.status_code());

        match self {
            Self::InvalidParameter { parameter, reason } => {
                error_info = error_info.add_field_error(parameter, reason);
            },
            Self::OutOfRange {
                parameter,
                min,
                max,
                ..
            } => {
                error_info = error_info
                    .add_field_error(parameter, format!("raw value must be in [{min}, {max}]"));
            },
            Self::InvalidIndex { index, min, max, .. } => {
                error_info =
                    error_info.add_field_error(index, format!("must be in [{min}, {max}]"));
            },
            _ => {},
        }

        error_info
    }
}

// Conversion traits for common error types
impl From<std::io::Error> for KilnError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => Self::timeout(err.to_string()),
            _ => Self::io(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for KilnError {
    fn from(err: serde_json::Error) -> Self {
        Self::frame(format!("malformed JSON payload: {}", err))
    }
}

impl From<reqwest::Error> for KilnError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::timeout(format!("remote device unreachable: {}", err))
        } else if let Some(status) = err.status() {
            Self::frame(format!("remote device replied with HTTP {}", status))
        } else if err.is_decode() {
            Self::frame(format!("undecodable remote reply: {}", err))
        } else {
            Self::frame(format!("remote request failed: {}", err))
        }
    }
}

impl From<figment::Error> for KilnError {
    fn from(err: figment::Error) -> Self {
        Self::config(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(KilnError::invalid_index("pattern", 8, 0, 7).status_code(), 400);
        assert_eq!(KilnError::out_of_range("setpoint", 1e6, -999, 9999).status_code(), 400);
        assert_eq!(KilnError::conflict("already recording").status_code(), 409);
        assert_eq!(KilnError::frame("bad crc").status_code(), 502);
        assert_eq!(KilnError::timeout("no reply").status_code(), 504);
        assert_eq!(KilnError::internal("worker panicked").status_code(), 500);
    }

    #[test]
    fn test_error_classes() {
        assert!(KilnError::timeout("no reply").is_retryable());
        assert!(KilnError::frame("bad crc").is_retryable());
        assert!(!KilnError::conflict("idle").is_retryable());
        assert!(KilnError::invalid_parameter("pv", "read-only").is_client_error());
        assert!(!KilnError::timeout("no reply").is_client_error());
    }

    #[test]
    fn test_error_info() {
        let error = KilnError::invalid_parameter("process_value", "parameter is read-only");
        let info = error.to_error_info();
        assert_eq!(info.code, 400);
        assert!(info.field_errors.contains_key("process_value"));

        let info = KilnError::invalid_index("step", 8, 0, 7).to_error_info();
        assert_eq!(info.field_errors["step"], vec!["must be in [0, 7]".to_string()]);
    }

    #[test]
    fn test_error_display() {
        let err = KilnError::invalid_index("pattern", 8, 0, 7);
        assert_eq!(err.to_string(), "Invalid pattern index: 8 not in [0, 7]");
    }

    #[test]
    fn test_error_serde_tagged_by_kind() {
        let err = KilnError::invalid_index("step", 9, 0, 7);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "invalid_index");
        assert_eq!(json["index"], "step");
        assert_eq!(json["value"], 9);

        let back: KilnError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);

        let json = serde_json::json!({"kind": "transport_timeout", "message": "no reply"});
        let err: KilnError = serde_json::from_value(json).unwrap();
        assert_eq!(err, KilnError::timeout("no reply"));
    }

    #[test]
    fn test_io_timeout_maps_to_transport_timeout() {
        let err: KilnError = std::io::Error::new(std::io::ErrorKind::TimedOut, "silent").into();
        assert!(matches!(err, KilnError::TransportTimeout { .. }));

        let err: KilnError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, KilnError::Io { .. }));
    }
}
