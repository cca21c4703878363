//! API handlers

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use errors::{ErrorInfo, KilnError};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::ops::{OpResponse, Operation};
use crate::recorder::{RecordingStatus, SampleRecord};
use crate::AppState;

/// Error reply for the recording endpoints
#[derive(Debug)]
pub struct ApiError(pub KilnError);

impl From<KilnError> for ApiError {
    fn from(err: KilnError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let info: ErrorInfo = self.0.to_error_info();
        (status, Json(info)).into_response()
    }
}

fn status_of(err: &KilnError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Execute one device operation
///
/// The body is decoded here rather than by the `Json` extractor so that an
/// unknown operation or parameter name still gets an `OpResponse` envelope.
pub async fn device_op(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<OpResponse>) {
    let op: Operation = match serde_json::from_slice(&body) {
        Ok(op) => op,
        Err(e) => {
            let err = KilnError::invalid_parameter("operation", e.to_string());
            return (status_of(&err), Json(OpResponse::Error { error: err }));
        },
    };

    let name = op.name();
    let result = op.execute(state.device.as_dyn()).await;
    match &result {
        Ok(_) => debug!("op {} ok", name),
        Err(e) => warn!("op {} failed: {}", name, e),
    }

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => status_of(e),
    };
    (status, Json(OpResponse::from_result(result)))
}

pub async fn start_recording(
    State(state): State<AppState>,
) -> Result<Json<RecordingStatus>, ApiError> {
    Ok(Json(state.recorder.start().await?))
}

pub async fn stop_recording(
    State(state): State<AppState>,
) -> Result<Json<RecordingStatus>, ApiError> {
    Ok(Json(state.recorder.stop().await?))
}

pub async fn recording_status(State(state): State<AppState>) -> Json<RecordingStatus> {
    Json(state.recorder.status().await)
}

pub async fn recording_samples(
    State(state): State<AppState>,
) -> Result<Json<Vec<SampleRecord>>, ApiError> {
    Ok(Json(state.recorder.query().await?))
}
