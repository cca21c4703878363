//! API routes configuration

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::api::handlers::*;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/device/ops", post(device_op))
        .route("/api/v1/recording/start", post(start_recording))
        .route("/api/v1/recording/stop", post(stop_recording))
        .route("/api/v1/recording/status", get(recording_status))
        .route("/api/v1/recording/samples", get(recording_samples))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
