//! HTTP surface of kilnsrv
//!
//! - `POST /api/v1/device/ops` runs one [`crate::ops::Operation`]
//! - `/api/v1/recording/*` drives the sampling recorder
//! - `GET /health` liveness probe

pub mod handlers;
pub mod routes;

pub use routes::create_router;
