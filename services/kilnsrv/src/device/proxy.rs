//! HTTP proxy to a remote kilnsrv
//!
//! Each primitive is one `POST /api/v1/device/ops` round trip. Device errors
//! reported by the remote side come back as the same `KilnError` value; a
//! failed network call becomes `TransportTimeout`, an unusable reply
//! `FrameError`.

use std::time::Duration;

use async_trait::async_trait;
use errors::{KilnError, KilnResult};
use kiln_model::{Parameter, PatternSetting, PatternStep};
use reqwest::Client;
use tracing::{debug, warn};

use super::KilnDevice;
use crate::ops::{OpOutput, OpResponse, Operation};

pub const OPS_PATH: &str = "/api/v1/device/ops";

#[derive(Debug, Clone)]
pub struct RemoteKiln {
    client: Client,
    ops_url: String,
}

impl RemoteKiln {
    pub fn new(base_url: &str, timeout: Duration) -> KilnResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KilnError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            ops_url: format!("{}{}", base_url.trim_end_matches('/'), OPS_PATH),
        })
    }

    pub fn ops_url(&self) -> &str {
        &self.ops_url
    }

    /// Send one operation and decode the envelope
    pub async fn call(&self, op: Operation) -> KilnResult<OpOutput> {
        let name = op.name();
        debug!("remote {} -> {}", name, self.ops_url);

        let response = self
            .client
            .post(&self.ops_url)
            .json(&op)
            .send()
            .await
            .map_err(|e| {
                warn!("remote {} failed: {}", name, e);
                KilnError::from(e)
            })?;

        let status = response.status();
        let body = response.bytes().await?;
        match serde_json::from_slice::<OpResponse>(&body) {
            Ok(envelope) => envelope.into_result(),
            Err(_) if !status.is_success() => Err(KilnError::frame(format!(
                "remote {name} returned HTTP {status}"
            ))),
            Err(e) => Err(KilnError::frame(format!(
                "undecodable reply to {name}: {e}"
            ))),
        }
    }
}

#[async_trait]
impl KilnDevice for RemoteKiln {
    async fn read_value(&self, parameter: Parameter) -> KilnResult<f64> {
        self.call(Operation::ReadValue { parameter })
            .await?
            .into_value()
    }

    async fn write_value(&self, parameter: Parameter, value: f64) -> KilnResult<()> {
        self.call(Operation::WriteValue { parameter, value })
            .await?
            .into_done()
    }

    async fn read_flag(&self, parameter: Parameter) -> KilnResult<bool> {
        self.call(Operation::ReadFlag { parameter })
            .await?
            .into_flag()
    }

    async fn write_flag(&self, parameter: Parameter, on: bool) -> KilnResult<()> {
        self.call(Operation::WriteFlag {
            parameter,
            value: on,
        })
        .await?
        .into_done()
    }

    async fn get_pattern_step(&self, pattern: u8, step: u8) -> KilnResult<PatternStep> {
        self.call(Operation::GetPatternStep { pattern, step })
            .await?
            .into_step()
    }

    async fn set_pattern_step(
        &self,
        pattern: u8,
        step: u8,
        temperature: f64,
        time: u16,
    ) -> KilnResult<()> {
        self.call(Operation::SetPatternStep {
            pattern,
            step,
            temperature,
            time,
        })
        .await?
        .into_done()
    }

    async fn read_pattern_setting(&self, setting: PatternSetting, pattern: u8) -> KilnResult<u16> {
        self.call(Operation::ReadPatternSetting { setting, pattern })
            .await?
            .into_word()
    }

    async fn write_pattern_setting(
        &self,
        setting: PatternSetting,
        pattern: u8,
        value: u16,
    ) -> KilnResult<()> {
        self.call(Operation::WritePatternSetting {
            setting,
            pattern,
            value,
        })
        .await?
        .into_done()
    }
}
