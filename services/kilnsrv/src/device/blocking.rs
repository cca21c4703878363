//! Async adapter over a blocking driver

use std::sync::Arc;

use async_trait::async_trait;
use errors::{KilnError, KilnResult};
use kiln_model::{Parameter, PatternSetting, PatternStep};

use super::{KilnDevice, SyncKilnDevice};

/// Runs every call of a [`SyncKilnDevice`] on the blocking worker pool
pub struct BlockingDevice<D> {
    driver: Arc<D>,
}

impl<D: SyncKilnDevice + 'static> BlockingDevice<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver: Arc::new(driver),
        }
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> KilnResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&D) -> KilnResult<T> + Send + 'static,
    {
        let driver = Arc::clone(&self.driver);
        tokio::task::spawn_blocking(move || f(&driver))
            .await
            .map_err(|e| KilnError::internal(format!("{op} worker failed: {e}")))?
    }
}

#[async_trait]
impl<D: SyncKilnDevice + 'static> KilnDevice for BlockingDevice<D> {
    async fn read_value(&self, parameter: Parameter) -> KilnResult<f64> {
        self.run("read_value", move |d| d.read_value(parameter)).await
    }

    async fn write_value(&self, parameter: Parameter, value: f64) -> KilnResult<()> {
        self.run("write_value", move |d| d.write_value(parameter, value))
            .await
    }

    async fn read_flag(&self, parameter: Parameter) -> KilnResult<bool> {
        self.run("read_flag", move |d| d.read_flag(parameter)).await
    }

    async fn write_flag(&self, parameter: Parameter, on: bool) -> KilnResult<()> {
        self.run("write_flag", move |d| d.write_flag(parameter, on)).await
    }

    async fn get_pattern_step(&self, pattern: u8, step: u8) -> KilnResult<PatternStep> {
        self.run("get_pattern_step", move |d| d.get_pattern_step(pattern, step))
            .await
    }

    async fn set_pattern_step(
        &self,
        pattern: u8,
        step: u8,
        temperature: f64,
        time: u16,
    ) -> KilnResult<()> {
        self.run("set_pattern_step", move |d| {
            d.set_pattern_step(pattern, step, temperature, time)
        })
        .await
    }

    async fn read_pattern_setting(&self, setting: PatternSetting, pattern: u8) -> KilnResult<u16> {
        self.run("read_pattern_setting", move |d| {
            d.read_pattern_setting(setting, pattern)
        })
        .await
    }

    async fn write_pattern_setting(
        &self,
        setting: PatternSetting,
        pattern: u8,
        value: u16,
    ) -> KilnResult<()> {
        self.run("write_pattern_setting", move |d| {
            d.write_pattern_setting(setting, pattern, value)
        })
        .await
    }
}
