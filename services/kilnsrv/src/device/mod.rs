//! Device capability layer
//!
//! Every logical operation goes through [`KilnDevice`]. The blocking serial
//! driver is adapted once at construction ([`BlockingDevice`]); the HTTP proxy
//! ([`RemoteKiln`]) implements the trait natively. Call sites only ever hold a
//! [`DeviceHandle`] and never know which one they talk to.

pub mod blocking;
pub mod driver;
pub mod proxy;

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use errors::KilnResult;
use kiln_model::pattern::{validate_pattern, STEP_COUNT};
use kiln_model::{
    AlarmLimits, KeyStatus, LedStatus, Parameter, Pattern, PatternSetting, PatternStep,
    ProgramStatus, SettingsSnapshot,
};

pub use blocking::BlockingDevice;
pub use driver::DeltaDriver;
pub use proxy::RemoteKiln;

/// Synchronous form of the primitive operations, implemented by drivers that
/// block on I/O
pub trait SyncKilnDevice: Send + Sync {
    fn read_value(&self, parameter: Parameter) -> KilnResult<f64>;
    fn write_value(&self, parameter: Parameter, value: f64) -> KilnResult<()>;
    fn read_flag(&self, parameter: Parameter) -> KilnResult<bool>;
    fn write_flag(&self, parameter: Parameter, on: bool) -> KilnResult<()>;
    fn get_pattern_step(&self, pattern: u8, step: u8) -> KilnResult<PatternStep>;
    fn set_pattern_step(&self, pattern: u8, step: u8, temperature: f64, time: u16)
        -> KilnResult<()>;
    fn read_pattern_setting(&self, setting: PatternSetting, pattern: u8) -> KilnResult<u16>;
    fn write_pattern_setting(
        &self,
        setting: PatternSetting,
        pattern: u8,
        value: u16,
    ) -> KilnResult<()>;
}

/// Logical operations on one controller
///
/// Implementors provide the eight primitives; composite reads are built on
/// top of them and issue one primitive per register.
#[async_trait]
pub trait KilnDevice: Send + Sync {
    async fn read_value(&self, parameter: Parameter) -> KilnResult<f64>;
    async fn write_value(&self, parameter: Parameter, value: f64) -> KilnResult<()>;
    async fn read_flag(&self, parameter: Parameter) -> KilnResult<bool>;
    async fn write_flag(&self, parameter: Parameter, on: bool) -> KilnResult<()>;
    async fn get_pattern_step(&self, pattern: u8, step: u8) -> KilnResult<PatternStep>;

    /// Two register writes, temperature first. Not atomic: a failed time
    /// write leaves the new temperature in place.
    async fn set_pattern_step(
        &self,
        pattern: u8,
        step: u8,
        temperature: f64,
        time: u16,
    ) -> KilnResult<()>;

    async fn read_pattern_setting(&self, setting: PatternSetting, pattern: u8) -> KilnResult<u16>;
    async fn write_pattern_setting(
        &self,
        setting: PatternSetting,
        pattern: u8,
        value: u16,
    ) -> KilnResult<()>;

    async fn read_pv(&self) -> KilnResult<f64> {
        self.read_value(Parameter::ProcessValue).await
    }

    async fn setpoint(&self) -> KilnResult<f64> {
        self.read_value(Parameter::Setpoint).await
    }

    async fn set_setpoint(&self, value: f64) -> KilnResult<()> {
        self.write_value(Parameter::Setpoint, value).await
    }

    async fn get_pattern(&self, pattern: u8) -> KilnResult<Pattern> {
        validate_pattern(pattern)?;
        let mut steps = Vec::with_capacity(usize::from(STEP_COUNT));
        for step in 0..STEP_COUNT {
            steps.push(self.get_pattern_step(pattern, step).await?);
        }
        Ok(Pattern { pattern, steps })
    }

    async fn program_status(&self) -> KilnResult<ProgramStatus> {
        Ok(ProgramStatus {
            executing_pattern: self.read_word(Parameter::ExecutingPatternNumber).await?,
            executing_step: self.read_word(Parameter::ExecutingStepNumber).await?,
            step_time_left_min: self.read_word(Parameter::StepTimeLeftMin).await?,
            step_time_left_sec: self.read_word(Parameter::StepTimeLeftSec).await?,
        })
    }

    async fn led_status(&self) -> KilnResult<LedStatus> {
        Ok(LedStatus {
            raw: self.read_word(Parameter::LedStatus).await?,
            at: self.read_flag(Parameter::LedAt).await?,
            out1: self.read_flag(Parameter::LedOut1).await?,
            out2: self.read_flag(Parameter::LedOut2).await?,
            alarm1: self.read_flag(Parameter::LedAlarm1).await?,
            alarm2: self.read_flag(Parameter::LedAlarm2).await?,
            alarm3: self.read_flag(Parameter::LedAlarm3).await?,
            deg_f: self.read_flag(Parameter::LedDegF).await?,
            deg_c: self.read_flag(Parameter::LedDegC).await?,
        })
    }

    async fn key_status(&self) -> KilnResult<KeyStatus> {
        Ok(KeyStatus {
            set: self.read_flag(Parameter::KeySet).await?,
            function: self.read_flag(Parameter::KeyFunction).await?,
            up: self.read_flag(Parameter::KeyUp).await?,
            down: self.read_flag(Parameter::KeyDown).await?,
        })
    }

    /// Alarm type of alarm 1..=3
    async fn alarm_type(&self, alarm: u8) -> KilnResult<f64> {
        self.read_value(Parameter::alarm_type(alarm)?).await
    }

    async fn alarm_limits(&self, alarm: u8) -> KilnResult<AlarmLimits> {
        let upper = Parameter::alarm_upper(alarm)?;
        let lower = Parameter::alarm_lower(alarm)?;
        Ok(AlarmLimits {
            alarm,
            upper: self.read_value(upper).await?,
            lower: self.read_value(lower).await?,
        })
    }

    /// Output value of output 1..=2
    async fn output_value(&self, output: u8) -> KilnResult<f64> {
        self.read_value(Parameter::output_value(output)?).await
    }

    async fn settings_snapshot(&self) -> KilnResult<SettingsSnapshot> {
        Ok(SettingsSnapshot {
            control_method: self.read_value(Parameter::ControlMethod).await?,
            heating_cooling: self.read_value(Parameter::HeatingCoolingSelection).await?,
            sensor_type: self.read_value(Parameter::SensorType).await?,
            lock_status: self.read_value(Parameter::SettingLockStatus).await?,
            pid_selection: self.read_value(Parameter::PidParameterSelection).await?,
            analog_decimal: self.read_value(Parameter::AnalogDecimalSetting).await?,
            system_alarm: self.read_value(Parameter::SystemAlarmSetting).await?,
            temp_unit: self.read_flag(Parameter::TempUnitDisplay).await?,
            valve_feedback: self.read_flag(Parameter::ValveFeedbackSetting).await?,
            at_valve_feedback: self.read_flag(Parameter::AutoTuningValveFeedback).await?,
            decimal_point: self.read_flag(Parameter::DecimalPointPosition).await?,
            at_setting: self.read_flag(Parameter::AtSetting).await?,
            run_stop: self.read_flag(Parameter::RunStop).await?,
            stop_pid: self.read_flag(Parameter::StopPidProgram).await?,
            temp_stop_pid: self.read_flag(Parameter::TemporarilyStopPid).await?,
        })
    }

    /// Unscaled word parameter as an integer
    async fn read_word(&self, parameter: Parameter) -> KilnResult<u16> {
        let value = self.read_value(parameter).await?;
        Ok(value as u16)
    }
}

/// Shared handle to whichever device implementation the process runs with
#[derive(Clone)]
pub struct DeviceHandle {
    inner: Arc<dyn KilnDevice>,
}

impl DeviceHandle {
    pub fn new<D: KilnDevice + 'static>(device: D) -> Self {
        Self {
            inner: Arc::new(device),
        }
    }

    /// Wrap a blocking driver so its calls run on the blocking pool
    pub fn blocking<D: SyncKilnDevice + 'static>(driver: D) -> Self {
        Self::new(BlockingDevice::new(driver))
    }

    pub fn as_dyn(&self) -> &dyn KilnDevice {
        self.inner.as_ref()
    }
}

impl Deref for DeviceHandle {
    type Target = dyn KilnDevice;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle").finish_non_exhaustive()
    }
}
