//! Named operations and their JSON envelope
//!
//! Every primitive of [`KilnDevice`] has an [`Operation`] variant carrying its
//! arguments. The RPC endpoint decodes and executes them; the remote proxy
//! encodes them.
//!
//! ```json
//! {"op":"read_value","parameter":"setpoint"}
//! {"op":"set_pattern_step","pattern":0,"step":3,"temperature":650.0,"time":30}
//! ```

use errors::{KilnError, KilnResult};
use kiln_model::{Parameter, PatternSetting, PatternStep};
use serde::{Deserialize, Serialize};

use crate::device::KilnDevice;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    ReadValue {
        parameter: Parameter,
    },
    WriteValue {
        parameter: Parameter,
        value: f64,
    },
    ReadFlag {
        parameter: Parameter,
    },
    WriteFlag {
        parameter: Parameter,
        value: bool,
    },
    GetPatternStep {
        pattern: u8,
        step: u8,
    },
    SetPatternStep {
        pattern: u8,
        step: u8,
        temperature: f64,
        time: u16,
    },
    ReadPatternSetting {
        setting: PatternSetting,
        pattern: u8,
    },
    WritePatternSetting {
        setting: PatternSetting,
        pattern: u8,
        value: u16,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadValue { .. } => "read_value",
            Self::WriteValue { .. } => "write_value",
            Self::ReadFlag { .. } => "read_flag",
            Self::WriteFlag { .. } => "write_flag",
            Self::GetPatternStep { .. } => "get_pattern_step",
            Self::SetPatternStep { .. } => "set_pattern_step",
            Self::ReadPatternSetting { .. } => "read_pattern_setting",
            Self::WritePatternSetting { .. } => "write_pattern_setting",
        }
    }

    /// Run against any device; errors come back unmodified
    pub async fn execute(self, device: &dyn KilnDevice) -> KilnResult<OpOutput> {
        Ok(match self {
            Self::ReadValue { parameter } => OpOutput::Value(device.read_value(parameter).await?),
            Self::WriteValue { parameter, value } => {
                device.write_value(parameter, value).await?;
                OpOutput::Done
            },
            Self::ReadFlag { parameter } => OpOutput::Flag(device.read_flag(parameter).await?),
            Self::WriteFlag { parameter, value } => {
                device.write_flag(parameter, value).await?;
                OpOutput::Done
            },
            Self::GetPatternStep { pattern, step } => {
                OpOutput::Step(device.get_pattern_step(pattern, step).await?)
            },
            Self::SetPatternStep {
                pattern,
                step,
                temperature,
                time,
            } => {
                device
                    .set_pattern_step(pattern, step, temperature, time)
                    .await?;
                OpOutput::Done
            },
            Self::ReadPatternSetting { setting, pattern } => {
                OpOutput::Word(device.read_pattern_setting(setting, pattern).await?)
            },
            Self::WritePatternSetting {
                setting,
                pattern,
                value,
            } => {
                device
                    .write_pattern_setting(setting, pattern, value)
                    .await?;
                OpOutput::Done
            },
        })
    }
}

/// Result of one operation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OpOutput {
    Value(f64),
    Flag(bool),
    Word(u16),
    Step(PatternStep),
    Done,
}

impl OpOutput {
    fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Flag(_) => "flag",
            Self::Word(_) => "word",
            Self::Step(_) => "step",
            Self::Done => "done",
        }
    }

    fn mismatch(self, expected: &str) -> KilnError {
        KilnError::frame(format!(
            "expected a {} result, got {}",
            expected,
            self.kind()
        ))
    }

    pub fn into_value(self) -> KilnResult<f64> {
        match self {
            Self::Value(v) => Ok(v),
            other => Err(other.mismatch("value")),
        }
    }

    pub fn into_flag(self) -> KilnResult<bool> {
        match self {
            Self::Flag(v) => Ok(v),
            other => Err(other.mismatch("flag")),
        }
    }

    pub fn into_word(self) -> KilnResult<u16> {
        match self {
            Self::Word(v) => Ok(v),
            other => Err(other.mismatch("word")),
        }
    }

    pub fn into_step(self) -> KilnResult<PatternStep> {
        match self {
            Self::Step(v) => Ok(v),
            other => Err(other.mismatch("step")),
        }
    }

    pub fn into_done(self) -> KilnResult<()> {
        match self {
            Self::Done => Ok(()),
            other => Err(other.mismatch("done")),
        }
    }
}

/// Reply envelope of the RPC endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OpResponse {
    Ok { result: OpOutput },
    Error { error: KilnError },
}

impl OpResponse {
    pub fn from_result(result: KilnResult<OpOutput>) -> Self {
        match result {
            Ok(result) => Self::Ok { result },
            Err(error) => Self::Error { error },
        }
    }

    pub fn into_result(self) -> KilnResult<OpOutput> {
        match self {
            Self::Ok { result } => Ok(result),
            Self::Error { error } => Err(error),
        }
    }
}
