//! Pattern/step address arithmetic
//!
//! The controller stores 8 programs ("patterns") of 8 steps each. Step
//! temperatures live in one contiguous block and step times in another:
//!
//! - temperature of (p, s): `0x2000 + p*8 + s`
//! - time of (p, s):        `0x2080 + p*8 + s`
//!
//! Per-pattern settings sit in three 8-word blocks starting at 0x1040,
//! 0x1050 and 0x1060.

use errors::{KilnError, KilnResult};
use serde::{Deserialize, Serialize};

use crate::scale::RawDomain;

pub const PATTERN_COUNT: u8 = 8;
pub const STEP_COUNT: u8 = 8;

pub const PATTERN_TEMP_BASE: u16 = 0x2000;
pub const PATTERN_TIME_BASE: u16 = 0x2080;

pub const STEP_TEMP_DECIMALS: u8 = 1;
pub const STEP_TEMP_DOMAIN: RawDomain = RawDomain::new(-999, 9999);
pub const STEP_TIME_DECIMALS: u8 = 0;
pub const STEP_TIME_DOMAIN: RawDomain = RawDomain::new(0, 900);

/// Check `min <= value <= max`, naming the index kind on failure
pub fn validate_index(index: &str, value: u8, min: u8, max: u8) -> KilnResult<u8> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(KilnError::invalid_index(
            index,
            i64::from(value),
            i64::from(min),
            i64::from(max),
        ))
    }
}

pub fn validate_pattern(pattern: u8) -> KilnResult<u8> {
    validate_index("pattern", pattern, 0, PATTERN_COUNT - 1)
}

pub fn validate_step(step: u8) -> KilnResult<u8> {
    validate_index("step", step, 0, STEP_COUNT - 1)
}

fn offset(pattern: u8, step: u8) -> KilnResult<u16> {
    let pattern = validate_pattern(pattern)?;
    let step = validate_step(step)?;
    Ok(u16::from(pattern) * u16::from(STEP_COUNT) + u16::from(step))
}

/// Address of the step temperature register
pub fn temp_address(pattern: u8, step: u8) -> KilnResult<u16> {
    Ok(PATTERN_TEMP_BASE + offset(pattern, step)?)
}

/// Address of the step time register
pub fn time_address(pattern: u8, step: u8) -> KilnResult<u16> {
    Ok(PATTERN_TIME_BASE + offset(pattern, step)?)
}

/// Register settings kept once per pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSetting {
    /// Last step executed before the pattern ends (0..=7)
    ActualStepCount,
    /// Extra repetitions of the pattern (0..=99)
    CycleCount,
    /// Pattern run next; 8 ends the program
    LinkPattern,
}

impl PatternSetting {
    pub fn base_address(self) -> u16 {
        match self {
            PatternSetting::ActualStepCount => 0x1040,
            PatternSetting::CycleCount => 0x1050,
            PatternSetting::LinkPattern => 0x1060,
        }
    }

    pub fn domain(self) -> RawDomain {
        match self {
            PatternSetting::ActualStepCount => RawDomain::new(0, 7),
            PatternSetting::CycleCount => RawDomain::new(0, 99),
            PatternSetting::LinkPattern => RawDomain::new(0, 8),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PatternSetting::ActualStepCount => "actual_step_count",
            PatternSetting::CycleCount => "cycle_count",
            PatternSetting::LinkPattern => "link_pattern",
        }
    }

    /// Register address of this setting for `pattern`
    pub fn address(self, pattern: u8) -> KilnResult<u16> {
        let pattern = validate_pattern(pattern)?;
        Ok(self.base_address() + u16::from(pattern))
    }
}
