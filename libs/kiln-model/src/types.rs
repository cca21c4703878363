//! Value types returned by composite device operations

use serde::{Deserialize, Serialize};

/// One step of a pattern program
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternStep {
    /// Target temperature, 0.1 resolution
    pub temperature: f64,
    /// Step duration in whole units
    pub time: u16,
}

/// All steps of one pattern, indexed by step number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub pattern: u8,
    pub steps: Vec<PatternStep>,
}

/// Where the running program currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramStatus {
    pub executing_pattern: u16,
    pub executing_step: u16,
    pub step_time_left_min: u16,
    pub step_time_left_sec: u16,
}

/// Front panel indicator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedStatus {
    /// Raw LED status word (0x102A)
    pub raw: u16,
    pub at: bool,
    pub out1: bool,
    pub out2: bool,
    pub alarm1: bool,
    pub alarm2: bool,
    pub alarm3: bool,
    pub deg_f: bool,
    pub deg_c: bool,
}

/// Front panel key state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStatus {
    pub set: bool,
    pub function: bool,
    pub up: bool,
    pub down: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlarmLimits {
    pub alarm: u8,
    pub upper: f64,
    pub lower: f64,
}

/// Controller configuration read in one call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub control_method: f64,
    pub heating_cooling: f64,
    pub sensor_type: f64,
    pub lock_status: f64,
    pub pid_selection: f64,
    pub analog_decimal: f64,
    pub system_alarm: f64,
    pub temp_unit: bool,
    pub valve_feedback: bool,
    pub at_valve_feedback: bool,
    pub decimal_point: bool,
    pub at_setting: bool,
    pub run_stop: bool,
    pub stop_pid: bool,
    pub temp_stop_pid: bool,
}
