//! Register map of the Delta DTB controller
//!
//! One immutable table binds every logical parameter to its address, implied
//! decimals, access mode and register kind. Everything else refers to
//! parameters by [`Parameter`] or by their snake_case name.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use errors::{KilnError, KilnResult};
use serde::{Deserialize, Serialize};

use crate::pattern::{validate_index, PatternSetting};
use crate::scale::RawDomain;

/// Word (holding register) addresses for parameters and per-pattern settings
pub const SETTING_WORDS: RangeInclusive<u16> = 0x1000..=0x1067;
/// Word addresses of the pattern temperature and time blocks
pub const PATTERN_WORDS: RangeInclusive<u16> = 0x2000..=0x20FF;
/// Bit addresses (discrete inputs and coils)
pub const BITS: RangeInclusive<u16> = 0x0800..=0x0818;

pub fn is_word_address(address: u16) -> bool {
    SETTING_WORDS.contains(&address) || PATTERN_WORDS.contains(&address)
}

pub fn is_bit_address(address: u16) -> bool {
    BITS.contains(&address)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Register kind with its value domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    /// 16-bit holding register with a raw integer domain
    Word(RawDomain),
    /// Single bit, boolean domain, no scaling
    Bit,
}

/// Static description of one logical parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    pub parameter: Parameter,
    pub name: &'static str,
    pub address: u16,
    pub decimals: u8,
    pub access: Access,
    pub kind: RegisterKind,
}

impl ParameterSpec {
    pub fn is_writable(&self) -> bool {
        self.access == Access::ReadWrite
    }

    pub fn is_bit(&self) -> bool {
        matches!(self.kind, RegisterKind::Bit)
    }

    /// Raw domain of a word parameter, `InvalidParameter` for bits
    pub fn word_domain(&self) -> KilnResult<RawDomain> {
        match self.kind {
            RegisterKind::Word(domain) => Ok(domain),
            RegisterKind::Bit => Err(KilnError::invalid_parameter(
                self.name,
                "bit parameter used with a register operation",
            )),
        }
    }

    pub fn ensure_bit(&self) -> KilnResult<()> {
        match self.kind {
            RegisterKind::Bit => Ok(()),
            RegisterKind::Word(_) => Err(KilnError::invalid_parameter(
                self.name,
                "register parameter used with a bit operation",
            )),
        }
    }

    pub fn ensure_writable(&self) -> KilnResult<()> {
        if self.is_writable() {
            Ok(())
        } else {
            Err(KilnError::invalid_parameter(self.name, "parameter is read-only"))
        }
    }
}

/// Word register with its scaling, resolved from a parameter or a pattern slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordRegister {
    /// Name used in error messages
    pub label: &'static str,
    pub address: u16,
    pub decimals: u8,
    pub domain: RawDomain,
}

impl WordRegister {
    /// Register behind a word parameter, `InvalidParameter` for bits
    pub fn of(parameter: Parameter) -> KilnResult<Self> {
        let spec = parameter.spec();
        Ok(Self {
            label: spec.name,
            address: spec.address,
            decimals: spec.decimals,
            domain: spec.word_domain()?,
        })
    }

    /// Temperature register of a pattern step
    pub fn step_temperature(pattern: u8, step: u8) -> KilnResult<Self> {
        Ok(Self {
            label: "step_temperature",
            address: crate::pattern::temp_address(pattern, step)?,
            decimals: crate::pattern::STEP_TEMP_DECIMALS,
            domain: crate::pattern::STEP_TEMP_DOMAIN,
        })
    }

    /// Time register of a pattern step
    pub fn step_time(pattern: u8, step: u8) -> KilnResult<Self> {
        Ok(Self {
            label: "step_time",
            address: crate::pattern::time_address(pattern, step)?,
            decimals: crate::pattern::STEP_TIME_DECIMALS,
            domain: crate::pattern::STEP_TIME_DOMAIN,
        })
    }

    /// Per-pattern setting register
    pub fn pattern_setting(setting: PatternSetting, pattern: u8) -> KilnResult<Self> {
        Ok(Self {
            label: setting.name(),
            address: setting.address(pattern)?,
            decimals: 0,
            domain: setting.domain(),
        })
    }

    /// Scale `value` into the wire word for this register
    pub fn encode(&self, value: f64) -> KilnResult<u16> {
        let raw = crate::scale::to_raw(self.label, value, self.decimals, self.domain)?;
        Ok(self.domain.encode(raw))
    }

    /// Scale a wire word read from this register
    pub fn decode(&self, word: u16) -> f64 {
        crate::scale::to_value(self.domain.decode(word), self.decimals)
    }
}

macro_rules! register_map {
    (
        words { $( $wv:ident => $wn:literal, $wa:literal, $wd:literal, $wacc:ident, $wdom:expr; )* }
        bits { $( $bv:ident => $bn:literal, $ba:literal, $bacc:ident; )* }
    ) => {
        /// Logical parameter of the controller
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Parameter {
            $( #[serde(rename = $wn)] $wv, )*
            $( #[serde(rename = $bn)] $bv, )*
        }

        /// Every parameter, in declaration order
        pub static REGISTER_MAP: &[ParameterSpec] = &[
            $(
                ParameterSpec {
                    parameter: Parameter::$wv,
                    name: $wn,
                    address: $wa,
                    decimals: $wd,
                    access: Access::$wacc,
                    kind: RegisterKind::Word($wdom),
                },
            )*
            $(
                ParameterSpec {
                    parameter: Parameter::$bv,
                    name: $bn,
                    address: $ba,
                    decimals: 0,
                    access: Access::$bacc,
                    kind: RegisterKind::Bit,
                },
            )*
        ];
    };
}

const fn d(min: i32, max: i32) -> RawDomain {
    RawDomain::new(min, max)
}

const TEMP: RawDomain = d(-999, 9999);

register_map! {
    words {
        ProcessValue => "process_value", 0x1000, 1, ReadOnly, RawDomain::I16;
        Setpoint => "setpoint", 0x1001, 1, ReadWrite, TEMP;
        UpperLimitTempRange => "upper_limit_temp_range", 0x1002, 1, ReadWrite, TEMP;
        LowerLimitTempRange => "lower_limit_temp_range", 0x1003, 1, ReadWrite, TEMP;
        SensorType => "sensor_type", 0x1004, 0, ReadWrite, d(0, 17);
        ControlMethod => "control_method", 0x1005, 0, ReadWrite, d(0, 3);
        HeatingCoolingSelection => "heating_cooling_selection", 0x1006, 0, ReadWrite, d(0, 3);
        HeatingCoolingCycle1 => "heating_cooling_cycle_1", 0x1007, 0, ReadWrite, d(0, 99);
        HeatingCoolingCycle2 => "heating_cooling_cycle_2", 0x1008, 0, ReadWrite, d(0, 99);
        ProportionalBand => "proportional_band", 0x1009, 1, ReadWrite, d(1, 9999);
        IntegralTime => "integral_time", 0x100A, 1, ReadWrite, d(0, 9999);
        DerivativeTime => "derivative_time", 0x100B, 1, ReadWrite, d(0, 9999);
        IntegrationDefault => "integration_default", 0x100C, 1, ReadWrite, d(0, 1000);
        PdControlOffset => "pd_control_offset", 0x100D, 1, ReadWrite, d(0, 1000);
        CoefSetting => "coef_setting", 0x100E, 2, ReadWrite, d(1, 9999);
        DeadBand => "dead_band", 0x100F, 0, ReadWrite, TEMP;
        HysteresisOutput1 => "hysteresis_output_1", 0x1010, 0, ReadWrite, d(0, 9999);
        HysteresisOutput2 => "hysteresis_output_2", 0x1011, 0, ReadWrite, d(0, 9999);
        Output1Value => "output_1_value", 0x1012, 1, ReadWrite, d(0, 1000);
        Output2Value => "output_2_value", 0x1013, 1, ReadWrite, d(0, 1000);
        UpperLimitAnalog => "upper_limit_analog", 0x1014, 0, ReadWrite, RawDomain::U16;
        LowerLimitAnalog => "lower_limit_analog", 0x1015, 0, ReadWrite, RawDomain::U16;
        TemperatureRegulation => "temperature_regulation", 0x1016, 1, ReadWrite, d(-999, 999);
        AnalogDecimalSetting => "analog_decimal_setting", 0x1017, 0, ReadWrite, d(0, 3);
        ValveTime => "valve_time", 0x1018, 1, ReadWrite, d(1, 9999);
        ValveDeadBand => "valve_dead_band", 0x1019, 1, ReadWrite, d(0, 1000);
        ValveFeedbackUpperLimit => "valve_feedback_upper_limit", 0x101A, 0, ReadWrite, d(0, 1024);
        ValveFeedbackLowerLimit => "valve_feedback_lower_limit", 0x101B, 0, ReadWrite, d(0, 1024);
        PidParameterSelection => "pid_parameter_selection", 0x101C, 0, ReadWrite, d(0, 4);
        SvForPid => "sv_for_pid", 0x101D, 1, ReadOnly, RawDomain::I16;
        Alarm1Type => "alarm_1_type", 0x1020, 0, ReadWrite, d(0, 18);
        Alarm2Type => "alarm_2_type", 0x1021, 0, ReadWrite, d(0, 18);
        Alarm3Type => "alarm_3_type", 0x1022, 0, ReadWrite, d(0, 18);
        SystemAlarmSetting => "system_alarm_setting", 0x1023, 0, ReadWrite, d(0, 3);
        Alarm1Upper => "alarm_1_upper", 0x1024, 0, ReadWrite, TEMP;
        Alarm1Lower => "alarm_1_lower", 0x1025, 0, ReadWrite, TEMP;
        Alarm2Upper => "alarm_2_upper", 0x1026, 0, ReadWrite, TEMP;
        Alarm2Lower => "alarm_2_lower", 0x1027, 0, ReadWrite, TEMP;
        Alarm3Upper => "alarm_3_upper", 0x1028, 0, ReadWrite, TEMP;
        Alarm3Lower => "alarm_3_lower", 0x1029, 0, ReadWrite, TEMP;
        LedStatus => "led_status", 0x102A, 0, ReadOnly, RawDomain::U16;
        PushbuttonStatus => "pushbutton_status", 0x102B, 0, ReadOnly, RawDomain::U16;
        SettingLockStatus => "setting_lock_status", 0x102C, 0, ReadWrite, d(0, 11);
        CtReadValue => "ct_read_value", 0x102D, 1, ReadOnly, RawDomain::U16;
        FirmwareVersion => "firmware_version", 0x102F, 0, ReadOnly, RawDomain::U16;
        StartPatternNumber => "start_pattern_number", 0x1030, 0, ReadWrite, d(0, 7);
        StepTimeLeftSec => "step_time_left_sec", 0x1032, 0, ReadOnly, RawDomain::U16;
        StepTimeLeftMin => "step_time_left_min", 0x1033, 0, ReadOnly, RawDomain::U16;
        ExecutingStepNumber => "executing_step_number", 0x1034, 0, ReadOnly, RawDomain::U16;
        ExecutingPatternNumber => "executing_pattern_number", 0x1035, 0, ReadOnly, RawDomain::U16;
        DynamicSetValue => "dynamic_set_value", 0x1036, 1, ReadOnly, RawDomain::I16;
    }
    bits {
        LedAt => "led_at", 0x0800, ReadOnly;
        LedOut1 => "led_out1", 0x0801, ReadOnly;
        LedOut2 => "led_out2", 0x0802, ReadOnly;
        LedAlarm1 => "led_alarm1", 0x0803, ReadOnly;
        LedDegF => "led_deg_f", 0x0804, ReadOnly;
        LedDegC => "led_deg_c", 0x0805, ReadOnly;
        LedAlarm2 => "led_alarm2", 0x0806, ReadOnly;
        LedAlarm3 => "led_alarm3", 0x0807, ReadOnly;
        KeySet => "key_set", 0x0808, ReadOnly;
        KeyFunction => "key_function", 0x0809, ReadOnly;
        KeyUp => "key_up", 0x080A, ReadOnly;
        KeyDown => "key_down", 0x080B, ReadOnly;
        Event1 => "event_1", 0x080C, ReadOnly;
        Event2 => "event_2", 0x080D, ReadOnly;
        SystemAlarm => "system_alarm", 0x080E, ReadOnly;
        CommunicationWriteIn => "communication_write_in", 0x0810, ReadWrite;
        TempUnitDisplay => "temp_unit_display", 0x0811, ReadWrite;
        DecimalPointPosition => "decimal_point_position", 0x0812, ReadWrite;
        AtSetting => "at_setting", 0x0813, ReadWrite;
        RunStop => "run_stop", 0x0814, ReadWrite;
        StopPidProgram => "stop_pid_program", 0x0815, ReadWrite;
        TemporarilyStopPid => "temporarily_stop_pid", 0x0816, ReadWrite;
        ValveFeedbackSetting => "valve_feedback_setting", 0x0817, ReadWrite;
        AutoTuningValveFeedback => "auto_tuning_valve_feedback", 0x0818, ReadWrite;
    }
}

impl Parameter {
    pub fn spec(self) -> &'static ParameterSpec {
        &REGISTER_MAP[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn address(self) -> u16 {
        self.spec().address
    }

    pub fn all() -> impl Iterator<Item = Parameter> {
        REGISTER_MAP.iter().map(|spec| spec.parameter)
    }

    /// Alarm type register for alarm 1..=3
    pub fn alarm_type(alarm: u8) -> KilnResult<Self> {
        const TYPES: [Parameter; 3] = [
            Parameter::Alarm1Type,
            Parameter::Alarm2Type,
            Parameter::Alarm3Type,
        ];
        Ok(TYPES[alarm_slot(alarm)?])
    }

    /// Upper limit register for alarm 1..=3
    pub fn alarm_upper(alarm: u8) -> KilnResult<Self> {
        const UPPER: [Parameter; 3] = [
            Parameter::Alarm1Upper,
            Parameter::Alarm2Upper,
            Parameter::Alarm3Upper,
        ];
        Ok(UPPER[alarm_slot(alarm)?])
    }

    /// Lower limit register for alarm 1..=3
    pub fn alarm_lower(alarm: u8) -> KilnResult<Self> {
        const LOWER: [Parameter; 3] = [
            Parameter::Alarm1Lower,
            Parameter::Alarm2Lower,
            Parameter::Alarm3Lower,
        ];
        Ok(LOWER[alarm_slot(alarm)?])
    }

    /// Output value register for output 1..=2
    pub fn output_value(output: u8) -> KilnResult<Self> {
        validate_index("output", output, 1, 2)?;
        Ok(if output == 1 {
            Parameter::Output1Value
        } else {
            Parameter::Output2Value
        })
    }
}

fn alarm_slot(alarm: u8) -> KilnResult<usize> {
    validate_index("alarm", alarm, 1, 3).map(|i| usize::from(i) - 1)
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = KilnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::all()
            .find(|parameter| parameter.name() == s)
            .ok_or_else(|| KilnError::invalid_parameter(s, "unknown parameter"))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_order_matches_discriminants() {
        for (i, spec) in REGISTER_MAP.iter().enumerate() {
            assert_eq!(spec.parameter as usize, i, "{}", spec.name);
            assert_eq!(spec.parameter.spec().name, spec.name);
        }
    }

    #[test]
    fn test_addresses_unique_and_in_range() {
        let mut words = HashSet::new();
        let mut bits = HashSet::new();
        for spec in REGISTER_MAP {
            if spec.is_bit() {
                assert!(is_bit_address(spec.address), "{}", spec.name);
                assert!(bits.insert(spec.address), "duplicate bit {}", spec.name);
            } else {
                assert!(is_word_address(spec.address), "{}", spec.name);
                assert!(words.insert(spec.address), "duplicate word {}", spec.name);
            }
        }
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!("setpoint".parse::<Parameter>().unwrap(), Parameter::Setpoint);
        assert_eq!(Parameter::Setpoint.address(), 0x1001);
        assert_eq!(Parameter::Setpoint.spec().decimals, 1);
        assert_eq!(Parameter::CoefSetting.spec().decimals, 2);
        assert_eq!(Parameter::RunStop.to_string(), "run_stop");

        let err = "no_such_thing".parse::<Parameter>().unwrap_err();
        assert!(matches!(err, KilnError::InvalidParameter { .. }));
    }

    #[test]
    fn test_serde_names_match_table() {
        for param in Parameter::all() {
            let json = serde_json::to_value(param).unwrap();
            assert_eq!(json, serde_json::Value::String(param.name().to_string()));
        }
        let p: Parameter = serde_json::from_str("\"alarm_2_upper\"").unwrap();
        assert_eq!(p.address(), 0x1026);
    }

    #[test]
    fn test_access_and_kind_checks() {
        let pv = Parameter::ProcessValue.spec();
        assert!(matches!(pv.ensure_writable(), Err(KilnError::InvalidParameter { .. })));
        assert!(pv.ensure_bit().is_err());
        assert!(pv.word_domain().is_ok());

        let led = Parameter::LedAt.spec();
        assert!(led.word_domain().is_err());
        assert!(led.ensure_bit().is_ok());
        assert!(led.ensure_writable().is_err());

        assert!(Parameter::RunStop.spec().ensure_writable().is_ok());
    }

    #[test]
    fn test_alarm_and_output_helpers() {
        assert_eq!(Parameter::alarm_type(1).unwrap(), Parameter::Alarm1Type);
        assert_eq!(Parameter::alarm_upper(3).unwrap().address(), 0x1028);
        assert_eq!(Parameter::alarm_lower(2).unwrap().address(), 0x1027);
        assert_eq!(Parameter::output_value(2).unwrap(), Parameter::Output2Value);

        for bad in [0u8, 4] {
            let err = Parameter::alarm_type(bad).unwrap_err();
            assert!(matches!(err, KilnError::InvalidIndex { min: 1, max: 3, .. }));
        }
        assert!(matches!(
            Parameter::output_value(3),
            Err(KilnError::InvalidIndex { min: 1, max: 2, .. })
        ));
    }

    #[test]
    fn test_word_register_resolution() {
        let reg = WordRegister::of(Parameter::Setpoint).unwrap();
        assert_eq!(reg.encode(-5.0).unwrap(), 0xFFCE);
        assert_eq!(reg.decode(0xFFCE), -5.0);
        assert!(WordRegister::of(Parameter::RunStop).is_err());

        let temp = WordRegister::step_temperature(1, 2).unwrap();
        assert_eq!(temp.address, 0x200A);
        let time = WordRegister::step_time(1, 2).unwrap();
        assert_eq!(time.address, 0x208A);
        assert!(matches!(time.encode(901.0), Err(KilnError::OutOfRange { .. })));

        let link = WordRegister::pattern_setting(PatternSetting::LinkPattern, 4).unwrap();
        assert_eq!(link.address, 0x1064);
        assert!(link.encode(9.0).is_err());
    }
}
