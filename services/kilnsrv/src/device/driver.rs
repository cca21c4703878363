//! Delta DTB driver over a blocking RTU master

use errors::{KilnError, KilnResult};
use kiln_model::register::{is_bit_address, is_word_address};
use kiln_model::{Parameter, PatternSetting, PatternStep, WordRegister};
use kiln_protocol::{RtuMaster, RtuPort};
use parking_lot::Mutex;
use tracing::debug;

use super::SyncKilnDevice;

/// Synchronous controller driver
///
/// The RTU master sits behind a mutex; each register transaction holds it
/// for one request/reply exchange only.
pub struct DeltaDriver<P> {
    master: Mutex<RtuMaster<P>>,
}

impl<P: RtuPort> DeltaDriver<P> {
    pub fn new(port: P, slave: u8) -> Self {
        Self {
            master: Mutex::new(RtuMaster::new(port, slave)),
        }
    }

    /// Read and scale one word register
    pub fn read_register(&self, register: WordRegister) -> KilnResult<f64> {
        check_word_address(register.address)?;
        let word = self.master.lock().read_holding_register(register.address)?;
        let value = register.decode(word);
        debug!("read {} @0x{:04X} = {}", register.label, register.address, value);
        Ok(value)
    }

    /// Scale and write one word register; the value is checked before any I/O
    pub fn write_register(&self, register: WordRegister, value: f64) -> KilnResult<()> {
        check_word_address(register.address)?;
        let word = register.encode(value)?;
        self.master
            .lock()
            .write_single_register(register.address, word)?;
        debug!("write {} @0x{:04X} = {}", register.label, register.address, value);
        Ok(())
    }

    pub fn read_bit(&self, address: u16) -> KilnResult<bool> {
        check_bit_address(address)?;
        self.master.lock().read_discrete_input(address)
    }

    pub fn write_bit(&self, address: u16, on: bool) -> KilnResult<()> {
        check_bit_address(address)?;
        self.master.lock().write_single_coil(address, on)
    }
}

fn check_word_address(address: u16) -> KilnResult<()> {
    if is_word_address(address) {
        Ok(())
    } else {
        Err(KilnError::invalid_parameter(
            format!("0x{address:04X}"),
            "not a register address of this controller",
        ))
    }
}

fn check_bit_address(address: u16) -> KilnResult<()> {
    if is_bit_address(address) {
        Ok(())
    } else {
        Err(KilnError::invalid_parameter(
            format!("0x{address:04X}"),
            "not a bit address of this controller",
        ))
    }
}

impl<P: RtuPort> SyncKilnDevice for DeltaDriver<P> {
    fn read_value(&self, parameter: Parameter) -> KilnResult<f64> {
        self.read_register(WordRegister::of(parameter)?)
    }

    fn write_value(&self, parameter: Parameter, value: f64) -> KilnResult<()> {
        let register = WordRegister::of(parameter)?;
        parameter.spec().ensure_writable()?;
        self.write_register(register, value)
    }

    fn read_flag(&self, parameter: Parameter) -> KilnResult<bool> {
        let spec = parameter.spec();
        spec.ensure_bit()?;
        self.read_bit(spec.address)
    }

    fn write_flag(&self, parameter: Parameter, on: bool) -> KilnResult<()> {
        let spec = parameter.spec();
        spec.ensure_bit()?;
        spec.ensure_writable()?;
        self.write_bit(spec.address, on)
    }

    fn get_pattern_step(&self, pattern: u8, step: u8) -> KilnResult<PatternStep> {
        let temperature = self.read_register(WordRegister::step_temperature(pattern, step)?)?;
        let time = self.read_register(WordRegister::step_time(pattern, step)?)?;
        Ok(PatternStep {
            temperature,
            time: time as u16,
        })
    }

    fn set_pattern_step(
        &self,
        pattern: u8,
        step: u8,
        temperature: f64,
        time: u16,
    ) -> KilnResult<()> {
        let temp_reg = WordRegister::step_temperature(pattern, step)?;
        let time_reg = WordRegister::step_time(pattern, step)?;
        // Both values must scale before the first write goes out
        temp_reg.encode(temperature)?;
        time_reg.encode(f64::from(time))?;

        self.write_register(temp_reg, temperature)?;
        self.write_register(time_reg, f64::from(time))
    }

    fn read_pattern_setting(&self, setting: PatternSetting, pattern: u8) -> KilnResult<u16> {
        let value = self.read_register(WordRegister::pattern_setting(setting, pattern)?)?;
        Ok(value as u16)
    }

    fn write_pattern_setting(
        &self,
        setting: PatternSetting,
        pattern: u8,
        value: u16,
    ) -> KilnResult<()> {
        self.write_register(
            WordRegister::pattern_setting(setting, pattern)?,
            f64::from(value),
        )
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use kiln_model::scale::RawDomain;
    use kiln_protocol::SimulatedController;

    fn driver() -> (SimulatedController, DeltaDriver<SimulatedController>) {
        let sim = SimulatedController::new(1);
        (sim.clone(), DeltaDriver::new(sim, 1))
    }

    #[test]
    fn test_signed_setpoint_round_trip() {
        let (sim, driver) = driver();
        driver.write_value(Parameter::Setpoint, -5.0).unwrap();
        assert_eq!(sim.word(0x1001), 0xFFCE);
        assert_eq!(driver.read_value(Parameter::Setpoint).unwrap(), -5.0);
    }

    #[test]
    fn test_two_decimal_parameter() {
        let (sim, driver) = driver();
        driver.write_value(Parameter::CoefSetting, 1.25).unwrap();
        assert_eq!(sim.word(0x100E), 125);
        assert_eq!(driver.read_value(Parameter::CoefSetting).unwrap(), 1.25);
    }

    #[test]
    fn test_read_only_write_rejected_without_io() {
        let (sim, driver) = driver();
        let err = driver.write_value(Parameter::ProcessValue, 30.0).unwrap_err();
        assert!(matches!(err, KilnError::InvalidParameter { .. }));
        let err = driver.write_flag(Parameter::LedAt, true).unwrap_err();
        assert!(matches!(err, KilnError::InvalidParameter { .. }));
        assert_eq!(sim.request_count(), 0);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let (sim, driver) = driver();
        assert!(matches!(
            driver.read_value(Parameter::RunStop),
            Err(KilnError::InvalidParameter { .. })
        ));
        assert!(matches!(
            driver.read_flag(Parameter::Setpoint),
            Err(KilnError::InvalidParameter { .. })
        ));
        assert_eq!(sim.request_count(), 0);
    }

    #[test]
    fn test_out_of_range_rejected_without_io() {
        let (sim, driver) = driver();
        let err = driver
            .write_value(Parameter::TemperatureRegulation, 100.0)
            .unwrap_err();
        assert!(matches!(err, KilnError::OutOfRange { min: -999, max: 999, .. }));
        assert_eq!(sim.request_count(), 0);
    }

    #[test]
    fn test_flags() {
        let (sim, driver) = driver();
        driver.write_flag(Parameter::RunStop, true).unwrap();
        assert!(sim.bit(0x0814));
        assert!(driver.read_flag(Parameter::RunStop).unwrap());
    }

    #[test]
    fn test_pattern_step_round_trip() {
        let (sim, driver) = driver();
        driver.set_pattern_step(7, 7, 1200.5, 900).unwrap();
        assert_eq!(sim.word(0x203F), 12005);
        assert_eq!(sim.word(0x20BF), 900);
        let step = driver.get_pattern_step(7, 7).unwrap();
        assert_eq!(step, PatternStep { temperature: 1200.5, time: 900 });
    }

    #[test]
    fn test_pattern_step_index_errors() {
        let (sim, driver) = driver();
        let err = driver.get_pattern_step(8, 0).unwrap_err();
        assert!(matches!(
            err,
            KilnError::InvalidIndex { ref index, value: 8, .. } if index == "pattern"
        ));
        let err = driver.set_pattern_step(0, 8, 10.0, 1).unwrap_err();
        assert!(matches!(
            err,
            KilnError::InvalidIndex { ref index, value: 8, .. } if index == "step"
        ));
        assert_eq!(sim.request_count(), 0);
    }

    #[test]
    fn test_pattern_step_time_checked_before_first_write() {
        let (sim, driver) = driver();
        let err = driver.set_pattern_step(0, 0, 10.0, 901).unwrap_err();
        assert!(matches!(err, KilnError::OutOfRange { .. }));
        assert_eq!(sim.word(0x2000), 0);
        assert_eq!(sim.request_count(), 0);
    }

    #[test]
    fn test_pattern_settings() {
        let (sim, driver) = driver();
        driver
            .write_pattern_setting(PatternSetting::CycleCount, 3, 42)
            .unwrap();
        assert_eq!(sim.word(0x1053), 42);
        assert_eq!(
            driver
                .read_pattern_setting(PatternSetting::CycleCount, 3)
                .unwrap(),
            42
        );
        assert!(driver
            .write_pattern_setting(PatternSetting::ActualStepCount, 0, 8)
            .is_err());
    }

    #[test]
    fn test_raw_register_address_checked() {
        let (_sim, driver) = driver();
        let bogus = WordRegister {
            label: "bogus",
            address: 0x3000,
            decimals: 0,
            domain: RawDomain::U16,
        };
        assert!(matches!(
            driver.read_register(bogus),
            Err(KilnError::InvalidParameter { .. })
        ));
        assert!(driver.read_bit(0x0900).is_err());
    }

    #[test]
    fn test_transport_errors_pass_through() {
        let (sim, driver) = driver();
        sim.set_silent(true);
        assert!(matches!(
            driver.read_value(Parameter::ProcessValue),
            Err(KilnError::TransportTimeout { .. })
        ));
        sim.set_silent(false);
        sim.force_exception(Some(0x02));
        assert!(matches!(
            driver.read_value(Parameter::ProcessValue),
            Err(KilnError::FrameError { .. })
        ));
    }
}
