//! Blocking serial port for the RTU master

use std::io::{self, Read, Write};
use std::time::Duration;

use errors::{KilnError, KilnResult};
use serde::{Deserialize, Serialize};
use tokio_serial::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, error, info};

use crate::constants::{BROADCAST_SLAVE, MAX_SLAVE_ID};
use crate::master::RtuPort;

/// Controller does not answer reliably below this
pub const MIN_TIMEOUT_MS: u64 = 300;

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD_RATE: u32 = 38400;
pub const DEFAULT_SLAVE_ID: u8 = 1;

/// Serial line settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    /// "None", "Even" or "Odd"
    pub parity: String,
    pub stop_bits: u8,
    pub slave_id: u8,
    pub timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            parity: "None".to_string(),
            stop_bits: 1,
            slave_id: DEFAULT_SLAVE_ID,
            timeout_ms: MIN_TIMEOUT_MS,
        }
    }
}

impl SerialSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> KilnResult<()> {
        if self.port.trim().is_empty() {
            return Err(KilnError::config("serial.port must not be empty"));
        }
        if self.baud_rate == 0 {
            return Err(KilnError::config("serial.baud_rate must be positive"));
        }
        if self.timeout_ms < MIN_TIMEOUT_MS {
            return Err(KilnError::config(format!(
                "serial.timeout_ms {} below minimum {}",
                self.timeout_ms, MIN_TIMEOUT_MS
            )));
        }
        if self.slave_id == BROADCAST_SLAVE || self.slave_id > MAX_SLAVE_ID {
            return Err(KilnError::config(format!(
                "serial.slave_id {} not in [1, {}]",
                self.slave_id, MAX_SLAVE_ID
            )));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(KilnError::config(format!(
                "serial.data_bits {} not in [5, 8]",
                self.data_bits
            )));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(KilnError::config(format!(
                "serial.stop_bits {} not in [1, 2]",
                self.stop_bits
            )));
        }
        parse_parity(&self.parity)?;
        Ok(())
    }
}

fn parse_parity(parity: &str) -> KilnResult<Parity> {
    match parity {
        "None" | "none" | "N" => Ok(Parity::None),
        "Even" | "even" | "E" => Ok(Parity::Even),
        "Odd" | "odd" | "O" => Ok(Parity::Odd),
        other => Err(KilnError::config(format!("unknown serial.parity '{}'", other))),
    }
}

fn data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

fn stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

/// Open serial port with a read timeout
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub fn open(settings: &SerialSettings) -> KilnResult<Self> {
        debug!("RTU: {} @{}baud", settings.port, settings.baud_rate);

        let parity = parse_parity(&settings.parity)?;
        match tokio_serial::new(settings.port.as_str(), settings.baud_rate)
            .data_bits(data_bits(settings.data_bits))
            .parity(parity)
            .stop_bits(stop_bits(settings.stop_bits))
            .timeout(settings.timeout())
            .open()
        {
            Ok(port) => {
                info!("RTU opened: {}", settings.port);
                Ok(Self { port })
            },
            Err(e) => {
                error!("RTU err: {} - {}", settings.port, e);
                Err(KilnError::io(format!(
                    "Failed to open serial port {}: {}",
                    settings.port, e
                )))
            },
        }
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl RtuPort for SerialLink {
    fn discard_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}
