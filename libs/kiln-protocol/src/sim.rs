//! In-memory stand-in for a Delta DTB controller on an RTU line
//!
//! The simulator speaks real RTU frames: requests are CRC-checked and
//! decoded, replies are encoded with their own CRC and handed back through
//! `Read`. Handles are cheap clones sharing one register image, so a test can
//! keep one handle for inspection and give another to the driver.
//!
//! Fault hooks cover the failure modes a real line produces: silence, reply
//! corruption and Modbus exceptions.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use kiln_model::register::{is_bit_address, is_word_address};
use kiln_model::Parameter;
use parking_lot::Mutex;
use tracing::debug;

use crate::constants::{
    COIL_OFF, COIL_ON, EXCEPTION_FLAG, EXC_ILLEGAL_DATA_ADDRESS, EXC_ILLEGAL_DATA_VALUE,
    EXC_ILLEGAL_FUNCTION, FC_READ_DISCRETE_INPUTS, FC_READ_HOLDING_REGISTERS,
    FC_WRITE_SINGLE_COIL, FC_WRITE_SINGLE_REGISTER,
};
use crate::frame::{build_rtu_frame, parse_rtu_frame};
use crate::master::RtuPort;
use crate::pdu::ModbusPdu;

/// Every request this controller understands is 8 bytes on the wire
const REQUEST_LEN: usize = 8;

/// Largest PV change per PV read when drift is enabled (raw, 0.1 deg)
const DRIFT_STEP: i32 = 5;

#[derive(Debug, Default)]
struct SimState {
    slave: u8,
    words: HashMap<u16, u16>,
    bits: HashMap<u16, bool>,
    rx: Vec<u8>,
    tx: VecDeque<u8>,
    latency: Option<Duration>,
    drift: bool,
    silent: bool,
    corrupt_replies: usize,
    forced_exception: Option<u8>,
    requests: usize,
}

#[derive(Debug, Clone)]
pub struct SimulatedController {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedController {
    /// Controller at `slave` with PV and SV at 25.0 and firmware V1.00
    pub fn new(slave: u8) -> Self {
        let mut state = SimState {
            slave,
            ..Default::default()
        };
        state.words.insert(Parameter::ProcessValue.address(), 250);
        state.words.insert(Parameter::Setpoint.address(), 250);
        state.words.insert(Parameter::FirmwareVersion.address(), 0x0100);
        state.words.insert(Parameter::ProportionalBand.address(), 47);
        state.words.insert(Parameter::CoefSetting.address(), 100);
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Block each transaction for `latency`, like a real serial exchange
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().latency = Some(latency);
        self
    }

    /// Move PV toward SV on every PV read
    pub fn with_drift(self) -> Self {
        self.state.lock().drift = true;
        self
    }

    pub fn word(&self, address: u16) -> u16 {
        self.state.lock().words.get(&address).copied().unwrap_or(0)
    }

    pub fn set_word(&self, address: u16, word: u16) {
        self.state.lock().words.insert(address, word);
    }

    pub fn bit(&self, address: u16) -> bool {
        self.state.lock().bits.get(&address).copied().unwrap_or(false)
    }

    pub fn set_bit(&self, address: u16, on: bool) {
        self.state.lock().bits.insert(address, on);
    }

    /// Stop answering until cleared
    pub fn set_silent(&self, silent: bool) {
        self.state.lock().silent = silent;
    }

    /// Flip a CRC byte in the next `count` replies
    pub fn corrupt_next_replies(&self, count: usize) {
        self.state.lock().corrupt_replies = count;
    }

    /// Answer every request with this exception code until cleared
    pub fn force_exception(&self, code: Option<u8>) {
        self.state.lock().forced_exception = code;
    }

    /// Number of well-formed requests addressed to this slave
    pub fn request_count(&self) -> usize {
        self.state.lock().requests
    }
}

impl SimState {
    fn handle_frame(&mut self, frame: &[u8]) {
        let (slave, request) = match parse_rtu_frame(frame) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("sim: dropping request: {}", e);
                return;
            },
        };
        if slave != self.slave {
            return;
        }
        self.requests += 1;
        if self.silent {
            return;
        }

        let reply = match self.forced_exception {
            Some(code) => exception_reply(&request, code),
            None => self.execute(&request),
        };

        let mut bytes = build_rtu_frame(self.slave, &reply);
        if self.corrupt_replies > 0 {
            self.corrupt_replies -= 1;
            if let Some(last) = bytes.last_mut() {
                *last ^= 0xFF;
            }
        }
        self.tx.extend(bytes);
    }

    fn execute(&mut self, request: &ModbusPdu) -> ModbusPdu {
        let fc = request.function_code().unwrap_or(0);
        let (Ok(address), Ok(value)) = (request.u16_at(1), request.u16_at(3)) else {
            return exception_reply(request, EXC_ILLEGAL_DATA_VALUE);
        };

        match fc {
            FC_READ_HOLDING_REGISTERS if value == 1 => {
                if !is_word_address(address) {
                    return exception_reply(request, EXC_ILLEGAL_DATA_ADDRESS);
                }
                if address == Parameter::ProcessValue.address() && self.drift {
                    self.drift_pv();
                }
                let word = self.words.get(&address).copied().unwrap_or(0);
                let [hi, lo] = word.to_be_bytes();
                pdu(&[fc, 2, hi, lo])
            },
            FC_READ_DISCRETE_INPUTS if value == 1 => {
                if !is_bit_address(address) {
                    return exception_reply(request, EXC_ILLEGAL_DATA_ADDRESS);
                }
                let on = self.bits.get(&address).copied().unwrap_or(false);
                pdu(&[fc, 1, u8::from(on)])
            },
            FC_WRITE_SINGLE_REGISTER => {
                if !is_word_address(address) {
                    return exception_reply(request, EXC_ILLEGAL_DATA_ADDRESS);
                }
                self.words.insert(address, value);
                request.clone()
            },
            FC_WRITE_SINGLE_COIL => {
                if !is_bit_address(address) {
                    return exception_reply(request, EXC_ILLEGAL_DATA_ADDRESS);
                }
                match value {
                    COIL_ON => self.bits.insert(address, true),
                    COIL_OFF => self.bits.insert(address, false),
                    _ => return exception_reply(request, EXC_ILLEGAL_DATA_VALUE),
                };
                request.clone()
            },
            FC_READ_HOLDING_REGISTERS | FC_READ_DISCRETE_INPUTS => {
                exception_reply(request, EXC_ILLEGAL_DATA_VALUE)
            },
            _ => exception_reply(request, EXC_ILLEGAL_FUNCTION),
        }
    }

    fn drift_pv(&mut self) {
        let pv_addr = Parameter::ProcessValue.address();
        let pv = i32::from(self.words.get(&pv_addr).copied().unwrap_or(0) as i16);
        let sv = i32::from(
            self.words
                .get(&Parameter::Setpoint.address())
                .copied()
                .unwrap_or(0) as i16,
        );
        let next = pv + (sv - pv).clamp(-DRIFT_STEP, DRIFT_STEP);
        self.words.insert(pv_addr, next as u16);
    }
}

fn pdu(bytes: &[u8]) -> ModbusPdu {
    ModbusPdu::from_slice(bytes).unwrap_or_default()
}

fn exception_reply(request: &ModbusPdu, code: u8) -> ModbusPdu {
    let fc = request.function_code().unwrap_or(0);
    pdu(&[fc | EXCEPTION_FLAG, code])
}

impl Read for SimulatedController {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.tx.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no reply"));
        }
        let n = buf.len().min(state.tx.len());
        for (slot, byte) in buf.iter_mut().zip(state.tx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for SimulatedController {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let latency = {
            let mut state = self.state.lock();
            state.rx.extend_from_slice(buf);
            while state.rx.len() >= REQUEST_LEN {
                let frame: Vec<u8> = state.rx.drain(..REQUEST_LEN).collect();
                state.handle_frame(&frame);
            }
            state.latency
        };
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl RtuPort for SimulatedController {
    fn discard_input(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        state.tx.clear();
        state.rx.clear();
        Ok(())
    }
}
