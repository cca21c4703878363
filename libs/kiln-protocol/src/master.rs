//! Blocking Modbus RTU master
//!
//! One request, one reply, no retries. The port's own read timeout bounds
//! every exchange; a reply that does not arrive completely in time, or a
//! serial line that fails mid-exchange, is a `TransportTimeout`. Anything
//! malformed is a `FrameError`.

use std::io::{self, Read, Write};

use errors::{KilnError, KilnResult};
use tracing::{debug, warn};

use crate::constants::EXCEPTION_FLAG;
use crate::frame::{build_rtu_frame, exception_error, parse_rtu_frame, remaining_after_header};
use crate::pdu::{ModbusPdu, PduBuilder};

/// Byte transport under an RTU master
pub trait RtuPort: Read + Write + Send {
    /// Drop unread input so a stale reply cannot answer the next request
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: RtuPort + ?Sized> RtuPort for Box<T> {
    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }
}

pub struct RtuMaster<P> {
    port: P,
    slave: u8,
}

impl<P: RtuPort> RtuMaster<P> {
    pub fn new(port: P, slave: u8) -> Self {
        Self { port, slave }
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Send one request and return the validated reply PDU
    pub fn transact(&mut self, request: &ModbusPdu) -> KilnResult<ModbusPdu> {
        let request_fc = request.function_code().unwrap_or(0);
        let frame = build_rtu_frame(self.slave, request);

        self.port
            .discard_input()
            .map_err(|e| self.link_error("discard input", &e))?;
        self.port
            .write_all(&frame)
            .map_err(|e| self.link_error("send request", &e))?;
        self.port
            .flush()
            .map_err(|e| self.link_error("flush request", &e))?;
        debug!("RTU tx: {:02X?}", frame);

        let reply = self.read_reply()?;
        debug!("RTU rx: {:02X?}", reply);

        let (slave, pdu) = parse_rtu_frame(&reply)?;
        if slave != self.slave {
            return Err(KilnError::frame(format!(
                "reply from slave {}, expected {}",
                slave, self.slave
            )));
        }

        let reply_fc = pdu.function_code().unwrap_or(0);
        if reply_fc & !EXCEPTION_FLAG != request_fc {
            return Err(KilnError::frame(format!(
                "function code mismatch: sent {:02X}, got {:02X}",
                request_fc, reply_fc
            )));
        }
        if pdu.is_exception() {
            let err = exception_error(&pdu);
            warn!("RTU exception: {}", err);
            return Err(err);
        }

        Ok(pdu)
    }

    fn read_reply(&mut self) -> KilnResult<Vec<u8>> {
        let mut reply = vec![0u8; 2];
        self.read_into(&mut reply[..])?;

        let fc = reply[1];
        let byte_count = if fc & EXCEPTION_FLAG == 0 && matches!(fc, 0x01..=0x04) {
            let mut count = [0u8; 1];
            self.read_into(&mut count)?;
            reply.push(count[0]);
            Some(count[0])
        } else {
            None
        };

        let remaining = remaining_after_header(fc, byte_count)?;
        let start = reply.len();
        reply.resize(start + remaining, 0);
        self.read_into(&mut reply[start..])?;
        Ok(reply)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> KilnResult<()> {
        let slave = self.slave;
        self.port.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::UnexpectedEof => {
                KilnError::timeout(format!(
                    "no complete reply from slave {slave} within timeout"
                ))
            },
            _ => link_failure(slave, "read reply", &e),
        })
    }

    fn link_error(&self, step: &str, e: &io::Error) -> KilnError {
        link_failure(self.slave, step, e)
    }

    /// FC03, quantity 1
    pub fn read_holding_register(&mut self, address: u16) -> KilnResult<u16> {
        let reply = self.transact(&PduBuilder::read_holding_register(address)?)?;
        if reply.len() != 4 || reply.as_slice()[1] != 2 {
            return Err(KilnError::frame(format!(
                "unexpected FC03 payload for 0x{:04X}: {:02X?}",
                address,
                reply.as_slice()
            )));
        }
        reply.u16_at(2)
    }

    /// FC02, quantity 1
    pub fn read_discrete_input(&mut self, address: u16) -> KilnResult<bool> {
        let reply = self.transact(&PduBuilder::read_discrete_input(address)?)?;
        match reply.as_slice() {
            [_, 1, bits] => Ok(bits & 0x01 != 0),
            other => Err(KilnError::frame(format!(
                "unexpected FC02 payload for 0x{:04X}: {:02X?}",
                address, other
            ))),
        }
    }

    /// FC06; the reply must echo address and value
    pub fn write_single_register(&mut self, address: u16, word: u16) -> KilnResult<()> {
        let request = PduBuilder::write_single_register(address, word)?;
        let reply = self.transact(&request)?;
        Self::check_echo(&request, &reply)
    }

    /// FC05; the reply must echo address and value
    pub fn write_single_coil(&mut self, address: u16, on: bool) -> KilnResult<()> {
        let request = PduBuilder::write_single_coil(address, on)?;
        let reply = self.transact(&request)?;
        Self::check_echo(&request, &reply)
    }

    fn check_echo(request: &ModbusPdu, reply: &ModbusPdu) -> KilnResult<()> {
        if request.as_slice() == reply.as_slice() {
            Ok(())
        } else {
            Err(KilnError::frame(format!(
                "write echo mismatch: sent {:02X?}, got {:02X?}",
                request.as_slice(),
                reply.as_slice()
            )))
        }
    }
}

/// A serial line that broke mid-exchange is reported like a silent device
fn link_failure(slave: u8, step: &str, e: &io::Error) -> KilnError {
    warn!("RTU link failure ({}) with slave {}: {}", step, slave, e);
    KilnError::timeout(format!("serial link to slave {slave} failed to {step}: {e}"))
}
