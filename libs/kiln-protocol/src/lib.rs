//! Modbus RTU plumbing for the kiln controller
//!
//! - `pdu`: request/response PDUs and builders for FC02/03/05/06
//! - `frame`: RTU framing and CRC16
//! - `master`: blocking request/response master over any [`RtuPort`]
//! - `serial`: serial port settings and the real port
//! - `sim`: simulated controller speaking the same frames

pub mod constants;
pub mod frame;
pub mod master;
pub mod pdu;
pub mod serial;
pub mod sim;

pub use master::{RtuMaster, RtuPort};
pub use pdu::{ModbusPdu, PduBuilder};
pub use serial::{SerialLink, SerialSettings};
pub use sim::SimulatedController;
