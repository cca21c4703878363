//! Modbus RTU constants used by the kiln controller link

/// Maximum PDU size (function code + data)
pub const MAX_PDU_SIZE: usize = 253;

/// Slave id + CRC around the PDU
pub const RTU_OVERHEAD: usize = 3;

/// Shortest valid RTU frame (slave, fc, one data byte, crc)
pub const MIN_RTU_FRAME: usize = 4;

pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Set on the function code of an exception reply
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Coil payloads for FC05
pub const COIL_ON: u16 = 0xFF00;
pub const COIL_OFF: u16 = 0x0000;

pub const EXC_ILLEGAL_FUNCTION: u8 = 0x01;
pub const EXC_ILLEGAL_DATA_ADDRESS: u8 = 0x02;
pub const EXC_ILLEGAL_DATA_VALUE: u8 = 0x03;

/// Modbus broadcast id, never valid for a request expecting a reply
pub const BROADCAST_SLAVE: u8 = 0;
pub const MAX_SLAVE_ID: u8 = 247;
