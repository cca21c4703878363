//! RTU framing: `[slave][pdu][crc lo][crc hi]`

use errors::{KilnError, KilnResult};
use tracing::debug;

use crate::constants::{EXCEPTION_FLAG, MIN_RTU_FRAME, RTU_OVERHEAD};
use crate::pdu::ModbusPdu;

/// CRC16 checksum (Modbus RTU standard, poly 0xA001, init 0xFFFF)
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;

    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc >>= 1;
                crc ^= 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

/// Build RTU frame (slave id + PDU + CRC, CRC low byte first)
pub fn build_rtu_frame(slave: u8, pdu: &ModbusPdu) -> Vec<u8> {
    let mut frame = Vec::with_capacity(pdu.len() + RTU_OVERHEAD);
    frame.push(slave);
    frame.extend_from_slice(pdu.as_slice());

    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());

    debug!(
        "RTU frame: slave={}, FC={:02X}, len={}, CRC={:04X}",
        slave,
        pdu.function_code().unwrap_or(0),
        frame.len(),
        crc
    );
    frame
}

/// Parse an RTU frame, validating length and CRC
pub fn parse_rtu_frame(data: &[u8]) -> KilnResult<(u8, ModbusPdu)> {
    if data.len() < MIN_RTU_FRAME {
        return Err(KilnError::frame(format!(
            "RTU frame too short: {} bytes",
            data.len()
        )));
    }

    let body_len = data.len() - 2;
    let received = u16::from_le_bytes([data[body_len], data[body_len + 1]]);
    let calculated = crc16(&data[..body_len]);
    if received != calculated {
        return Err(KilnError::frame(format!(
            "CRC mismatch: expected 0x{calculated:04X}, got 0x{received:04X}"
        )));
    }

    let pdu = ModbusPdu::from_slice(&data[1..body_len])?;
    Ok((data[0], pdu))
}

/// Bytes still to read after `[slave][fc]`, and after the byte count for
/// read replies
pub fn remaining_after_header(fc: u8, byte_count: Option<u8>) -> KilnResult<usize> {
    if fc & EXCEPTION_FLAG != 0 {
        // exception code + crc
        return Ok(3);
    }
    match fc {
        // data + crc
        0x01..=0x04 => match byte_count {
            Some(n) => Ok(usize::from(n) + 2),
            None => Err(KilnError::frame("read reply without byte count")),
        },
        // echo of address + value, crc
        0x05 | 0x06 => Ok(6),
        other => Err(KilnError::frame(format!(
            "unsupported function code in reply: {:02X}",
            other
        ))),
    }
}

/// Get exception description
pub fn exception_description(exception_code: u8) -> &'static str {
    match exception_code {
        0x01 => "Illegal Function",
        0x02 => "Illegal Data Address",
        0x03 => "Illegal Data Value",
        0x04 => "Slave Device Failure",
        0x05 => "Acknowledge",
        0x06 => "Slave Device Busy",
        0x07 => "Negative Acknowledge",
        0x08 => "Memory Parity Error",
        0x0A => "Gateway Path Unavailable",
        0x0B => "Gateway Target Device Failed to Respond",
        _ => "Unknown Exception",
    }
}

/// Turn an exception reply into a `FrameError` naming the exception
pub fn exception_error(pdu: &ModbusPdu) -> KilnError {
    let fc = pdu.function_code().unwrap_or(0) & !EXCEPTION_FLAG;
    let code = pdu.exception_code().unwrap_or(0);
    KilnError::frame(format!(
        "Modbus exception {:02X} ({}) for FC{:02X}",
        code,
        exception_description(code),
        fc
    ))
}
