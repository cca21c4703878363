//! Modbus PDU with a stack-allocated buffer
//!
//! Requests to the controller never exceed a handful of bytes, so the PDU
//! lives in a fixed array and avoids a heap allocation per transaction.

use errors::{KilnError, KilnResult};
use tracing::debug;

use crate::constants::{
    COIL_OFF, COIL_ON, EXCEPTION_FLAG, FC_READ_DISCRETE_INPUTS, FC_READ_HOLDING_REGISTERS,
    FC_WRITE_SINGLE_COIL, FC_WRITE_SINGLE_REGISTER, MAX_PDU_SIZE,
};

#[derive(Debug, Clone)]
pub struct ModbusPdu {
    data: [u8; MAX_PDU_SIZE],
    len: usize,
}

impl ModbusPdu {
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; MAX_PDU_SIZE],
            len: 0,
        }
    }

    pub fn from_slice(data: &[u8]) -> KilnResult<Self> {
        if data.len() > MAX_PDU_SIZE {
            return Err(KilnError::frame(format!(
                "PDU too large: {} bytes (max {})",
                data.len(),
                MAX_PDU_SIZE
            )));
        }

        let mut pdu = Self::new();
        pdu.data[..data.len()].copy_from_slice(data);
        pdu.len = data.len();
        Ok(pdu)
    }

    #[inline]
    pub fn push(&mut self, byte: u8) -> KilnResult<()> {
        if self.len >= MAX_PDU_SIZE {
            return Err(KilnError::frame("PDU buffer full"));
        }
        self.data[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    /// Push u16 in big-endian
    #[inline]
    pub fn push_u16(&mut self, value: u16) -> KilnResult<()> {
        self.push((value >> 8) as u8)?;
        self.push((value & 0xFF) as u8)
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn function_code(&self) -> Option<u8> {
        self.as_slice().first().copied()
    }

    #[inline]
    pub fn is_exception(&self) -> bool {
        self.function_code()
            .is_some_and(|fc| fc & EXCEPTION_FLAG != 0)
    }

    #[inline]
    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() {
            self.as_slice().get(1).copied()
        } else {
            None
        }
    }

    /// Big-endian u16 at `offset` within the PDU
    pub fn u16_at(&self, offset: usize) -> KilnResult<u16> {
        match self.as_slice().get(offset..offset + 2) {
            Some(&[hi, lo]) => Ok(u16::from_be_bytes([hi, lo])),
            _ => Err(KilnError::frame(format!(
                "PDU too short: need u16 at offset {}, have {} bytes",
                offset, self.len
            ))),
        }
    }

    pub fn function_code_description(fc: u8) -> &'static str {
        match fc & !EXCEPTION_FLAG {
            0x01 => "Read Coils",
            0x02 => "Read Discrete Inputs",
            0x03 => "Read Holding Registers",
            0x04 => "Read Input Registers",
            0x05 => "Write Single Coil",
            0x06 => "Write Single Register",
            0x0F => "Write Multiple Coils",
            0x10 => "Write Multiple Registers",
            _ => "Unknown Function",
        }
    }
}

impl Default for ModbusPdu {
    fn default() -> Self {
        Self::new()
    }
}

/// PDU builder - fluent API
pub struct PduBuilder {
    pdu: ModbusPdu,
}

impl Default for PduBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PduBuilder {
    #[inline]
    pub fn new() -> Self {
        Self {
            pdu: ModbusPdu::new(),
        }
    }

    #[inline]
    pub fn function_code(mut self, fc: u8) -> KilnResult<Self> {
        self.pdu.push(fc)?;
        Ok(self)
    }

    #[inline]
    pub fn address(mut self, addr: u16) -> KilnResult<Self> {
        self.pdu.push_u16(addr)?;
        Ok(self)
    }

    #[inline]
    pub fn quantity(mut self, qty: u16) -> KilnResult<Self> {
        self.pdu.push_u16(qty)?;
        Ok(self)
    }

    #[inline]
    pub fn value(mut self, value: u16) -> KilnResult<Self> {
        self.pdu.push_u16(value)?;
        Ok(self)
    }

    pub fn build(self) -> ModbusPdu {
        if let Some(fc) = self.pdu.function_code() {
            debug!(
                "PDU built: FC={:02X} ({}), len={}",
                fc,
                ModbusPdu::function_code_description(fc),
                self.pdu.len()
            );
        }
        self.pdu
    }

    /// FC03 read of a single holding register
    pub fn read_holding_register(address: u16) -> KilnResult<ModbusPdu> {
        Ok(PduBuilder::new()
            .function_code(FC_READ_HOLDING_REGISTERS)?
            .address(address)?
            .quantity(1)?
            .build())
    }

    /// FC02 read of a single discrete input
    pub fn read_discrete_input(address: u16) -> KilnResult<ModbusPdu> {
        Ok(PduBuilder::new()
            .function_code(FC_READ_DISCRETE_INPUTS)?
            .address(address)?
            .quantity(1)?
            .build())
    }

    /// FC06 write of one 16-bit word
    pub fn write_single_register(address: u16, word: u16) -> KilnResult<ModbusPdu> {
        Ok(PduBuilder::new()
            .function_code(FC_WRITE_SINGLE_REGISTER)?
            .address(address)?
            .value(word)?
            .build())
    }

    /// FC05 write of one coil (0xFF00 on, 0x0000 off)
    pub fn write_single_coil(address: u16, on: bool) -> KilnResult<ModbusPdu> {
        Ok(PduBuilder::new()
            .function_code(FC_WRITE_SINGLE_COIL)?
            .address(address)?
            .value(if on { COIL_ON } else { COIL_OFF })?
            .build())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_pdu_basic_operations() {
        let mut pdu = ModbusPdu::new();
        assert!(pdu.is_empty());

        pdu.push(0x03).unwrap();
        pdu.push_u16(0x1001).unwrap();
        pdu.push_u16(0x0001).unwrap();

        assert_eq!(pdu.len(), 5);
        assert_eq!(pdu.function_code(), Some(0x03));
        assert!(!pdu.is_exception());
        assert_eq!(pdu.u16_at(1).unwrap(), 0x1001);
        assert!(pdu.u16_at(4).is_err());
    }

    #[test]
    fn test_request_builders() {
        let pdu = PduBuilder::read_holding_register(0x1000).unwrap();
        assert_eq!(pdu.as_slice(), &[0x03, 0x10, 0x00, 0x00, 0x01]);

        let pdu = PduBuilder::read_discrete_input(0x0814).unwrap();
        assert_eq!(pdu.as_slice(), &[0x02, 0x08, 0x14, 0x00, 0x01]);

        let pdu = PduBuilder::write_single_register(0x1001, 0xFFCE).unwrap();
        assert_eq!(pdu.as_slice(), &[0x06, 0x10, 0x01, 0xFF, 0xCE]);

        let pdu = PduBuilder::write_single_coil(0x0814, true).unwrap();
        assert_eq!(pdu.as_slice(), &[0x05, 0x08, 0x14, 0xFF, 0x00]);
        let pdu = PduBuilder::write_single_coil(0x0814, false).unwrap();
        assert_eq!(pdu.as_slice(), &[0x05, 0x08, 0x14, 0x00, 0x00]);
    }

    #[test]
    fn test_exception_response() {
        let pdu = ModbusPdu::from_slice(&[0x83, 0x02]).unwrap();
        assert!(pdu.is_exception());
        assert_eq!(pdu.exception_code(), Some(0x02));
        assert_eq!(ModbusPdu::function_code_description(0x83), "Read Holding Registers");
    }

    #[test]
    fn test_pdu_overflow() {
        let result = ModbusPdu::from_slice(&[0xFF; MAX_PDU_SIZE + 1]);
        assert!(matches!(result, Err(KilnError::FrameError { .. })));

        let mut pdu = ModbusPdu::from_slice(&[0x01; MAX_PDU_SIZE]).unwrap();
        assert!(pdu.push(0x00).is_err());
    }
}
