use std::fmt;

use crate::device::{Error, Result};
use crate::format_u8_array;

/// Vendor request storing the payload in the scratch buffer; `wValue` drives the LED.
pub const STORE_REQUEST: u8 = 0x5b;
/// Vendor request returning the scratch buffer.
pub const FETCH_REQUEST: u8 = 0x5c;

/// Size of the firmware's scratch buffer and of every IN read.
pub const MAX_PACKET: usize = 64;

/// Bytes of the I2C bridge frame header (operation, address, register, length).
const I2C_HEADER_LEN: usize = 4;

/// Largest I2C write payload that still fits one bulk packet with its header.
pub const MAX_I2C_DATA: usize = MAX_PACKET - I2C_HEADER_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum I2cOperation {
    Write = 0,
    Read = 1,
}

/// Bulk OUT frame understood by the firmware's I2C bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cCommand {
    operation: I2cOperation,
    device_addr: u8,
    reg_addr: u8,
    data: Vec<u8>,
}

impl I2cCommand {
    pub fn write(device_addr: u8, reg_addr: u8, data: &[u8]) -> Result<Self> {
        if data.len() > MAX_I2C_DATA {
            return Err(Error::PayloadTooLong {
                len: data.len(),
                max: MAX_I2C_DATA,
            });
        }
        Ok(Self {
            operation: I2cOperation::Write,
            device_addr,
            reg_addr,
            data: data.to_vec(),
        })
    }

    /// Single byte register read.
    pub fn read(device_addr: u8, reg_addr: u8) -> Self {
        Self {
            operation: I2cOperation::Read,
            device_addr,
            reg_addr,
            data: Vec::new(),
        }
    }

    pub fn operation(&self) -> I2cOperation {
        self.operation
    }

    fn data_length(&self) -> u8 {
        match self.operation {
            I2cOperation::Write => self.data.len() as u8,
            I2cOperation::Read => 1,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(I2C_HEADER_LEN + self.data.len());
        frame.push(self.operation as u8);
        frame.push(self.device_addr);
        frame.push(self.reg_addr);
        frame.push(self.data_length());
        frame.extend_from_slice(&self.data);
        frame
    }
}

/// Bytes returned by the device on a control or bulk IN transfer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    bytes: Vec<u8>,
}

impl Response {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode as UTF-8, ignoring the zero padding of the scratch buffer.
    pub fn text(&self) -> Result<String> {
        let end = self
            .bytes
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1);
        Ok(String::from_utf8(self.bytes[..end].to_vec())?)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_u8_array(&self.bytes))
    }
}
