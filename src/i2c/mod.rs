//! I2C bridge running over the bulk endpoints.
//!
//! Every frame is a 4 byte header (operation, 7-bit device address, register,
//! length) followed by up to 64 data bytes. A read returns the register byte
//! as the first byte of the next bulk IN packet.

use embedded_hal::delay::DelayNs;

use crate::command::I2cCommand;
use crate::device::{Error, Result};
use crate::format_u8_array;
use crate::transport::{Session, Transport};

impl<T: Transport, D: DelayNs> Session<T, D> {
    pub fn i2c_write(&mut self, address: u8, reg: u8, data: &[u8]) -> Result<()> {
        let command = I2cCommand::write(address, reg, data)?;
        log::info!(
            "i2c write {address:#04x} reg {reg:#04x}: {}",
            format_u8_array(data)
        );
        self.write_packet(&command.to_bytes())
    }

    pub fn i2c_read(&mut self, address: u8, reg: u8) -> Result<u8> {
        let command = I2cCommand::read(address, reg);
        self.write_packet(&command.to_bytes())?;
        self.pause();

        let reply = self.read_packet()?;
        let value = *reply.bytes().first().ok_or(Error::EmptyResponse)?;
        log::info!("i2c read {address:#04x} reg {reg:#04x}: {value:#04x}");
        Ok(value)
    }
}
