//! Vendor control requests: LED toggling and the scratch buffer exchange.

use embedded_hal::delay::DelayNs;

use crate::command::{FETCH_REQUEST, MAX_PACKET, Response, STORE_REQUEST};
use crate::device::{Error, Result};
use crate::format_u8_array;
use crate::transport::{Session, Transport};

/// Number of on/off cycles in the blink probe.
pub const BLINK_CYCLES: usize = 3;

/// `wLength` is 16 bits wide.
pub const MAX_CONTROL_PAYLOAD: usize = u16::MAX as usize;

impl<T: Transport, D: DelayNs> Session<T, D> {
    /// Store request with no payload; the firmware latches `wValue` as LED state.
    pub fn set_led(&mut self, on: bool) -> Result<()> {
        self.transport.control_out(STORE_REQUEST, on as u16, 0, &[])?;
        log::info!("led {}", if on { "on" } else { "off" });
        Ok(())
    }

    /// Toggle the LED on and off [`BLINK_CYCLES`] times, pausing after each request.
    pub fn control_probe(&mut self) -> Result<()> {
        for cycle in 0..BLINK_CYCLES {
            log::debug!("blink cycle {}", cycle + 1);
            self.set_led(true)?;
            self.pause();
            self.set_led(false)?;
            self.pause();
        }
        Ok(())
    }

    /// Read back the scratch buffer.
    pub fn fetch(&mut self) -> Result<Response> {
        let mut buf = [0u8; MAX_PACKET];
        let n = self.transport.control_in(FETCH_REQUEST, 0, 0, &mut buf)?;
        Ok(Response::new(buf[..n].to_vec()))
    }

    /// Store `text` in the scratch buffer and fetch it back.
    pub fn text_exchange(&mut self, text: &str) -> Result<Response> {
        let payload = text.as_bytes();
        if payload.len() > MAX_CONTROL_PAYLOAD {
            return Err(Error::PayloadTooLong {
                len: payload.len(),
                max: MAX_CONTROL_PAYLOAD,
            });
        }
        if payload.len() > MAX_PACKET {
            log::warn!(
                "payload is {} bytes, device keeps only the first {MAX_PACKET}",
                payload.len()
            );
        }
        log::info!("sending {}", format_u8_array(payload));

        self.transport.control_out(STORE_REQUEST, 0, 0, payload)?;
        self.pause();
        self.fetch()
    }
}
