use embedded_hal::delay::DelayNs;

use crate::command::{MAX_PACKET, Response};
use crate::device::{Error, Result};
use crate::transport::{Session, Transport};

/// Single-byte packets written by the bulk probe, in order.
pub const PROBE_BYTES: [u8; 2] = [0x00, 0x01];

impl<T: Transport, D: DelayNs> Session<T, D> {
    /// Write `data` to the bulk OUT endpoint, failing on a short write.
    pub fn write_packet(&mut self, data: &[u8]) -> Result<()> {
        let endpoint = self.transport.endpoints().bulk_out;
        let written = self.transport.bulk_out(endpoint, data)?;
        if written != data.len() {
            return Err(Error::ShortWrite {
                endpoint,
                written,
                expected: data.len(),
            });
        }
        Ok(())
    }

    /// Read one packet from the bulk IN endpoint.
    pub fn read_packet(&mut self) -> Result<Response> {
        let endpoint = self.transport.endpoints().bulk_in;
        let mut buf = [0u8; MAX_PACKET];
        let n = self.transport.bulk_in(endpoint, &mut buf)?;
        Ok(Response::new(buf[..n].to_vec()))
    }

    /// Write [`PROBE_BYTES`] one packet at a time, clear the IN halt and read
    /// the reply.
    pub fn bulk_probe(&mut self) -> Result<Response> {
        for byte in PROBE_BYTES {
            self.write_packet(&[byte])?;
            self.pause();
        }

        let bulk_in = self.transport.endpoints().bulk_in;
        self.transport.clear_halt(bulk_in)?;
        self.read_packet()
    }
}
