use std::{thread::sleep, time::Duration};

pub mod bulk;
pub mod command;
pub mod control;
pub mod device;
pub mod i2c;
pub mod transport;

pub use command::Response;
pub use device::{Error, Result, TesterDevice};
pub use transport::{Endpoints, Session, Transport};

pub fn format_u8_array(arr: &[u8]) -> String {
    let formatted: Vec<String> = arr.iter().map(|&byte| format!("0x{:02x}", byte)).collect();
    format!("[{}]", formatted.join(", "))
}

/// Blocking pacer used between probe steps.
#[derive(Debug, Default, Clone, Copy)]
pub struct Delay;

impl Delay {
    pub fn new() -> Self {
        Self
    }
}

impl embedded_hal::delay::DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        sleep(Duration::from_nanos(ns as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        sleep(Duration::from_millis(ms as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bytes_as_hex_list() {
        assert_eq!(format_u8_array(&[0x00, 0x5b, 0xff]), "[0x00, 0x5b, 0xff]");
        assert_eq!(format_u8_array(&[]), "[]");
    }
}
