//! CLI argument parsing

use clap::{Parser, ValueEnum};

use usb_tester_rs::device::{DEFAULT_TIMEOUT, PRODUCT_ID, VENDOR_ID};
use usb_tester_rs::transport::PAUSE_MS;

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u16>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let value = parse_hex_u16(s)?;
    u8::try_from(value).map_err(|_| format!("Value out of range for a byte: {}", s))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LedState {
    On,
    Off,
}

#[derive(Parser, Debug)]
#[command(name = "usb-tester")]
#[command(author, version, about = "USB vendor firmware tester", long_about = None)]
pub struct Cli {
    /// Blink the LED with three store-request on/off pairs
    #[arg(short, long, visible_alias = "ctrl", alias = "control_msg")]
    pub control_msg: bool,

    /// Write two single-byte bulk packets and read the reply
    #[arg(short, long, visible_alias = "blk", alias = "bulk_msg")]
    pub bulk_msg: bool,

    /// Store TEXT in the device buffer and print what it sends back
    #[arg(short, long, value_name = "TEXT", visible_alias = "text", alias = "text_msg")]
    pub text_msg: Option<String>,

    /// Set the LED state
    #[arg(long, value_enum)]
    pub led: Option<LedState>,

    /// Print the device buffer without writing it first
    #[arg(long)]
    pub fetch: bool,

    /// Read one register through the I2C bridge
    #[arg(long, num_args = 2, value_names = ["ADDR", "REG"], value_parser = parse_hex_u8)]
    pub i2c_read: Option<Vec<u8>>,

    /// Write bytes to a register through the I2C bridge
    #[arg(long, num_args = 3.., value_names = ["ADDR", "REG", "BYTE"], value_parser = parse_hex_u8)]
    pub i2c_write: Option<Vec<u8>>,

    /// List attached USB devices and exit
    #[arg(long)]
    pub list: bool,

    /// Vendor id to look for
    #[arg(long, default_value_t = VENDOR_ID, value_parser = parse_hex_u16)]
    pub vid: u16,

    /// Product id to look for
    #[arg(long, default_value_t = PRODUCT_ID, value_parser = parse_hex_u16)]
    pub pid: u16,

    /// Timeout of each transfer in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
    pub timeout_ms: u64,

    /// Pause between probe steps in milliseconds
    #[arg(long, default_value_t = PAUSE_MS)]
    pub pause_ms: u32,

    /// Leave the device configured instead of resetting it at the end
    #[arg(long)]
    pub no_reset: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Whether any probe that needs the device was requested.
    pub fn has_probe(&self) -> bool {
        self.control_msg
            || self.bulk_msg
            || self.text_msg.is_some()
            || self.led.is_some()
            || self.fetch
            || self.i2c_read.is_some()
            || self.i2c_write.is_some()
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
