use nusb::transfer::{Control, ControlType, EndpointType, Recipient, RequestBuffer, TransferError};
use smol::Timer;
use smol::block_on;
use smol::future::FutureExt;
use std::fmt;
use std::io;
use std::time::Duration;

use nusb::descriptors::Configuration;
use nusb::{Device, DeviceInfo, Interface};

use crate::format_u8_array;
use crate::transport::{Endpoints, Transport};

/// device info of the tester firmware
pub const VENDOR_ID: u16 = 0x2312;
pub const PRODUCT_ID: u16 = 0xec40;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

const VENDOR_CLASS: u8 = 0xff;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to enumerate USB devices: {0}")]
    Enumerate(#[source] nusb::Error),
    #[error("device {vendor_id:04x}:{product_id:04x} not found")]
    NotFound { vendor_id: u16, product_id: u16 },
    #[error("failed to open device: {0}")]
    Open(#[source] nusb::Error),
    #[error("device has no configuration descriptor")]
    NoConfiguration,
    #[error("failed to set configuration {value}: {source}")]
    Configure { value: u8, source: nusb::Error },
    #[error("no interface with a bulk IN/OUT endpoint pair")]
    NoBulkEndpoints,
    #[error("failed to claim interface {interface}: {source}")]
    Claim { interface: u8, source: nusb::Error },
    #[error("control transfer 0x{request:02x} failed: {source}")]
    Control { request: u8, source: TransferError },
    #[error("bulk transfer on endpoint {endpoint:#04x} failed: {source}")]
    Bulk { endpoint: u8, source: io::Error },
    #[error("short write on endpoint {endpoint:#04x}: {written} of {expected} bytes")]
    ShortWrite {
        endpoint: u8,
        written: usize,
        expected: usize,
    },
    #[error("failed to clear halt on endpoint {endpoint:#04x}: {source}")]
    ClearHalt { endpoint: u8, source: nusb::Error },
    #[error("failed to reset device: {0}")]
    Reset(#[source] nusb::Error),
    #[error("payload of {len} bytes exceeds {max}")]
    PayloadTooLong { len: usize, max: usize },
    #[error("device returned no data")]
    EmptyResponse,
    #[error("response is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

pub fn is_tester_device(device: &DeviceInfo, vendor_id: u16, product_id: u16) -> bool {
    device.vendor_id() == vendor_id && device.product_id() == product_id
}

/// First enumerated device matching the vendor/product pair.
pub fn find(vendor_id: u16, product_id: u16) -> Result<DeviceInfo> {
    nusb::list_devices()
        .map_err(Error::Enumerate)?
        .find(|d| is_tester_device(d, vendor_id, product_id))
        .ok_or(Error::NotFound {
            vendor_id,
            product_id,
        })
}

/// Summary of an enumerated USB device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSummary {
    pub address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<&DeviceInfo> for DeviceSummary {
    fn from(info: &DeviceInfo) -> Self {
        Self {
            address: info.device_address(),
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            manufacturer: info.manufacturer_string().map(str::to_owned),
            product: info.product_string().map(str::to_owned),
        }
    }
}

impl fmt::Display for DeviceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "address {:03}: {:04x}:{:04x}",
            self.address, self.vendor_id, self.product_id
        )?;
        for s in [&self.manufacturer, &self.product].into_iter().flatten() {
            write!(f, " {s}")?;
        }
        Ok(())
    }
}

pub fn list() -> Result<Vec<DeviceSummary>> {
    Ok(nusb::list_devices()
        .map_err(Error::Enumerate)?
        .map(|d| DeviceSummary::from(&d))
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    pub vendor_id: u16,
    pub product_id: u16,
    pub timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Interface number and bulk endpoint pair to use, preferring a vendor-class
/// interface.
pub fn find_bulk_interface(config: &Configuration<'_>) -> Option<(u8, Endpoints)> {
    select_interface(config.interfaces().filter_map(|interface| {
        let desc = interface.alt_settings().next()?;
        let endpoints = Endpoints::pair(
            desc.endpoints()
                .map(|ep| (ep.address(), ep.transfer_type() == EndpointType::Bulk)),
        );
        Some((interface.interface_number(), desc.class(), endpoints))
    }))
}

/// Pick from `(interface number, class, bulk pair)` candidates: the first
/// vendor-class interface with a bulk pair, else the first with any pair.
pub fn select_interface<I>(candidates: I) -> Option<(u8, Endpoints)>
where
    I: IntoIterator<Item = (u8, u8, Option<Endpoints>)>,
{
    let mut fallback = None;

    for (interface_num, class, endpoints) in candidates {
        let Some(endpoints) = endpoints else {
            log::debug!("skip interface {interface_num} without bulk endpoint pair");
            continue;
        };

        if class == VENDOR_CLASS {
            return Some((interface_num, endpoints));
        }
        fallback.get_or_insert((interface_num, endpoints));
    }

    fallback
}

/// Opened, configured and claimed tester device.
pub struct TesterDevice {
    device: Device,
    interface: Interface,
    endpoints: Endpoints,
    timeout: Duration,
    summary: DeviceSummary,
}

impl TesterDevice {
    pub fn open(options: &OpenOptions) -> Result<Self> {
        let info = find(options.vendor_id, options.product_id)?;
        let summary = DeviceSummary::from(&info);
        log::info!("found {summary}");

        let device = info.open().map_err(Error::Open)?;

        let (value, interface_num, endpoints) = {
            let config = device.configurations().next().ok_or(Error::NoConfiguration)?;
            let (interface_num, endpoints) =
                find_bulk_interface(&config).ok_or(Error::NoBulkEndpoints)?;
            (config.configuration_value(), interface_num, endpoints)
        };

        device
            .set_configuration(value)
            .map_err(|source| Error::Configure { value, source })?;
        log::debug!("configuration {value} set");

        let interface = device
            .claim_interface(interface_num)
            .map_err(|source| Error::Claim {
                interface: interface_num,
                source,
            })?;
        log::info!(
            "claimed interface {interface_num}, bulk out {:#04x}, bulk in {:#04x}",
            endpoints.bulk_out,
            endpoints.bulk_in
        );

        Ok(Self {
            device,
            interface,
            endpoints,
            timeout: options.timeout,
            summary,
        })
    }

    pub fn summary(&self) -> &DeviceSummary {
        &self.summary
    }

    /// Release the interface and reset the port.
    pub fn reset(self) -> Result<()> {
        let Self {
            device, interface, ..
        } = self;
        drop(interface);
        device.reset().map_err(Error::Reset)?;
        log::info!("device reset");
        Ok(())
    }

    fn control(request: u8, value: u16, index: u16) -> Control {
        Control {
            control_type: ControlType::Vendor,
            recipient: Recipient::Device,
            request,
            value,
            index,
        }
    }
}

impl Transport for TesterDevice {
    fn endpoints(&self) -> Endpoints {
        self.endpoints
    }

    fn control_out(&mut self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<usize> {
        let n = self
            .interface
            .control_out_blocking(Self::control(request, value, index), data, self.timeout)
            .map_err(|source| Error::Control { request, source })?;
        log::debug!(
            "control out 0x{request:02x} value {value} index {index}: {}",
            format_u8_array(data)
        );
        Ok(n)
    }

    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize> {
        let n = self
            .interface
            .control_in_blocking(Self::control(request, value, index), buf, self.timeout)
            .map_err(|source| Error::Control { request, source })?;
        log::debug!(
            "control in 0x{request:02x} value {value} index {index}: {}",
            format_u8_array(&buf[..n])
        );
        Ok(n)
    }

    fn bulk_out(&mut self, endpoint: u8, data: &[u8]) -> Result<usize> {
        let n = self
            .interface
            .write_bulk(endpoint, data, self.timeout)
            .map_err(|source| Error::Bulk { endpoint, source })?;
        log::info!("usb write {endpoint:#04x}: {}", format_u8_array(data));
        Ok(n)
    }

    fn bulk_in(&mut self, endpoint: u8, buf: &mut [u8]) -> Result<usize> {
        let n = self
            .interface
            .read_bulk(endpoint, buf, self.timeout)
            .map_err(|source| Error::Bulk { endpoint, source })?;
        log::info!("usb read {endpoint:#04x}: {}", format_u8_array(&buf[..n]));
        Ok(n)
    }

    fn clear_halt(&mut self, endpoint: u8) -> Result<()> {
        self.interface
            .clear_halt(endpoint)
            .map_err(|source| Error::ClearHalt { endpoint, source })?;
        log::debug!("cleared halt on {endpoint:#04x}");
        Ok(())
    }
}

/// Blocking bulk transfers with a timeout on top of nusb's async API.
pub trait InterfaceExt {
    fn read_bulk(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
    fn write_bulk(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> io::Result<usize>;
}

impl InterfaceExt for Interface {
    fn write_bulk(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> io::Result<usize> {
        let fut = async {
            let comp = self.bulk_out(endpoint, buf.to_vec()).await;
            comp.status.map_err(io::Error::other)?;

            let n = comp.data.actual_length();
            Ok(n)
        };

        block_on(fut.or(async {
            Timer::after(timeout).await;
            Err(io::ErrorKind::TimedOut.into())
        }))
    }

    fn read_bulk(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let fut = async {
            let comp = self.bulk_in(endpoint, RequestBuffer::new(buf.len())).await;
            comp.status.map_err(io::Error::other)?;

            let n = comp.data.len().min(buf.len());
            buf[..n].copy_from_slice(&comp.data[..n]);
            Ok(n)
        };

        block_on(fut.or(async {
            Timer::after(timeout).await;
            Err(io::ErrorKind::TimedOut.into())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_target_tester_firmware() {
        let opts = OpenOptions::default();
        assert_eq!(opts.vendor_id, 0x2312);
        assert_eq!(opts.product_id, 0xec40);
        assert_eq!(opts.timeout, Duration::from_millis(1000));
    }

    const PAIR_A: Endpoints = Endpoints {
        bulk_out: 0x02,
        bulk_in: 0x82,
    };
    const PAIR_B: Endpoints = Endpoints {
        bulk_out: 0x01,
        bulk_in: 0x81,
    };

    #[test]
    fn vendor_interface_wins_over_earlier_fallback() {
        let picked = select_interface([(0, 0x0a, Some(PAIR_A)), (1, 0xff, Some(PAIR_B))]);
        assert_eq!(picked, Some((1, PAIR_B)));
    }

    #[test]
    fn first_pair_is_used_without_vendor_interface() {
        let picked = select_interface([
            (0, 0x02, None),
            (1, 0x0a, Some(PAIR_A)),
            (2, 0x08, Some(PAIR_B)),
        ]);
        assert_eq!(picked, Some((1, PAIR_A)));
    }

    #[test]
    fn vendor_interface_without_pair_is_skipped() {
        let picked = select_interface([(0, 0xff, None), (1, 0x0a, Some(PAIR_A))]);
        assert_eq!(picked, Some((1, PAIR_A)));
        assert_eq!(select_interface([(0, 0xff, None)]), None);
    }

    #[test]
    fn summary_display() {
        let summary = DeviceSummary {
            address: 7,
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            manufacturer: Some("Zephyr".into()),
            product: Some("tester".into()),
        };
        assert_eq!(summary.to_string(), "address 007: 2312:ec40 Zephyr tester");

        let anonymous = DeviceSummary {
            manufacturer: None,
            product: None,
            ..summary
        };
        assert_eq!(anonymous.to_string(), "address 007: 2312:ec40");
    }

    #[test]
    fn not_found_message_names_ids() {
        let err = Error::NotFound {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
        };
        assert_eq!(err.to_string(), "device 2312:ec40 not found");
    }
}
