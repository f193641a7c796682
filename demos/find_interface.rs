//! Dump the interface/endpoint layout of an attached tester device.

use nusb::transfer::{Direction, EndpointType};
use usb_tester_rs::device::{self, PRODUCT_ID, VENDOR_ID};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let info = device::find(VENDOR_ID, PRODUCT_ID)?;
    println!("{}", device::DeviceSummary::from(&info));

    let device_handle = info.open()?;

    for config in device_handle.configurations() {
        println!("configuration {}", config.configuration_value());

        for interface in config.interfaces() {
            let interface_num = interface.interface_number();

            for desc in interface.alt_settings() {
                println!(
                    "  interface {interface_num} alt {}: class {:#04x} subclass {:#04x} protocol {:#04x}",
                    desc.alternate_setting(),
                    desc.class(),
                    desc.subclass(),
                    desc.protocol()
                );

                for endpoint in desc.endpoints() {
                    let address = endpoint.address();
                    if endpoint.transfer_type() != EndpointType::Bulk {
                        log::info!("skip non-bulk endpoint {address:#04x}");
                    }
                    let dir = if endpoint.direction() == Direction::In { "in" } else { "out" };
                    println!(
                        "    endpoint {address:#04x}: {:?} {dir}, max packet {}",
                        endpoint.transfer_type(),
                        endpoint.max_packet_size()
                    );
                }
            }
        }

        match device::find_bulk_interface(&config) {
            Some((num, eps)) => log::info!(
                "tester interface {num}: bulk out {:#04x}, bulk in {:#04x}",
                eps.bulk_out,
                eps.bulk_in
            ),
            None => log::warn!("no bulk endpoint pair in this configuration"),
        }
    }

    Ok(())
}
