//! usb-tester - exercise the vendor firmware over control and bulk transfers
//!
//! Finds the device by vendor/product id, configures and claims it, runs the
//! requested probes in a fixed order and resets the device afterwards.

mod cli;

use std::time::Duration;

use clap::{CommandFactory, Parser};
use cli::{Cli, LedState};
use usb_tester_rs::device::{self, OpenOptions, TesterDevice};
use usb_tester_rs::{Delay, Response, Session, Transport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    if cli.list {
        return list_devices(&cli);
    }

    if !cli.has_probe() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let options = OpenOptions {
        vendor_id: cli.vid,
        product_id: cli.pid,
        timeout: Duration::from_millis(cli.timeout_ms),
    };
    let mut device = TesterDevice::open(&options)?;
    println!("Device found!");

    let mut session = Session::new(&mut device, Delay::new()).with_pause_ms(cli.pause_ms);
    run_probes(&cli, &mut session)?;
    drop(session);

    if cli.no_reset {
        log::info!("leaving device configured");
    } else {
        device.reset()?;
    }

    Ok(())
}

fn run_probes<T: Transport>(
    cli: &Cli,
    session: &mut Session<T, Delay>,
) -> usb_tester_rs::Result<()> {
    if cli.control_msg {
        session.control_probe()?;
    }

    if cli.bulk_msg {
        let reply = session.bulk_probe()?;
        print_reply(&reply)?;
    }

    if let Some(text) = &cli.text_msg {
        println!("{}", usb_tester_rs::format_u8_array(text.as_bytes()));
        let reply = session.text_exchange(text)?;
        println!("{}", reply.text()?);
    }

    if let Some(state) = cli.led {
        session.set_led(state == LedState::On)?;
    }

    if cli.fetch {
        print_reply(&session.fetch()?)?;
    }

    if let Some(args) = &cli.i2c_write {
        session.i2c_write(args[0], args[1], &args[2..])?;
    }

    if let Some(args) = &cli.i2c_read {
        let value = session.i2c_read(args[0], args[1])?;
        println!("{value:#04x}");
    }

    Ok(())
}

fn print_reply(reply: &Response) -> usb_tester_rs::Result<()> {
    println!("{reply}");
    println!("{}", reply.text()?);
    Ok(())
}

fn list_devices(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for summary in device::list()? {
        let marker = if summary.vendor_id == cli.vid && summary.product_id == cli.pid {
            "*"
        } else {
            " "
        };
        println!("{marker} {summary}");
    }
    Ok(())
}
