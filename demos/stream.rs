//! Connects to one device, streams for a fixed duration, and prints the
//! decoded samples for channel 1 as they arrive.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use daq4108::config::{Addrs, Ports, SessionConfig};
use daq4108::scanlist::{Channel, Range, ScanEntry, ScanList};
use daq4108::Session;

#[derive(Parser)]
struct Args {
    /// Device IPv4 address.
    #[arg(long)]
    device: Ipv4Addr,

    /// Local IPv4 address to bind the command and data sockets on.
    #[arg(long, default_value = "0.0.0.0")]
    host: Ipv4Addr,

    /// Desired sample rate in Hz.
    #[arg(long, default_value_t = 1000)]
    rate_hz: u32,

    /// How long to stream before stopping, in seconds.
    #[arg(long, default_value_t = 5)]
    seconds: u64,
}

fn main() -> daq4108::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let scan_list = ScanList::new(vec![ScanEntry {
        channel: Channel::Analog(0),
        range: Range::Pn10V0,
    }])
    .expect("single-channel scan list is always valid");

    let rate = Session::plan_rate(args.rate_hz)?;
    log::info!(
        "requested {} Hz -> srate={} dec={} deca={} (effective {:.3} Hz)",
        args.rate_hz,
        rate.srate,
        rate.dec,
        rate.deca,
        rate.effective_hz(),
    );

    let config = SessionConfig {
        addrs: Addrs {
            device: args.device,
            host: args.host,
        },
        ports: Ports::default(),
        scan_list,
        rate,
        encode: true,
        packet_size_code: 0,
        loss_log_threshold: 100,
    };

    let mut session = Session::new(config);
    session.bind()?;
    session.configure_and_connect()?;

    let printed = Arc::new(Mutex::new(0usize));
    let printed_in_callback = Arc::clone(&printed);
    session.start(Box::new(move |device| {
        let mut printed = printed_in_callback.lock().unwrap();
        for voltage in device.drain_queue(0) {
            println!("{voltage:.4} V");
            *printed += 1;
        }
    }))?;

    std::thread::sleep(Duration::from_secs(args.seconds));

    session.stop()?;
    session.disconnect()?;

    log::info!("printed {} samples", *printed.lock().unwrap());
    Ok(())
}
