//! Session configuration: addresses, ports, and the programmed scan list.

use std::net::Ipv4Addr;

use crate::rate::RateParameters;
use crate::scanlist::ScanList;

/// The four well-known UDP ports the wire format fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ports {
    /// Port the device listens for commands on.
    pub device_command: u16,
    /// Port the device broadcasts discovery/announce frames on.
    pub device_discovery: u16,
    /// Local port this core listens for command responses on.
    pub client_command: u16,
    /// Local port this core listens for ADC data on.
    pub client_data: u16,
}

impl Default for Ports {
    fn default() -> Self {
        Ports {
            device_command: 51235,
            device_discovery: 1235,
            client_command: 1427,
            client_data: 1234,
        }
    }
}

/// Addresses involved in a session: the device's and this host's.
#[derive(Debug, Clone, Copy)]
pub struct Addrs {
    pub device: Ipv4Addr,
    pub host: Ipv4Addr,
}

/// Everything needed to configure and connect to one device.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub addrs: Addrs,
    pub ports: Ports,
    pub scan_list: ScanList,
    pub rate: RateParameters,
    /// Value of the `encode` sub-command (0 or 1), selecting the device's
    /// ADC payload encoding. This crate's codec only decodes the binary
    /// form, so this must match whichever value the device calls binary.
    pub encode: bool,
    /// Packet size code 0..=7, selecting a 16..=2048-byte ADC datagram
    /// payload (see `ps` in the wire format).
    pub packet_size_code: u8,
    /// Samples of loss between consecutive "lost N samples" log lines; 0
    /// disables the notice.
    pub loss_log_threshold: u32,
}
