//! The command-socket state machine.
//!
//! Walks a session through `Idle -> SocketsBound -> Configured -> Connected
//! -> Streaming -> Stopped -> Disconnected`. Every transition here blocks on
//! a command/response round trip over the transport *except* once
//! streaming has begun: from that point the background receive task (see
//! [`crate::supervisor`]) owns the only read on the response socket, so
//! `stop`/`disconnect`/`keep_alive` become fire-and-forget sends. See
//! DESIGN.md for why this split is where it is.
//!
//! Sends and receives are split across two transports, matching the wire
//! format: the command socket only ever sends, and the device is told
//! (via `CONNECT`'s `par1`) to direct every response and ADC datagram to a
//! separate response/data socket. Waiting for an echo on the command
//! socket itself would simply never see it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::codec::{decode_inbound, CommandCode, Inbound, OutboundFrame};
use crate::config::SessionConfig;
use crate::device_state::clamp_order;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Fixed receive timeout for a command's expected response.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Idle,
    SocketsBound,
    Configured,
    Connected,
    Streaming,
    Stopped,
    Disconnected,
}

/// Drives the command socket through the session lifecycle.
///
/// Holds both the command (send-only) and response (recv-only, pre-stream)
/// transports; the response transport is the same one
/// [`crate::supervisor::Supervisor`] reads from once streaming starts.
pub struct Control {
    command_transport: Arc<dyn Transport>,
    response_transport: Arc<dyn Transport>,
    group_key: AtomicU32,
    /// This session's own device order, echoed back in `Response.order`.
    /// Fixed at 0: multi-device sync groups are not wired up (see
    /// DESIGN.md), but responses are still filtered by it so a stray
    /// reply meant for another device in the group is not mistaken for
    /// ours.
    device_order: u32,
    sync_device_count: u32,
    state: ControlState,
}

impl Control {
    pub fn new(command_transport: Arc<dyn Transport>, response_transport: Arc<dyn Transport>) -> Self {
        Control {
            command_transport,
            response_transport,
            group_key: AtomicU32::new(0),
            device_order: 0,
            sync_device_count: 0,
            state: ControlState::Idle,
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Bind has already happened at the transport layer (the caller
    /// constructs the `Transport`s with their local addresses bound); this
    /// just records the local state transition and sets the response
    /// socket's read timeout used for every blocking command that follows.
    pub fn bind(&mut self) -> Result<()> {
        if self.state != ControlState::Idle {
            return Err(Error::Protocol("bind called out of order"));
        }
        self.response_transport.set_read_timeout(Some(RESPONSE_TIMEOUT))?;
        self.state = ControlState::SocketsBound;
        Ok(())
    }

    /// Send `CONNECT`, then program packet encoding, rate, and the scan
    /// list via a sequence of `SECONDCOMMAND` sub-commands, in the order
    /// the device expects: `CONNECT` first, then `encode`, `ps`, `srate`,
    /// `dec`, `deca`, `keepalive 8000`, then one `slist` per scan-list
    /// entry.
    pub fn configure_and_connect(&mut self, device: SocketAddr, cfg: &SessionConfig) -> Result<()> {
        if self.state != ControlState::SocketsBound {
            return Err(Error::Protocol("configure_and_connect called out of order"));
        }
        self.command_transport.connect(device)?;

        let disc_remote_port = cfg.ports.client_data;
        self.send_and_await(OutboundFrame {
            group_key: self.group_key.load(Ordering::Relaxed),
            command: CommandCode::Connect,
            par1: u32::from(disc_remote_port),
            par2: 1, // role: standalone device, not a sync-group coordinator
            par3: self.device_order,
            payload: cfg.addrs.host.to_string(),
        })?;

        self.state = ControlState::Configured;

        self.second_command(&format!("encode {}\r", u8::from(cfg.encode)))?;
        self.second_command(&format!("ps {}\r", cfg.packet_size_code))?;
        self.second_command(&format!("srate {}\r", cfg.rate.srate))?;
        self.second_command(&format!("dec {}\r", cfg.rate.dec))?;
        self.second_command(&format!("deca {}\r", cfg.rate.deca))?;
        self.second_command("keepalive 8000\r")?;

        for (i, entry) in cfg.scan_list.iter().enumerate() {
            let tag = entry.range.tag_bits() as u32
                | match entry.channel {
                    crate::scanlist::Channel::Analog(n) => n as u32,
                    crate::scanlist::Channel::Digital(n) => 0x8000 | n as u32,
                };
            self.second_command(&format!("slist {i} {tag}\r"))?;
        }

        self.state = ControlState::Connected;
        Ok(())
    }

    /// Send one `SECONDCOMMAND` sub-command and wait for its echo.
    fn second_command(&mut self, ascii: &str) -> Result<()> {
        self.send_and_await(OutboundFrame {
            group_key: self.group_key.load(Ordering::Relaxed),
            command: CommandCode::SecondCommand,
            par1: 0,
            par2: 0,
            par3: 0,
            payload: ascii.to_string(),
        })
    }

    /// Issue the `info` sub-command and return the device's ASCII reply.
    /// Not part of the automatic lifecycle; a session user calls this
    /// explicitly for diagnostics.
    pub fn device_info(&mut self, code: u8) -> Result<String> {
        if self.state == ControlState::Idle {
            return Err(Error::Protocol("device_info called before bind"));
        }
        let frame = OutboundFrame {
            group_key: self.group_key.load(Ordering::Relaxed),
            command: CommandCode::SecondCommand,
            par1: 0,
            par2: 0,
            par3: 0,
            payload: format!("info {code}\r"),
        };
        let payload = self.send_and_await_payload(frame)?;
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }

    /// Start streaming: send `SYNCSTART` and block for its echo one last
    /// time, since the receive task does not exist until this returns.
    pub fn start(&mut self) -> Result<()> {
        if self.state != ControlState::Connected {
            return Err(Error::Protocol("start called out of order"));
        }
        self.send_and_await(OutboundFrame {
            group_key: self.group_key.load(Ordering::Relaxed),
            command: CommandCode::SyncStart,
            par1: 0,
            par2: 0,
            par3: 0,
            payload: "start 0\r".to_string(),
        })?;
        self.state = ControlState::Streaming;
        Ok(())
    }

    /// Send `SYNCSTOP`. Fire-and-forget: once streaming, the receive task
    /// owns the response socket's reads, so this core cannot also wait for
    /// an echo without racing it.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != ControlState::Streaming {
            return Err(Error::Protocol("stop called out of order"));
        }
        self.send(OutboundFrame {
            group_key: self.group_key.load(Ordering::Relaxed),
            command: CommandCode::SyncStop,
            par1: 0,
            par2: 0,
            par3: 0,
            payload: "stop\r".to_string(),
        })?;
        self.state = ControlState::Stopped;
        Ok(())
    }

    /// Send `DISCONNECT`. Also fire-and-forget, for the same reason as
    /// [`Self::stop`].
    pub fn disconnect(&mut self) -> Result<()> {
        if !matches!(self.state, ControlState::Stopped | ControlState::Connected) {
            return Err(Error::Protocol("disconnect called out of order"));
        }
        self.send(OutboundFrame {
            group_key: self.group_key.load(Ordering::Relaxed),
            command: CommandCode::Disconnect,
            par1: 0,
            par2: 0,
            par3: 0,
            payload: "disconnect\r".to_string(),
        })?;
        self.state = ControlState::Disconnected;
        Ok(())
    }

    /// Send one `KEEPALIVE`. Always fire-and-forget; called periodically
    /// by [`crate::supervisor::Supervisor`]'s keep-alive thread.
    pub fn keep_alive(&self) -> Result<()> {
        self.send(OutboundFrame {
            group_key: self.group_key.load(Ordering::Relaxed),
            command: CommandCode::KeepAlive,
            par1: 0,
            par2: 0,
            par3: 0,
            payload: String::new(),
        })
    }

    fn send(&self, frame: OutboundFrame) -> Result<()> {
        let encoded = frame.encode();
        self.command_transport.send(&encoded)?;
        Ok(())
    }

    fn send_and_await(&mut self, frame: OutboundFrame) -> Result<()> {
        self.send_and_await_payload(frame).map(|_| ())
    }

    fn send_and_await_payload(&mut self, frame: OutboundFrame) -> Result<Vec<u8>> {
        let command_name = frame.command.name();
        let encoded = frame.encode();
        self.command_transport.send(&encoded)?;

        let mut buf = [0u8; 2048];
        loop {
            let n = match self.response_transport.recv(&mut buf) {
                Ok(n) => n,
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    return Err(Error::Timeout { command: command_name });
                }
                Err(e) => return Err(Error::Io(e)),
            };

            match decode_inbound(&buf[..n]) {
                Inbound::Response { order, payload, .. } => {
                    let responder = clamp_order(order, self.sync_device_count);
                    if responder != self.device_order {
                        log::warn!(
                            "response for device order {responder}, expected {}; ignoring",
                            self.device_order
                        );
                        continue;
                    }
                    return Ok(payload.to_vec());
                }
                Inbound::AdcData { .. } => {
                    log::warn!("ADC data received while waiting for {command_name} response; ignoring");
                    continue;
                }
                Inbound::Unknown => {
                    log::warn!("unrecognized datagram while waiting for {command_name} response; ignoring");
                    continue;
                }
            }
        }
    }
}
