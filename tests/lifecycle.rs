//! Drives the control state machine against mock transports, checking the
//! exact command sequence and state transitions without any real socket.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use daq4108::codec::{CommandCode, OutboundFrame, DQRESPONSE_ID};
use daq4108::config::{Addrs, Ports, SessionConfig};
use daq4108::control::{Control, ControlState};
use daq4108::rate::RateParameters;
use daq4108::scanlist::{Channel, Range, ScanEntry, ScanList};
use daq4108::transport::Transport;

/// A send-only mock: records every frame handed to it, never yields
/// anything on `recv`. Stands in for the command socket, which per the
/// wire format is never read from.
struct SendOnlyTransport {
    outbound: Mutex<Vec<Vec<u8>>>,
}

impl SendOnlyTransport {
    fn new() -> Self {
        SendOnlyTransport {
            outbound: Mutex::new(Vec::new()),
        }
    }
}

impl Transport for SendOnlyTransport {
    fn connect(&self, _peer: SocketAddr) -> std::io::Result<()> {
        Ok(())
    }

    fn send(&self, buf: &[u8]) -> std::io::Result<usize> {
        self.outbound.lock().unwrap().push(buf.to_vec());
        Ok(buf.len())
    }

    fn recv(&self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "command socket is never read from",
        ))
    }

    fn set_read_timeout(&self, _timeout: Option<Duration>) -> std::io::Result<()> {
        Ok(())
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        Ok("0.0.0.0:1427".parse().unwrap())
    }
}

/// A recv-only mock: yields queued echo datagrams, ignores `send`. Stands
/// in for the response/data socket.
struct RecvOnlyTransport {
    inbound: Mutex<VecDeque<Vec<u8>>>,
}

impl RecvOnlyTransport {
    fn new() -> Self {
        RecvOnlyTransport {
            inbound: Mutex::new(VecDeque::new()),
        }
    }

    fn queue_response(&self) {
        let mut buf = DQRESPONSE_ID.to_le_bytes().to_vec();
        buf.extend_from_slice(&0u32.to_le_bytes()); // group_key
        buf.extend_from_slice(&0u32.to_le_bytes()); // order
        buf.extend_from_slice(&0u32.to_le_bytes()); // payload_len
        self.inbound.lock().unwrap().push_back(buf);
    }
}

impl Transport for RecvOnlyTransport {
    fn connect(&self, _peer: SocketAddr) -> std::io::Result<()> {
        Ok(())
    }

    fn send(&self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(buf.len())
    }

    fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.inbound.lock().unwrap().pop_front() {
            Some(datagram) => {
                buf[..datagram.len()].copy_from_slice(&datagram);
                Ok(datagram.len())
            }
            None => Err(std::io::Error::new(std::io::ErrorKind::WouldBlock, "no datagram queued")),
        }
    }

    fn set_read_timeout(&self, _timeout: Option<Duration>) -> std::io::Result<()> {
        Ok(())
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        Ok("0.0.0.0:1234".parse().unwrap())
    }
}

fn test_config() -> SessionConfig {
    let scan_list = ScanList::new(vec![ScanEntry {
        channel: Channel::Analog(0),
        range: Range::Pn10V0,
    }])
    .unwrap();
    SessionConfig {
        addrs: Addrs {
            device: Ipv4Addr::new(192, 168, 1, 3),
            host: Ipv4Addr::new(192, 168, 1, 2),
        },
        ports: Ports::default(),
        scan_list,
        rate: RateParameters {
            srate: 60000,
            dec: 1,
            deca: 1,
        },
        encode: true,
        packet_size_code: 0,
        loss_log_threshold: 0,
    }
}

#[test]
fn full_lifecycle_issues_expected_commands_and_transitions() {
    let command = Arc::new(SendOnlyTransport::new());
    let response = Arc::new(RecvOnlyTransport::new());

    // CONNECT + encode + ps + srate + dec + deca + keepalive + slist (1
    // entry) + SYNCSTART = 9 blocking round trips, per §4.E's table.
    for _ in 0..9 {
        response.queue_response();
    }

    let mut control = Control::new(
        Arc::clone(&command) as Arc<dyn Transport>,
        Arc::clone(&response) as Arc<dyn Transport>,
    );
    assert_eq!(control.state(), ControlState::Idle);

    control.bind().unwrap();
    assert_eq!(control.state(), ControlState::SocketsBound);

    let cfg = test_config();
    let device_addr = SocketAddr::new(cfg.addrs.device.into(), cfg.ports.device_command);
    control.configure_and_connect(device_addr, &cfg).unwrap();
    assert_eq!(control.state(), ControlState::Connected);

    control.start().unwrap();
    assert_eq!(control.state(), ControlState::Streaming);

    // stop/disconnect are fire-and-forget once streaming; no responses queued.
    control.stop().unwrap();
    assert_eq!(control.state(), ControlState::Stopped);
    control.disconnect().unwrap();
    assert_eq!(control.state(), ControlState::Disconnected);

    let sent = command.outbound.lock().unwrap();
    let commands: Vec<CommandCode> = sent
        .iter()
        .map(|frame| OutboundFrame::decode_header(frame).unwrap().command)
        .collect();

    // §4.E table 1, verbatim: CONNECT first, then encode/ps/srate/dec/deca/
    // keepalive as SECONDCOMMAND sub-commands, then one slist per entry,
    // then SYNCSTART, then the fire-and-forget SYNCSTOP/DISCONNECT.
    assert_eq!(
        commands,
        vec![
            CommandCode::Connect,
            CommandCode::SecondCommand, // encode
            CommandCode::SecondCommand, // ps
            CommandCode::SecondCommand, // srate
            CommandCode::SecondCommand, // dec
            CommandCode::SecondCommand, // deca
            CommandCode::SecondCommand, // keepalive 8000
            CommandCode::SecondCommand, // slist 0
            CommandCode::SyncStart,
            CommandCode::SyncStop,
            CommandCode::Disconnect,
        ]
    );

    let payloads: Vec<&str> = sent[1..8]
        .iter()
        .map(|frame| std::str::from_utf8(&frame[24..]).unwrap())
        .collect();
    assert_eq!(
        payloads,
        vec![
            "encode 1\r",
            "ps 0\r",
            "srate 60000\r",
            "dec 1\r",
            "deca 1\r",
            "keepalive 8000\r",
            "slist 0 0\r",
        ]
    );
}

#[test]
fn commands_out_of_order_are_rejected() {
    let command = Arc::new(SendOnlyTransport::new());
    let response = Arc::new(RecvOnlyTransport::new());
    let mut control = Control::new(command as Arc<dyn Transport>, response as Arc<dyn Transport>);
    assert!(control.start().is_err());
}

#[test]
fn timeout_surfaces_when_no_response_arrives() {
    let command = Arc::new(SendOnlyTransport::new());
    let response = Arc::new(RecvOnlyTransport::new());
    let mut control = Control::new(
        Arc::clone(&command) as Arc<dyn Transport>,
        Arc::clone(&response) as Arc<dyn Transport>,
    );
    control.bind().unwrap();

    let cfg = test_config();
    let device_addr = SocketAddr::new(cfg.addrs.device.into(), cfg.ports.device_command);
    // No responses queued: the CONNECT round trip must time out rather than
    // hang, since RecvOnlyTransport::recv returns WouldBlock forever.
    let err = control.configure_and_connect(device_addr, &cfg).unwrap_err();
    assert!(matches!(err, daq4108::Error::Timeout { .. }));
}
