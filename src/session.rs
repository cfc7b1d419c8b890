//! Public entry point: a single-device acquisition session.

use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::SessionConfig;
use crate::control::{Control, ControlState};
use crate::device_state::DeviceState;
use crate::error::{Error, Result};
use crate::rate::{self, RateParameters};
use crate::supervisor::{DataCallback, Supervisor};
use crate::transport::{Transport, UdpTransport};

/// Keep-alive cadence while streaming, per the wire format's keep-alive
/// sub-command.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(6);
/// How often the receive thread re-checks its pause/terminate signal
/// between datagrams, once streaming. Unrelated to the 2 s command/response
/// timeout used before streaming starts.
const RECEIVE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A session against one device. Owns the command and response/data sockets
/// and, once streaming, the background threads that service them.
pub struct Session {
    config: SessionConfig,
    control: Arc<Mutex<Control>>,
    response_transport: Option<Arc<dyn Transport>>,
    devices: Arc<Mutex<Vec<DeviceState>>>,
    supervisor: Option<Supervisor>,
}

impl Session {
    /// Build a session for `config`, without touching the network yet.
    pub fn new(config: SessionConfig) -> Self {
        let devices = Arc::new(Mutex::new(vec![DeviceState::new(0, config.scan_list.len())]));
        Session {
            config,
            // Placeholder transports are replaced in `bind`; storing
            // `Control` behind a lock from construction keeps the
            // keep-alive thread's borrow uniform across the pre- and
            // post-streaming states.
            control: Arc::new(Mutex::new(Control::new(no_transport(), no_transport()))),
            response_transport: None,
            devices,
            supervisor: None,
        }
    }

    /// Look up the rate registers a target Hz would program, without
    /// altering any session state. Useful for a caller to display or log
    /// the effective rate before committing to `configure_and_connect`.
    pub fn plan_rate(rate_hz: u32) -> Result<RateParameters> {
        rate::plan(rate_hz)
    }

    /// Bind the command socket (send-only) and the response/data socket
    /// (receives every response and ADC datagram, per §6 of the wire
    /// format).
    pub fn bind(&mut self) -> Result<()> {
        let host = IpAddr::V4(self.config.addrs.host);
        let command_transport: Arc<dyn Transport> = Arc::new(UdpTransport::bind(SocketAddr::new(
            host,
            self.config.ports.client_command,
        ))?);
        let response_transport: Arc<dyn Transport> = Arc::new(UdpTransport::bind(SocketAddr::new(
            host,
            self.config.ports.client_data,
        ))?);

        *self.control.lock().unwrap() = Control::new(command_transport, Arc::clone(&response_transport));
        self.control.lock().unwrap().bind()?;
        self.response_transport = Some(response_transport);
        Ok(())
    }

    /// Program the scan list/rate and issue `CONNECT`.
    pub fn configure_and_connect(&mut self) -> Result<()> {
        let device_addr = SocketAddr::new(
            IpAddr::V4(self.config.addrs.device),
            self.config.ports.device_command,
        );
        let config = self.config.clone();
        self.control
            .lock()
            .unwrap()
            .configure_and_connect(device_addr, &config)
    }

    /// Issue `SYNCSTART` and spawn the receive and keep-alive threads.
    /// `on_data` is invoked on the receive thread once per ingested packet.
    pub fn start(&mut self, on_data: DataCallback) -> Result<()> {
        self.control.lock().unwrap().start()?;

        let response_transport = self
            .response_transport
            .clone()
            .ok_or(Error::Protocol("start called before bind"))?;
        // Switch from the long command/response timeout to a short poll
        // interval now that the receive thread, not a blocking caller, owns
        // this socket's reads.
        response_transport.set_read_timeout(Some(RECEIVE_POLL_INTERVAL))?;

        self.supervisor = Some(Supervisor::spawn(
            response_transport,
            Arc::clone(&self.devices),
            self.config.scan_list.clone(),
            self.config.loss_log_threshold,
            on_data,
            Arc::clone(&self.control),
            KEEP_ALIVE_INTERVAL,
        ));
        Ok(())
    }

    /// Issue `SYNCSTOP` and pause the receive task; the keep-alive task
    /// keeps running (the session is stopped, not disconnected). Matches
    /// the control state machine's `Streaming -> Stopped` edge, which only
    /// pauses the receive signal.
    pub fn stop(&mut self) -> Result<()> {
        self.control.lock().unwrap().stop()?;
        if let Some(supervisor) = &self.supervisor {
            supervisor.pause_receive();
        }
        Ok(())
    }

    /// Issue `DISCONNECT`, then terminate and join both background threads.
    pub fn disconnect(&mut self) -> Result<()> {
        self.control.lock().unwrap().disconnect()?;
        if let Some(mut supervisor) = self.supervisor.take() {
            supervisor.shutdown();
        }
        Ok(())
    }

    /// Issue the `info` sub-command and return the device's ASCII reply.
    pub fn device_info(&mut self, code: u8) -> Result<String> {
        self.control.lock().unwrap().device_info(code)
    }

    pub fn state(&self) -> ControlState {
        self.control.lock().unwrap().state()
    }

    /// Snapshot of the device's tracked cumulative counters, for callers
    /// that poll instead of using the `on_data` callback.
    pub fn with_device<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        let devices = self.devices.lock().unwrap();
        f(&devices[0])
    }
}

/// A transport that errors on every call, used only as `Control`'s
/// placeholder before `Session::bind` installs the real ones.
fn no_transport() -> Arc<dyn Transport> {
    Arc::new(NoTransport)
}

struct NoTransport;

impl Transport for NoTransport {
    fn connect(&self, _peer: SocketAddr) -> std::io::Result<()> {
        Err(not_bound())
    }
    fn send(&self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(not_bound())
    }
    fn recv(&self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(not_bound())
    }
    fn set_read_timeout(&self, _timeout: Option<Duration>) -> std::io::Result<()> {
        Err(not_bound())
    }
    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        Err(not_bound())
    }
}

fn not_bound() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "session not bound yet")
}
