//! The socket abstraction the control and supervisor layers talk through.
//!
//! Grounded in the trait-object transport pattern used to swap a real
//! device link for a test double. A session holds two: a send-only
//! command transport and a recv-capable response/data transport, the
//! latter shared (`Arc<dyn Transport>`) between `Control`'s pre-stream
//! blocking reads and the background receive thread's reads once
//! streaming starts.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// A bidirectional datagram channel bound to one local port and (after
/// [`Transport::connect`]) implicitly addressed to one peer.
///
/// Implemented for [`UdpTransport`] in production; tests implement it over
/// an in-memory channel pair to drive the control state machine without a
/// real socket.
pub trait Transport: Send + Sync {
    /// Restrict `recv`/`send` to the given peer, as `UdpSocket::connect`
    /// does. Framing commands still carry their own addressing fields; this
    /// only fixes the kernel-level default destination.
    fn connect(&self, peer: SocketAddr) -> io::Result<()>;

    fn send(&self, buf: &[u8]) -> io::Result<usize>;

    /// Receive one datagram, blocking up to the transport's configured
    /// read timeout. A timeout surfaces as `io::ErrorKind::WouldBlock` or
    /// `TimedOut`, matching `UdpSocket`'s behavior.
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// The production transport: one [`UdpSocket`] per logical channel (command
/// or data), bound once at session setup.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a new UDP socket to `addr`. `addr`'s port is 0 to let the OS
    /// pick an ephemeral port, or a fixed client port per the wire format.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        Ok(UdpTransport { socket })
    }
}

impl Transport for UdpTransport {
    fn connect(&self, peer: SocketAddr) -> io::Result<()> {
        self.socket.connect(peer)
    }

    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send(buf)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv(buf)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_read_timeout(timeout)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}
