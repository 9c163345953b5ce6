//! `std::net` transport adapter.
//!
//! Implements [`StreamListener`], [`Stream`] and [`DatagramSocket`] over
//! non-blocking `std::net` sockets. Runs unchanged on host targets and on
//! ESP-IDF (whose std port is backed by lwIP).
//!
//! ## Connection model
//!
//! 1. `bind()` opens the socket on `0.0.0.0:<port>` in non-blocking mode.
//! 2. `accept()` / `recv_from()` poll; "nothing pending" is `Ok(None)`.
//! 3. Stream reads return `Ok(0)` when no data is buffered and
//!    `Err(Closed)` once the peer has hung up.
//! 4. Replies are written in blocking mode so a short reply never
//!    straddles a `WouldBlock`.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, UdpSocket};

use log::{debug, info, warn};

use crate::error::TransportError;
use crate::protocol::transport::{DatagramSocket, Stream, StreamListener};

// ───────────────────────────────────────────────────────────────
// TCP
// ───────────────────────────────────────────────────────────────

/// Non-blocking TCP listener.
pub struct StdTcpListener {
    listener: TcpListener,
}

impl StdTcpListener {
    /// Bind to `0.0.0.0:<port>`. Port `0` lets the OS pick one
    /// (see [`local_addr`](Self::local_addr)).
    pub fn bind(port: u16) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port)))
            .map_err(|e| {
                warn!("NET(tcp): bind on port {} failed: {}", port, e);
                TransportError::Bind
            })?;
        listener
            .set_nonblocking(true)
            .map_err(|_| TransportError::Bind)?;
        info!("NET(tcp): listening on port {}", port);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener.local_addr().map_err(|_| TransportError::Io)
    }
}

impl StreamListener for StdTcpListener {
    type Stream = StdTcpStream;
    type Error = TransportError;

    fn accept(&mut self) -> Result<Option<(StdTcpStream, SocketAddr)>, TransportError> {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(true).map_err(|_| TransportError::Io)?;
                debug!("NET(tcp): connection from {}", peer);
                Ok(Some((StdTcpStream { stream }, peer)))
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => {
                warn!("NET(tcp): accept error: {}", e);
                Err(TransportError::Io)
            }
        }
    }
}

/// One accepted TCP connection.
pub struct StdTcpStream {
    stream: TcpStream,
}

impl Stream for StdTcpStream {
    type Error = TransportError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.stream.read(buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(ref e) if e.kind() == ErrorKind::Interrupted => Ok(0),
            Err(_) => Err(TransportError::Io),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.stream
            .set_nonblocking(false)
            .map_err(|_| TransportError::Io)?;
        let written = self
            .stream
            .write_all(data)
            .and_then(|()| self.stream.flush());
        // Best effort: the connection is about to be closed or drained.
        let _ = self.stream.set_nonblocking(true);
        written.map_err(|_| TransportError::Io)
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

// ───────────────────────────────────────────────────────────────
// UDP
// ───────────────────────────────────────────────────────────────

/// Non-blocking UDP socket, shared by inbound requests and outbound events.
pub struct StdUdpSocket {
    socket: UdpSocket,
}

impl StdUdpSocket {
    /// Bind to `0.0.0.0:<port>`.
    pub fn bind(port: u16) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], port))).map_err(|e| {
            warn!("NET(udp): bind on port {} failed: {}", port, e);
            TransportError::Bind
        })?;
        socket
            .set_nonblocking(true)
            .map_err(|_| TransportError::Bind)?;
        info!("NET(udp): listening on port {}", port);
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket.local_addr().map_err(|_| TransportError::Io)
    }
}

impl DatagramSocket for StdUdpSocket {
    type Error = TransportError;

    fn recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, TransportError> {
        match self.socket.recv_from(buf) {
            Ok(packet) => Ok(Some(packet)),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(ref e) if e.kind() == ErrorKind::Interrupted => Ok(None),
            Err(e) => {
                warn!("NET(udp): receive error: {}", e);
                Err(TransportError::Io)
            }
        }
    }

    fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> Result<(), TransportError> {
        match self.socket.send_to(data, addr) {
            Ok(n) if n == data.len() => Ok(()),
            Ok(n) => {
                warn!("NET(udp): short send to {} ({} of {} bytes)", addr, n, data.len());
                Err(TransportError::Io)
            }
            Err(_) => Err(TransportError::Io),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests (host only)
// ───────────────────────────────────────────────────────────────
