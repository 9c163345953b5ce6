//! Transport abstraction: the two channel shapes the engine polls.
//!
//! Concrete implementations:
//! - `std::net` TCP listener + UDP socket (host and ESP-IDF std), see
//!   [`crate::adapters::net`]
//! - scripted mocks in the integration tests
//!
//! The engine is generic over these traits, so adding a new network
//! stack requires zero changes to the protocol logic. Every call is
//! non-blocking: "nothing available" is `Ok(0)` / `Ok(None)`, never an
//! error and never a wait.

use core::net::SocketAddr;

/// A connection-oriented listener.
pub trait StreamListener {
    /// Accepted connection type.
    type Stream: Stream;
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Accept one pending connection, if any.
    fn accept(&mut self) -> Result<Option<(Self::Stream, SocketAddr)>, Self::Error>;

    /// Whether accepted connections can be closed by the device.
    fn can_close(&self) -> bool {
        true
    }
}

/// One accepted byte stream.
pub trait Stream {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns 0 if no data is available (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write all of `data` to the stream.
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Close the connection.
    fn close(&mut self);
}

/// A connectionless socket.
pub trait DatagramSocket {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Receive one pending datagram into `buf`, with its source address.
    fn recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, Self::Error>;

    /// Send `data` as a single datagram to `addr`.
    fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> Result<(), Self::Error>;
}

/// Monotonic millisecond clock used for the request timeout.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// A listener that never accepts. Useful when the platform has no
/// stream transport.
pub struct NullListener;

/// Stream type of [`NullListener`]; never constructed by it.
pub struct NullStream;

impl Stream for NullStream {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write_all(&mut self, _data: &[u8]) -> Result<(), ()> {
        Ok(())
    }

    fn close(&mut self) {}
}

impl StreamListener for NullListener {
    type Stream = NullStream;
    type Error = ();

    fn accept(&mut self) -> Result<Option<(NullStream, SocketAddr)>, ()> {
        Ok(None)
    }
}

/// A socket that discards all sends and never receives.
pub struct NullSocket;

impl DatagramSocket for NullSocket {
    type Error = ();

    fn recv_from(&mut self, _buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, ()> {
        Ok(None)
    }

    fn send_to(&mut self, _data: &[u8], _addr: SocketAddr) -> Result<(), ()> {
        Ok(())
    }
}
