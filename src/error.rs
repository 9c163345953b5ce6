//! Unified error types for the protocol engine.
//!
//! A single `Error` enum that every subsystem converts into, so the host
//! program can log any failure uniformly. All variants are `Copy` so they
//! can be passed through the tick path without allocation.
//!
//! None of these are fatal: the engine drops the offending request or
//! event and carries on with the next tick.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level engine error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Endpoint registration or lookup failed.
    Registry(RegistryError),
    /// An inbound request was malformed, oversized or timed out.
    Parse(ParseError),
    /// An outbound event could not be delivered.
    Emit(EmitError),
    /// Device identity update rejected.
    Identity(IdentityError),
    /// A transport primitive failed.
    Transport(TransportError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Emit(e) => write!(f, "emit: {e}"),
            Self::Identity(e) => write!(f, "identity: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Every binding slot is occupied.
    Full,
    /// A binding with the same (name, category) already exists.
    Duplicate,
    /// Name is empty or longer than `NAME_MAX_LEN`.
    InvalidName,
    /// No binding matches the (name, category) pair.
    NotFound,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "registry full"),
            Self::Duplicate => write!(f, "duplicate binding"),
            Self::InvalidName => write!(f, "invalid endpoint name"),
            Self::NotFound => write!(f, "binding not found"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Request line did not match `METHOD /path[?query] MARKER`.
    MalformedRequestLine,
    /// Unsupported request method.
    UnsupportedMethod,
    /// Endpoint path exceeds `ENDPOINT_MAX_LEN`.
    EndpointTooLong,
    /// Decoded argument exceeds `ARGUMENT_MAX_LEN`.
    ArgumentTooLong,
    /// Request or header line exceeds `HEADER_MAX_LEN`.
    LineTooLong,
    /// Argument bytes are not valid UTF-8 after decoding.
    Encoding,
    /// Input ended before the request was complete.
    Truncated,
    /// The request did not complete within the receive timeout.
    Timeout,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRequestLine => write!(f, "malformed request line"),
            Self::UnsupportedMethod => write!(f, "unsupported method"),
            Self::EndpointTooLong => write!(f, "endpoint too long"),
            Self::ArgumentTooLong => write!(f, "argument too long"),
            Self::LineTooLong => write!(f, "line too long"),
            Self::Encoding => write!(f, "invalid argument encoding"),
            Self::Truncated => write!(f, "truncated request"),
            Self::Timeout => write!(f, "request timed out"),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Emission errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitError {
    /// No master address has been learned yet.
    NoMaster,
    /// Event name is empty or longer than `NAME_MAX_LEN`.
    InvalidName,
    /// Event frame does not fit in a datagram.
    TooLarge,
    /// The datagram transport refused the send.
    SendFailed,
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMaster => write!(f, "no master learned"),
            Self::InvalidName => write!(f, "invalid event name"),
            Self::TooLarge => write!(f, "event frame too large"),
            Self::SendFailed => write!(f, "datagram send failed"),
        }
    }
}

impl From<EmitError> for Error {
    fn from(e: EmitError) -> Self {
        Self::Emit(e)
    }
}

// ---------------------------------------------------------------------------
// Identity errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    NameTooLong,
    TypeTooLong,
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameTooLong => write!(f, "device name too long"),
            Self::TypeTooLong => write!(f, "device type too long"),
        }
    }
}

impl From<IdentityError> for Error {
    fn from(e: IdentityError) -> Self {
        Self::Identity(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Socket could not be bound.
    Bind,
    /// Read, write or accept failed.
    Io,
    /// Peer closed the connection.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind => write!(f, "bind failed"),
            Self::Io => write!(f, "socket I/O error"),
            Self::Closed => write!(f, "connection closed"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
