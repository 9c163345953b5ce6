//! Engine configuration and wire limits.
//!
//! The limits below are shared with every deployed hub client and must
//! not change. The tunables live in [`EngineConfig`], which the host
//! program may persist and reload however it likes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ── Wire limits ───────────────────────────────────────────────

/// Longest endpoint path, leading `/` included.
pub const ENDPOINT_MAX_LEN: usize = 16;
/// Longest argument, measured after percent-decoding.
pub const ARGUMENT_MAX_LEN: usize = 64;
/// Endpoint + argument, each with its terminator.
pub const REQUEST_MAX_LEN: usize = ENDPOINT_MAX_LEN + 1 + ARGUMENT_MAX_LEN + 1;
/// Longest single request or header line.
pub const HEADER_MAX_LEN: usize = REQUEST_MAX_LEN + 16;
/// Default receive timeout for one request (milliseconds).
pub const REQUEST_TIMEOUT_MS: u32 = 100;

/// Longest binding name and device name.
pub const NAME_MAX_LEN: usize = 32;
/// Longest device type.
pub const TYPE_MAX_LEN: usize = 32;

/// Default binding capacity.
pub const MAX_BINDINGS: usize = 10;

/// Listen port for both transports ("HOMEY" on a phone keypad).
pub const DEFAULT_PORT: u16 = 46639;

/// Reply, event and inbound datagram buffer size.
pub const DATAGRAM_MAX_LEN: usize = 1024;

/// Device type reported by a configured device.
pub const DEVICE_TYPE_HOMEYDUINO: &str = "homeyduino";
/// Device type reported before `begin`.
pub const DEVICE_TYPE_UNKNOWN: &str = "unknown";

// ── Tunables ──────────────────────────────────────────────────

/// Runtime configuration for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Port both listeners bind to.
    pub port: u16,
    /// Maximum time to wait for a complete request header (milliseconds).
    pub request_timeout_ms: u32,
    /// Whether the stream transport can close connections after a reply.
    /// Platforms that cannot close leave them open and drain them instead.
    pub close_connections: bool,
    /// Device class reported by the index endpoint.
    pub device_class: heapless::String<16>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut device_class = heapless::String::new();
        let _ = device_class.push_str("other");
        Self {
            port: DEFAULT_PORT,
            request_timeout_ms: REQUEST_TIMEOUT_MS,
            close_connections: true,
            device_class,
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(Error::Config("request_timeout_ms must be non-zero"));
        }
        if self.device_class.is_empty() {
            return Err(Error::Config("device_class must not be empty"));
        }
        Ok(())
    }

    /// Encode into a compact blob for host-side storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Config("encode failed"))
    }

    /// Decode a blob produced by [`to_bytes`](Self::to_bytes) and validate it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let config: Self =
            postcard::from_bytes(bytes).map_err(|_| Error::Config("corrupted config blob"))?;
        config.validate()?;
        Ok(config)
    }
}
