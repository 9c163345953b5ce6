//! Outbound events and master-address learning.
//!
//! Events are single JSON datagrams sent to the learned master:
//!
//! ```text
//! {"type":"cap","name":"temperature","argType":"Number","arg":21.5}
//! ```
//!
//! Emission is fire-and-forget. Nothing is queued, retried or acknowledged;
//! an event raised before the hub has called `/sys/setmaster` is lost.

use core::net::{IpAddr, SocketAddr};

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{DATAGRAM_MAX_LEN, NAME_MAX_LEN};
use crate::error::EmitError;

use super::registry::Category;
use super::response::{Response, Value};
use super::transport::DatagramSocket;

/// Encoded event datagram.
pub type EventFrame = heapless::Vec<u8, DATAGRAM_MAX_LEN>;

/// Kind of outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    /// Starts a flow on the hub.
    Trigger,
    /// Reports a changed capability value.
    Capability,
    /// Custom event the stock hub app ignores.
    Raw,
}

impl EventCategory {
    pub const fn category(self) -> Category {
        match self {
            Self::Trigger => Category::Trigger,
            Self::Capability => Category::Capability,
            Self::Raw => Category::Raw,
        }
    }

    pub const fn tag(self) -> &'static str {
        self.category().tag()
    }
}

/// Anything that can push an event towards the master.
pub trait EventSink {
    fn emit(&mut self, name: &str, category: EventCategory, value: Value<'_>)
    -> Result<(), EmitError>;
}

#[derive(Serialize)]
struct EventBody<'a> {
    #[serde(rename = "type")]
    category: &'a str,
    name: &'a str,
    #[serde(rename = "argType")]
    arg_type: &'a str,
    arg: serde_json::Value,
}

/// Render one event datagram.
pub fn encode_event(
    name: &str,
    category: EventCategory,
    value: Value<'_>,
) -> Result<EventFrame, EmitError> {
    if name.is_empty() || name.len() > NAME_MAX_LEN {
        return Err(EmitError::InvalidName);
    }

    let body = EventBody {
        category: category.tag(),
        name,
        arg_type: value.kind().tag(),
        arg: value.to_json(),
    };
    let bytes = serde_json::to_vec(&body).map_err(|_| EmitError::TooLarge)?;
    EventFrame::from_slice(&bytes).map_err(|()| EmitError::TooLarge)
}

// ── Master address ────────────────────────────────────────────

/// The single hub all events go to. Unset until `/sys/setmaster`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Master {
    addr: Option<SocketAddr>,
}

impl Master {
    pub fn get(&self) -> Option<SocketAddr> {
        self.addr
    }

    pub fn set(&mut self, addr: SocketAddr) {
        self.addr = Some(addr);
    }

    /// Handle a `/sys/setmaster` call: the caller's address becomes the
    /// host, the argument names the port it listens on.
    pub fn learn(&mut self, source: IpAddr, argument: Option<&str>) -> Response {
        let Some(port) = argument.and_then(parse_port) else {
            warn!("HOMEY: setmaster from {} with invalid port {:?}", source, argument);
            return Response::error_with_code("invalid port", 400);
        };

        let addr = SocketAddr::new(source, port);
        if self.addr != Some(addr) {
            info!("HOMEY: master set to {}", addr);
        }
        self.addr = Some(addr);
        Response::nothing()
    }
}

fn parse_port(arg: &str) -> Option<u16> {
    match arg.trim().parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}

// ── Emitter ───────────────────────────────────────────────────

/// Short-lived view pairing the datagram socket with the master address.
pub struct Emitter<'a, U: DatagramSocket> {
    socket: &'a mut U,
    master: Option<SocketAddr>,
}

impl<'a, U: DatagramSocket> Emitter<'a, U> {
    pub fn new(socket: &'a mut U, master: &Master) -> Self {
        Self {
            socket,
            master: master.get(),
        }
    }
}

impl<U: DatagramSocket> EventSink for Emitter<'_, U> {
    fn emit(
        &mut self,
        name: &str,
        category: EventCategory,
        value: Value<'_>,
    ) -> Result<(), EmitError> {
        let Some(master) = self.master else {
            debug!("HOMEY(emit): no master, dropping {}/{}", category.tag(), name);
            return Err(EmitError::NoMaster);
        };

        let frame = encode_event(name, category, value)?;
        self.socket.send_to(&frame, master).map_err(|e| {
            warn!("HOMEY(emit): send to {} failed: {:?}", master, e);
            EmitError::SendFailed
        })?;

        debug!("HOMEY(emit): {}/{} -> {}", category.tag(), name, master);
        Ok(())
    }
}
