//! Protocol engine: polls both listeners and dispatches calls to endpoints.
//!
//! One [`Engine::tick`] runs, in order:
//!
//! 1. **Stream listener**: accept at most one connection, read one request
//!    (bounded by the request timeout), dispatch, write the reply, close.
//! 2. **Datagram listener**: take at most one pending datagram, dispatch,
//!    send one reply datagram back to its source.
//!
//! Dispatch checks the reserved paths first (`/sys/setmaster`, then the
//! `/` index), then resolves the name across action, condition and
//! capability bindings in that order. Callbacks run to completion inside
//! the tick; a callback that never returns stalls the device.
//!
//! All state (bindings, identity, master) is owned by the engine instance.
//! Requests never overlap, so nothing here needs a lock. Hosts that poll
//! the transports from several threads must wrap the whole engine in one.

use core::net::SocketAddr;

use log::{debug, info, warn};

use crate::config::{DATAGRAM_MAX_LEN, EngineConfig, MAX_BINDINGS};
use crate::error::{EmitError, IdentityError, ParseError, RegistryError};

use super::emitter::{Emitter, EventCategory, EventSink, Master};
use super::format::{ReplyFrame, format_index, format_response};
use super::identity::DeviceIdentity;
use super::registry::{Binding, Call, Category, Endpoint, Registry};
use super::request::{Request, RequestParser, read_request};
use super::response::{Response, Value};
use super::transport::{Clock, DatagramSocket, Stream, StreamListener};

/// Reserved path the hub calls to announce where events should go.
pub const SET_MASTER_ENDPOINT: &str = "/sys/setmaster";
/// Reserved introspection path.
pub const INDEX_ENDPOINT: &str = "/";

/// Upper bound on reads when draining a connection that cannot be closed.
const DRAIN_MAX_READS: usize = 8;

/// What happened to one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A reply with this status code was written.
    Replied { code: u16 },
    /// The request was dropped without a reply.
    Dropped(ParseError),
    /// A reply was built but the transport refused it.
    WriteFailed,
}

/// Per-tick summary, mainly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tcp: Option<Outcome>,
    pub udp: Option<Outcome>,
}

/// Device-side protocol engine.
pub struct Engine<L, U, C, const N: usize = MAX_BINDINGS>
where
    L: StreamListener,
    U: DatagramSocket,
    C: Clock,
{
    config: EngineConfig,
    listener: L,
    socket: U,
    clock: C,
    registry: Registry<N>,
    identity: DeviceIdentity,
    master: Master,
    running: bool,
}

impl<L, U, C, const N: usize> Engine<L, U, C, N>
where
    L: StreamListener,
    U: DatagramSocket,
    C: Clock,
{
    pub fn new(config: EngineConfig, listener: L, socket: U, clock: C) -> Self {
        Self {
            config,
            listener,
            socket,
            clock,
            registry: Registry::new(),
            identity: DeviceIdentity::default(),
            master: Master::default(),
            running: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Set the device identity and start answering requests.
    pub fn begin(&mut self, name: &str, device_type: &str) -> Result<(), IdentityError> {
        // Validate both before committing either.
        let mut identity = DeviceIdentity::default();
        identity.set_name(name)?;
        identity.set_type(device_type)?;
        self.identity = identity;
        self.running = true;
        info!(
            "HOMEY: '{}' ({}) listening on port {}",
            self.identity.name(),
            self.identity.device_type(),
            self.config.port
        );
        Ok(())
    }

    /// Stop answering requests. Bindings and master are kept.
    pub fn stop(&mut self) {
        self.running = false;
        info!("HOMEY: stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn set_name(&mut self, name: &str) -> bool {
        self.identity.set_name(name).is_ok()
    }

    pub fn set_type(&mut self, device_type: &str) -> bool {
        self.identity.set_type(device_type).is_ok()
    }

    /// Learned master address, if any.
    pub fn master(&self) -> Option<SocketAddr> {
        self.master.get()
    }

    // ── Endpoint management ───────────────────────────────────

    pub fn registry(&self) -> &Registry<N> {
        &self.registry
    }

    pub fn register(
        &mut self,
        name: &str,
        category: Category,
        endpoint: impl Endpoint + 'static,
    ) -> Result<(), RegistryError> {
        self.registry.register(name, category, endpoint).inspect_err(|e| {
            warn!("HOMEY: cannot register {}/{}: {}", category.tag(), name, e);
        })
    }

    pub fn find(&self, name: &str, category: Category) -> Option<&Binding> {
        self.registry.find(name, category)
    }

    pub fn remove(&mut self, name: &str, category: Category) -> Result<(), RegistryError> {
        self.registry.remove(name, category)
    }

    /// Remove every binding.
    pub fn clear(&mut self) {
        self.registry.clear();
    }

    pub fn on_action<F>(&mut self, name: &str, callback: F) -> bool
    where
        F: FnMut(&mut Call<'_>) -> Response + 'static,
    {
        self.register(name, Category::Action, callback).is_ok()
    }

    pub fn on_condition<F>(&mut self, name: &str, callback: F) -> bool
    where
        F: FnMut(&mut Call<'_>) -> Response + 'static,
    {
        self.register(name, Category::Condition, callback).is_ok()
    }

    pub fn on_capability<F>(&mut self, name: &str, callback: F) -> bool
    where
        F: FnMut(&mut Call<'_>) -> Response + 'static,
    {
        self.register(name, Category::Capability, callback).is_ok()
    }

    pub fn find_action(&self, name: &str) -> Option<&Binding> {
        self.find(name, Category::Action)
    }

    pub fn find_condition(&self, name: &str) -> Option<&Binding> {
        self.find(name, Category::Condition)
    }

    pub fn find_capability(&self, name: &str) -> Option<&Binding> {
        self.find(name, Category::Capability)
    }

    pub fn remove_action(&mut self, name: &str) -> bool {
        self.remove(name, Category::Action).is_ok()
    }

    pub fn remove_condition(&mut self, name: &str) -> bool {
        self.remove(name, Category::Condition).is_ok()
    }

    pub fn remove_capability(&mut self, name: &str) -> bool {
        self.remove(name, Category::Capability).is_ok()
    }

    // ── Events ────────────────────────────────────────────────

    /// Send one event to the master. Fails immediately if none is known.
    pub fn emit<'v>(
        &mut self,
        name: &str,
        category: EventCategory,
        value: impl Into<Value<'v>>,
    ) -> Result<(), EmitError> {
        Emitter::new(&mut self.socket, &self.master).emit(name, category, value.into())
    }

    pub fn trigger<'v>(&mut self, name: &str, value: impl Into<Value<'v>>) -> bool {
        self.emit(name, EventCategory::Trigger, value).is_ok()
    }

    pub fn set_capability_value<'v>(&mut self, name: &str, value: impl Into<Value<'v>>) -> bool {
        self.emit(name, EventCategory::Capability, value).is_ok()
    }

    /// Raw events are not handled by the stock hub app.
    pub fn emit_raw<'v>(&mut self, name: &str, value: impl Into<Value<'v>>) -> bool {
        self.emit(name, EventCategory::Raw, value).is_ok()
    }

    // ── Polling ───────────────────────────────────────────────

    /// Serve at most one stream request and one datagram request.
    pub fn tick(&mut self) -> TickReport {
        if !self.running {
            return TickReport::default();
        }
        TickReport {
            tcp: self.handle_tcp(),
            udp: self.handle_udp(),
        }
    }

    /// Route one parsed request and produce its response.
    pub fn dispatch(&mut self, request: &Request, source: SocketAddr) -> Response {
        let endpoint = request.endpoint();

        if endpoint == SET_MASTER_ENDPOINT {
            return self.master.learn(source.ip(), request.argument());
        }
        if endpoint == INDEX_ENDPOINT {
            return Response::index();
        }

        let Some(binding) = self.registry.resolve(request.name()) else {
            debug!("HOMEY: unknown endpoint {} from {}", endpoint, source);
            return Response::error_with_code("unknown endpoint", 404);
        };

        let mut emitter = Emitter::new(&mut self.socket, &self.master);
        let mut call = Call::new(request.argument(), source, &mut emitter);
        binding.invoke(&mut call)
    }

    /// Encode a response for the wire.
    pub fn render(&self, response: &Response) -> ReplyFrame {
        let frame = if response.index {
            format_index(
                &self.identity,
                &self.config.device_class,
                &self.master,
                &self.registry,
            )
        } else {
            format_response(response)
        };

        frame.unwrap_or_else(|| {
            warn!("HOMEY: reply does not fit {} bytes", DATAGRAM_MAX_LEN);
            // The fallback is short enough to always fit.
            format_response(&Response::error("reply too large")).unwrap_or_default()
        })
    }

    fn handle_tcp(&mut self) -> Option<Outcome> {
        let (mut stream, peer) = match self.listener.accept() {
            Ok(Some(conn)) => conn,
            Ok(None) => return None,
            Err(e) => {
                warn!("HOMEY(tcp): accept failed: {:?}", e);
                return None;
            }
        };

        let outcome = match read_request(&mut stream, &self.clock, self.config.request_timeout_ms) {
            Ok(request) => {
                let response = self.dispatch(&request, peer);
                let frame = self.render(&response);
                match stream.write_all(&frame) {
                    Ok(()) => {
                        info!(
                            "HOMEY(tcp)[{}]: {} -> {}",
                            peer,
                            request.endpoint(),
                            response.code
                        );
                        Outcome::Replied {
                            code: response.code,
                        }
                    }
                    Err(e) => {
                        warn!("HOMEY(tcp)[{}]: write failed: {:?}", peer, e);
                        Outcome::WriteFailed
                    }
                }
            }
            Err(e) => {
                debug!("HOMEY(tcp)[{}]: dropped: {}", peer, e);
                Outcome::Dropped(e)
            }
        };

        if self.config.close_connections && self.listener.can_close() {
            stream.close();
        } else {
            drain(&mut stream);
        }
        Some(outcome)
    }

    fn handle_udp(&mut self) -> Option<Outcome> {
        let mut buf = [0u8; DATAGRAM_MAX_LEN];
        let (len, source) = match self.socket.recv_from(&mut buf) {
            Ok(Some(packet)) => packet,
            Ok(None) => return None,
            Err(e) => {
                warn!("HOMEY(udp): receive failed: {:?}", e);
                return None;
            }
        };

        let mut parser = RequestParser::datagram();
        let request = match parser.feed(&buf[..len]) {
            Ok(Some(request)) => Ok(request),
            Ok(None) => parser.finish(),
            Err(e) => Err(e),
        };
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                debug!("HOMEY(udp)[{}]: dropped: {}", source, e);
                return Some(Outcome::Dropped(e));
            }
        };

        let response = self.dispatch(&request, source);
        let frame = self.render(&response);
        match self.socket.send_to(&frame, source) {
            Ok(()) => {
                info!(
                    "HOMEY(udp)[{}]: {} -> {}",
                    source,
                    request.endpoint(),
                    response.code
                );
                Some(Outcome::Replied {
                    code: response.code,
                })
            }
            Err(e) => {
                warn!("HOMEY(udp)[{}]: send failed: {:?}", source, e);
                Some(Outcome::WriteFailed)
            }
        }
    }
}

/// Discard whatever the peer still has buffered on a connection the
/// platform cannot close.
fn drain<S: Stream>(stream: &mut S) {
    let mut scratch = [0u8; 64];
    for _ in 0..DRAIN_MAX_READS {
        match stream.read(&mut scratch) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
    }
}
