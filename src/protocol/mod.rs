//! Homey device protocol: endpoint registry, request parsing, dispatch,
//! reply formatting and event emission.
//!
//! ```text
//!              TCP (one request per connection)     UDP (one request per datagram)
//!                         │                                   │
//!                         ▼                                   ▼
//!                   read_request ──────┐          ┌── RequestParser::datagram
//!                                      ▼          ▼
//!                                  Engine::dispatch
//!                   /sys/setmaster ──► Master::learn
//!                   /              ──► index (identity + bindings)
//!                   /<name>        ──► Registry::resolve ──► Endpoint::invoke
//!                                      │                        │
//!                                      ▼                        ▼ Call::trigger …
//!                              format_response             Emitter ──► master (UDP)
//! ```

pub mod emitter;
pub mod engine;
pub mod format;
pub mod identity;
pub mod registry;
pub mod request;
pub mod response;
pub mod transport;
