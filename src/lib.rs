//! Homeylink device library.
//!
//! Exposes the protocol engine and its `std::net` adapters. The ESP-IDF
//! specific pieces are guarded by the `espidf` feature within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod error;
pub mod protocol;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use protocol::emitter::EventCategory;
pub use protocol::engine::{Engine, Outcome, TickReport};
pub use protocol::registry::{Call, Category, Endpoint};
pub use protocol::response::{Response, Value};
