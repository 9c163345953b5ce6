//! Adapters: concrete implementations of the transport port traits.
//!
//! | Adapter | Implements                         | Connects to               |
//! |---------|------------------------------------|---------------------------|
//! | `net`   | StreamListener, Stream             | `std::net` TCP (lwIP)     |
//! |         | DatagramSocket                     | `std::net` UDP (lwIP)     |
//! | `time`  | Clock                              | ESP32 system timer        |
//!
//! Platforms without a closable stream transport can pair
//! [`NullListener`](crate::protocol::transport::NullListener) with a real
//! datagram socket and serve UDP only.

pub mod net;
pub mod time;
