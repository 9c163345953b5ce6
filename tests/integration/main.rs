//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the engine end to end
//! against scripted transports. All tests run on the host with no real
//! sockets required.

mod engine_tcp_tests;
mod engine_udp_tests;
mod mock_net;
