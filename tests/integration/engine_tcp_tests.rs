//! Stream-transport tests: one request per connection through `tick()`.

use std::cell::Cell;
use std::rc::Rc;

use homeylink::error::ParseError;
use homeylink::{EngineConfig, Outcome, Response};

use crate::mock_net::{MockListener, addr, rig, rig_with};

const PEER: &str = "192.168.1.20:51000";

#[test]
fn idle_tick_does_nothing() {
    let mut r = rig();
    let report = r.engine.tick();
    assert!(report.tcp.is_none());
    assert!(report.udp.is_none());
}

#[test]
fn get_with_argument_returns_boolean() {
    let mut r = rig();
    r.engine.on_capability("temperature", |call| {
        Response::result(call.argument() == Some("21.5"))
    });

    let conn = r.listener.connect(
        addr(PEER),
        &[b"GET /temperature?21.5 HTTP/1.1\r\nHost: device\r\n\r\n"],
    );
    let report = r.engine.tick();

    assert_eq!(report.tcp, Some(Outcome::Replied { code: 200 }));
    let reply = conn.written();
    assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(reply.contains("Content-Type: Boolean\r\n"));
    assert_eq!(conn.body(), "true");
    assert!(conn.closed());
}

#[test]
fn request_split_across_reads() {
    let mut r = rig();
    r.engine.on_action("led", |call| {
        Response::result(call.argument().unwrap_or("none"))
    });

    let conn = r.listener.connect(
        addr(PEER),
        &[b"GE", b"T /led?o", b"n HTTP/1.1\r", b"\nHost: x\r\n", b"\r\n"],
    );
    r.engine.tick();
    assert_eq!(conn.body(), "on");
}

#[test]
fn percent_encoded_argument_is_decoded() {
    let mut r = rig();
    r.engine.on_action("say", |call| {
        Response::result(call.argument().unwrap_or(""))
    });
    let conn = r
        .listener
        .connect(addr(PEER), &[b"GET /say?hello%20world HTTP/1.1\r\n\r\n"]);
    r.engine.tick();
    assert_eq!(conn.body(), "hello world");
}

#[test]
fn overlong_endpoint_dropped_without_invoking_callback() {
    let mut r = rig();
    let invoked = Rc::new(Cell::new(false));
    let seen = invoked.clone();
    r.engine.on_action("abcdefghijklmnopqrs", move |_| {
        seen.set(true);
        Response::nothing()
    });

    // 20-byte path, over the 16-byte bound.
    let conn = r
        .listener
        .connect(addr(PEER), &[b"GET /abcdefghijklmnopqrs HTTP/1.1\r\n\r\n"]);
    let report = r.engine.tick();

    assert_eq!(
        report.tcp,
        Some(Outcome::Dropped(ParseError::EndpointTooLong))
    );
    assert!(!invoked.get());
    assert!(conn.written().is_empty());
    assert!(conn.closed());
}

#[test]
fn overlong_argument_dropped() {
    let mut r = rig();
    let arg = "x".repeat(65);
    let line = format!("GET /a?{} HTTP/1.1\r\n\r\n", arg);
    let conn = r.listener.connect(addr(PEER), &[line.as_bytes()]);
    let report = r.engine.tick();
    assert_eq!(
        report.tcp,
        Some(Outcome::Dropped(ParseError::ArgumentTooLong))
    );
    assert!(conn.written().is_empty());
}

#[test]
fn stalled_request_times_out() {
    let mut r = rig();
    // No line terminator ever arrives.
    let conn = r.listener.connect(addr(PEER), &[b"GET /slow"]);
    let report = r.engine.tick();

    assert_eq!(report.tcp, Some(Outcome::Dropped(ParseError::Timeout)));
    assert!(conn.written().is_empty());
    assert!(conn.closed());
    // 100 ms budget at 10 ms per clock read bounds the number of reads.
    assert!(conn.reads() <= 12, "reads: {}", conn.reads());
}

#[test]
fn post_body_overrides_query() {
    let mut r = rig();
    r.engine.on_action("echo", |call| {
        Response::result(call.argument().unwrap_or(""))
    });
    let conn = r.listener.connect(
        addr(PEER),
        &[b"POST /echo?query HTTP/1.1\r\nContent-Length: 4\r\n\r\nbody"],
    );
    r.engine.tick();
    assert_eq!(conn.body(), "body");
}

#[test]
fn unknown_endpoint_is_404() {
    let mut r = rig();
    let conn = r
        .listener
        .connect(addr(PEER), &[b"GET /missing HTTP/1.1\r\n\r\n"]);
    let report = r.engine.tick();
    assert_eq!(report.tcp, Some(Outcome::Replied { code: 404 }));
    assert!(conn.written().starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(conn.body(), "unknown endpoint");
}

#[test]
fn callback_error_is_500() {
    let mut r = rig();
    r.engine
        .on_action("fail", |_| Response::error("motor jammed"));
    let conn = r
        .listener
        .connect(addr(PEER), &[b"GET /fail HTTP/1.1\r\n\r\n"]);
    r.engine.tick();
    assert!(conn.written().starts_with("HTTP/1.1 500 "));
    assert_eq!(conn.body(), "motor jammed");
}

#[test]
fn unsupported_method_dropped() {
    let mut r = rig();
    let conn = r
        .listener
        .connect(addr(PEER), &[b"DELETE /x HTTP/1.1\r\n\r\n"]);
    let report = r.engine.tick();
    assert_eq!(
        report.tcp,
        Some(Outcome::Dropped(ParseError::UnsupportedMethod))
    );
    assert!(conn.written().is_empty());
}

#[test]
fn one_connection_per_tick() {
    let mut r = rig();
    r.engine.on_action("a", |_| Response::nothing());
    let first = r.listener.connect(addr(PEER), &[b"GET /a HTTP/1.1\r\n\r\n"]);
    let second = r.listener.connect(addr(PEER), &[b"GET /a HTTP/1.1\r\n\r\n"]);

    r.engine.tick();
    assert!(!first.written().is_empty());
    assert!(second.written().is_empty());

    r.engine.tick();
    assert!(!second.written().is_empty());
}

#[test]
fn unclosable_platform_drains_instead_of_closing() {
    let mut r = rig_with(EngineConfig::default(), MockListener::unclosable());
    r.engine.on_action("a", |_| Response::nothing());
    let conn = r.listener.connect(
        addr(PEER),
        &[b"GET /a HTTP/1.1\r\n\r\n", b"leftover"],
    );
    r.engine.tick();
    assert!(!conn.closed());
    assert!(conn.written().starts_with("HTTP/1.1 200 OK"));
    // Request read, leftover drained, then one empty read ends the drain.
    assert!(conn.reads() >= 3);
}

#[test]
fn close_connections_disabled_in_config() {
    let config = EngineConfig {
        close_connections: false,
        ..EngineConfig::default()
    };
    let mut r = rig_with(config, MockListener::new());
    r.engine.on_action("a", |_| Response::nothing());
    let conn = r.listener.connect(addr(PEER), &[b"GET /a HTTP/1.1\r\n\r\n"]);
    r.engine.tick();
    assert!(!conn.closed());
}

#[test]
fn stopped_engine_leaves_connections_pending() {
    let mut r = rig();
    r.engine.stop();
    let conn = r.listener.connect(addr(PEER), &[b"GET / HTTP/1.1\r\n\r\n"]);
    assert!(r.engine.tick().tcp.is_none());
    assert_eq!(conn.reads(), 0);
}
