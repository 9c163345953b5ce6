//! Datagram-transport tests: one request per packet, one reply per request.

use homeylink::error::ParseError;
use homeylink::{Call, Category, Endpoint, Outcome, Response};

use crate::mock_net::{Rig, addr, rig};

const HUB: &str = "10.0.0.5:40000";

#[test]
fn reply_goes_back_to_source() {
    let mut r = rig();
    r.engine.on_action("led", |_| Response::result(true));

    r.socket.deliver(addr(HUB), b"GET /led?1 HTTP/1.1\r\n\r\n");
    let report = r.engine.tick();

    assert_eq!(report.udp, Some(Outcome::Replied { code: 200 }));
    let sent = r.socket.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, addr(HUB));
    assert!(sent[0].0.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(sent[0].0.ends_with("\r\n\r\ntrue"));
}

#[test]
fn bare_request_line_without_terminator() {
    let mut r = rig();
    r.engine.on_condition("door", |_| Response::result(false));
    r.socket.deliver(addr(HUB), b"GET /door HTTP/1.1");
    r.engine.tick();
    let sent = r.socket.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].0.ends_with("false"));
}

fn ask_foo(r: &mut Rig) -> String {
    r.socket.deliver(addr(HUB), b"GET /foo HTTP/1.1\r\n\r\n");
    r.engine.tick();
    let sent = r.socket.sent();
    sent.last().unwrap().0.rsplit("\r\n").next().unwrap().to_string()
}

#[test]
fn dispatch_precedence_action_condition_capability() {
    let mut r = rig();
    r.engine.on_capability("foo", |_| Response::result("cap"));
    r.engine.on_condition("foo", |_| Response::result("con"));
    r.engine.on_action("foo", |_| Response::result("act"));

    assert_eq!(ask_foo(&mut r), "act");
    assert!(r.engine.remove_action("foo"));
    assert_eq!(ask_foo(&mut r), "con");
    assert!(r.engine.remove_condition("foo"));
    assert_eq!(ask_foo(&mut r), "cap");
}

#[test]
fn malformed_datagram_gets_no_reply() {
    let mut r = rig();
    r.socket.deliver(addr(HUB), b"this is not a request\r\n\r\n");
    let report = r.engine.tick();
    assert_eq!(
        report.udp,
        Some(Outcome::Dropped(ParseError::MalformedRequestLine))
    );
    assert!(r.socket.sent().is_empty());
}

#[test]
fn empty_datagram_dropped() {
    let mut r = rig();
    r.socket.deliver(addr(HUB), b"");
    let report = r.engine.tick();
    assert_eq!(report.udp, Some(Outcome::Dropped(ParseError::Truncated)));
}

#[test]
fn index_lists_bindings_and_identity() {
    let mut r = rig();
    r.engine.on_action("led", |_| Response::nothing());
    r.engine.on_capability("measure_temperature", |_| Response::result(21.5f32));

    r.socket.deliver(addr(HUB), b"GET / HTTP/1.1\r\n\r\n");
    r.engine.tick();

    let sent = r.socket.sent();
    let (head, body) = sent[0].0.split_once("\r\n\r\n").unwrap();
    assert!(head.contains("Content-Type: application/json"));

    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["id"], "test-device");
    assert_eq!(json["type"], "homeyduino");
    assert_eq!(json["class"], "other");
    let api = json["api"].as_array().unwrap();
    assert_eq!(api.len(), 2);
    assert_eq!(api[1]["name"], "measure_temperature");
    assert_eq!(api[1]["type"], "cap");
}

#[test]
fn registry_capacity_is_ten() {
    let mut r = rig();
    for i in 0..10 {
        assert!(r.engine.on_action(&format!("a{}", i), |_| Response::nothing()));
    }
    assert!(!r.engine.on_action("a10", |_| Response::nothing()));
    assert_eq!(r.engine.registry().len(), 10);

    r.engine.clear();
    assert!(r.engine.on_action("a10", |_| Response::nothing()));
}

/// Stateful endpoint: counts invocations and reports the running total.
struct Counter(i64);

impl Endpoint for Counter {
    fn invoke(&mut self, _call: &mut Call<'_>) -> Response {
        self.0 += 1;
        Response::result(self.0)
    }
}

#[test]
fn struct_endpoint_keeps_state_between_calls() {
    let mut r = rig();
    r.engine
        .register("count", Category::Capability, Counter(0))
        .unwrap();

    for _ in 0..3 {
        r.socket.deliver(addr(HUB), b"GET /count HTTP/1.1\r\n\r\n");
        r.engine.tick();
    }
    let sent = r.socket.sent();
    assert!(sent[2].0.ends_with("\r\n\r\n3"));
    assert!(sent[2].0.contains("Content-Type: Number"));
}

#[test]
fn tcp_and_udp_served_in_same_tick() {
    let mut r = rig();
    r.engine.on_action("a", |_| Response::nothing());
    let conn = r
        .listener
        .connect(addr("192.168.1.20:51000"), &[b"GET /a HTTP/1.1\r\n\r\n"]);
    r.socket.deliver(addr(HUB), b"GET /a HTTP/1.1\r\n\r\n");

    let report = r.engine.tick();
    assert_eq!(report.tcp, Some(Outcome::Replied { code: 200 }));
    assert_eq!(report.udp, Some(Outcome::Replied { code: 200 }));
    assert!(conn.closed());
}
