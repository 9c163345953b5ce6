//! Fuzz target: `RequestParser::feed`
//!
//! Drives arbitrary bytes through both parser modes, whole and split at an
//! arbitrary point, and asserts that accepted requests respect the
//! endpoint and argument bounds.
//!
//! cargo fuzz run fuzz_request_parser

#![no_main]

use homeylink::config::{ARGUMENT_MAX_LEN, ENDPOINT_MAX_LEN};
use homeylink::protocol::request::{Request, RequestParser};
use libfuzzer_sys::fuzz_target;

fn check(request: &Request) {
    assert!(request.endpoint().len() <= ENDPOINT_MAX_LEN);
    assert!(request.endpoint().starts_with('/'));
    if let Some(arg) = request.argument() {
        assert!(!arg.is_empty());
        assert!(arg.len() <= ARGUMENT_MAX_LEN);
    }
}

fuzz_target!(|data: &[u8]| {
    let mut datagram = RequestParser::datagram();
    match datagram.feed(data) {
        Ok(Some(req)) => check(&req),
        Ok(None) => {
            if let Ok(req) = datagram.finish() {
                check(&req);
            }
        }
        Err(_) => {}
    }

    let split = data.first().map_or(0, |&b| b as usize % (data.len() + 1));
    let mut stream = RequestParser::stream();
    if let Ok(Some(req)) = stream.feed(&data[..split]) {
        check(&req);
        return;
    }
    if let Ok(Some(req)) = stream.feed(&data[split..]) {
        check(&req);
    }

    // After a reset the parser must accept a clean request again.
    stream.reset();
    let req = stream.feed(b"GET /ok HTTP/1.1\r\n\r\n").unwrap().unwrap();
    assert_eq!(req.name(), "ok");
});
