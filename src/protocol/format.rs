//! Reply formatter.
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: Boolean\r\n     (omitted for null results)
//! Content-Length: 4\r\n
//! Connection: close\r\n
//! \r\n
//! true
//! ```
//!
//! The same bytes go out as the TCP reply and as the UDP reply datagram.

use core::fmt::{self, Write};

use serde::Serialize;

use crate::config::DATAGRAM_MAX_LEN;

use super::emitter::Master;
use super::identity::DeviceIdentity;
use super::registry::Registry;
use super::response::{Response, ValueKind};

/// Encoded reply, sized to fit a single datagram.
pub type ReplyFrame = heapless::Vec<u8, DATAGRAM_MAX_LEN>;

/// Content type of the index payload.
pub const INDEX_CONTENT_TYPE: &str = "application/json";

/// Render a callback's response.
pub fn format_response(response: &Response) -> Option<ReplyFrame> {
    let content_type = match response.kind {
        ValueKind::Null => None,
        kind => Some(kind.tag()),
    };
    let body = match response.kind {
        ValueKind::Null => "",
        _ => response.body.as_str(),
    };
    render(response.code, content_type, body)
}

#[derive(Serialize)]
struct MasterInfo {
    host: heapless::String<40>,
    port: u16,
}

#[derive(Serialize)]
struct ApiEntry<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    category: &'a str,
}

#[derive(Serialize)]
struct IndexBody<'a, const N: usize> {
    id: &'a str,
    #[serde(rename = "type")]
    device_type: &'a str,
    class: &'a str,
    arch: &'a str,
    version: &'a str,
    master: MasterInfo,
    api: heapless::Vec<ApiEntry<'a>, N>,
}

/// Render the introspection payload: identity, master and every binding.
pub fn format_index<const N: usize>(
    identity: &DeviceIdentity,
    class: &str,
    master: &Master,
    registry: &Registry<N>,
) -> Option<ReplyFrame> {
    let mut host = heapless::String::new();
    let port = match master.get() {
        Some(addr) => {
            write!(host, "{}", addr.ip()).ok()?;
            addr.port()
        }
        None => 0,
    };

    let body: IndexBody<'_, N> = IndexBody {
        id: identity.name(),
        device_type: identity.device_type(),
        class,
        arch: std::env::consts::ARCH,
        version: env!("CARGO_PKG_VERSION"),
        master: MasterInfo { host, port },
        api: registry
            .iter()
            .map(|b| ApiEntry {
                name: b.name(),
                category: b.category().tag(),
            })
            .collect(),
    };

    let json = serde_json::to_string(&body).ok()?;
    render(200, Some(INDEX_CONTENT_TYPE), &json)
}

fn render(code: u16, content_type: Option<&str>, body: &str) -> Option<ReplyFrame> {
    let mut out: heapless::String<DATAGRAM_MAX_LEN> = heapless::String::new();
    write_reply(&mut out, code, content_type, body).ok()?;
    Some(out.into_bytes())
}

fn write_reply(
    out: &mut impl Write,
    code: u16,
    content_type: Option<&str>,
    body: &str,
) -> fmt::Result {
    write!(out, "HTTP/1.1 {} {}\r\n", code, reason(code))?;
    if let Some(content_type) = content_type {
        write!(out, "Content-Type: {}\r\n", content_type)?;
    }
    write!(
        out,
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

fn reason(code: u16) -> &'static str {
    match code {
        200..=299 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Error",
    }
}
