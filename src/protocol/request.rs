//! Request model and the line-oriented request parser.
//!
//! Wire format (both transports):
//! ```text
//! GET /<endpoint>[?<percent-encoded argument>] HTTP/1.1\r\n
//! <header>: <value>\r\n        (any number, discarded)
//! \r\n
//! <body>                       (stream transport only, Content-Length bytes)
//! ```
//!
//! The parser accumulates bytes into a single fixed line buffer and yields
//! a [`Request`] once the header block (and body, if declared) is complete.
//! A single `Stream::read` may return part of a line or several lines at
//! once; anything after a complete request is ignored.

use log::debug;

use crate::config::{ARGUMENT_MAX_LEN, ENDPOINT_MAX_LEN, HEADER_MAX_LEN};
use crate::error::ParseError;

use super::transport::{Clock, Stream};

/// Endpoint path storage, leading `/` included.
pub type EndpointPath = heapless::String<ENDPOINT_MAX_LEN>;
/// Decoded argument storage.
pub type Argument = heapless::String<ARGUMENT_MAX_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One parsed inbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    endpoint: EndpointPath,
    argument: Option<Argument>,
}

impl Request {
    /// Full path, e.g. `/temperature`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Registry lookup key: the path without its leading `/`.
    pub fn name(&self) -> &str {
        self.endpoint.strip_prefix('/').unwrap_or(self.endpoint.as_str())
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

// ── Parser ────────────────────────────────────────────────────

/// Parser state machine.
enum ParserState {
    /// Waiting for the request line.
    RequestLine,
    /// Request line parsed, skipping header lines.
    Headers,
    /// Header block done, collecting `expected` body bytes.
    Body { expected: usize },
}

/// Streaming request parser.
pub struct RequestParser {
    state: ParserState,
    line: heapless::Vec<u8, HEADER_MAX_LEN>,
    /// Current header line exceeded the buffer; only its prefix is kept.
    line_clipped: bool,
    request: Option<Request>,
    content_length: usize,
    body: heapless::Vec<u8, ARGUMENT_MAX_LEN>,
    accept_body: bool,
}

impl RequestParser {
    /// Parser for the connection-oriented transport (reads POST bodies).
    pub fn stream() -> Self {
        Self::new(true)
    }

    /// Parser for datagrams. The end of the packet ends the request and
    /// bodies are ignored.
    pub fn datagram() -> Self {
        Self::new(false)
    }

    fn new(accept_body: bool) -> Self {
        Self {
            state: ParserState::RequestLine,
            line: heapless::Vec::new(),
            line_clipped: false,
            request: None,
            content_length: 0,
            body: heapless::Vec::new(),
            accept_body,
        }
    }

    /// Reset parser state for reuse.
    pub fn reset(&mut self) {
        *self = Self::new(self.accept_body);
    }

    /// Feed bytes into the parser.
    ///
    /// Returns `Ok(Some(request))` once a complete request is available;
    /// trailing bytes are discarded.
    pub fn feed(&mut self, data: &[u8]) -> Result<Option<Request>, ParseError> {
        for &byte in data {
            if let ParserState::Body { expected } = self.state {
                // Capacity is guaranteed by the Content-Length check.
                let _ = self.body.push(byte);
                if self.body.len() == expected {
                    return self.complete_with_body().map(Some);
                }
                continue;
            }

            if byte == b'\n' {
                if let Some(request) = self.end_of_line()? {
                    return Ok(Some(request));
                }
                continue;
            }

            if self.line.push(byte).is_err() {
                match self.state {
                    ParserState::RequestLine => return Err(ParseError::LineTooLong),
                    _ => self.line_clipped = true,
                }
            }
        }
        Ok(None)
    }

    /// Signal end of input (datagram boundary).
    pub fn finish(&mut self) -> Result<Request, ParseError> {
        match self.state {
            ParserState::RequestLine => {
                let line = trim_cr(&self.line);
                if line.is_empty() {
                    return Err(ParseError::Truncated);
                }
                parse_request_line(line)
            }
            ParserState::Headers => self.request.take().ok_or(ParseError::Truncated),
            ParserState::Body { .. } => Err(ParseError::Truncated),
        }
    }

    fn end_of_line(&mut self) -> Result<Option<Request>, ParseError> {
        let result = match self.state {
            ParserState::RequestLine => {
                let line = trim_cr(&self.line);
                // Tolerate stray blank lines before the request line.
                if !line.is_empty() {
                    self.request = Some(parse_request_line(line)?);
                    self.state = ParserState::Headers;
                }
                None
            }
            ParserState::Headers => {
                let line = trim_cr(&self.line);
                if line.is_empty() {
                    self.end_of_headers()?
                } else {
                    if self.accept_body && !self.line_clipped {
                        if let Some(len) = content_length(line) {
                            self.content_length = len;
                        }
                    }
                    None
                }
            }
            ParserState::Body { .. } => None,
        };
        self.line.clear();
        self.line_clipped = false;
        Ok(result)
    }

    fn end_of_headers(&mut self) -> Result<Option<Request>, ParseError> {
        if !self.accept_body || self.content_length == 0 {
            return self.request.take().map(Some).ok_or(ParseError::Truncated);
        }
        if self.content_length > ARGUMENT_MAX_LEN {
            return Err(ParseError::ArgumentTooLong);
        }
        self.state = ParserState::Body {
            expected: self.content_length,
        };
        Ok(None)
    }

    fn complete_with_body(&mut self) -> Result<Request, ParseError> {
        let mut request = self.request.take().ok_or(ParseError::Truncated)?;
        let text = core::str::from_utf8(&self.body).map_err(|_| ParseError::Encoding)?;
        let mut argument = Argument::new();
        argument
            .push_str(text)
            .map_err(|()| ParseError::ArgumentTooLong)?;
        // A body argument overrides the query string.
        request.argument = Some(argument);
        Ok(request)
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Value of a `Content-Length` header line, if this is one.
fn content_length(line: &[u8]) -> Option<usize> {
    let colon = line.iter().position(|&b| b == b':')?;
    let (name, value) = line.split_at(colon);
    if !name.trim_ascii().eq_ignore_ascii_case(b"content-length") {
        return None;
    }
    core::str::from_utf8(&value[1..]).ok()?.trim().parse().ok()
}

/// Parse `METHOD /path[?query] MARKER`.
pub fn parse_request_line(line: &[u8]) -> Result<Request, ParseError> {
    let mut tokens = line.split(|&b| b == b' ').filter(|t| !t.is_empty());
    let (Some(method), Some(target), Some(_marker), None) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(ParseError::MalformedRequestLine);
    };

    let method = match method {
        b"GET" => Method::Get,
        b"POST" => Method::Post,
        _ => return Err(ParseError::UnsupportedMethod),
    };

    if target.first() != Some(&b'/') {
        return Err(ParseError::MalformedRequestLine);
    }

    let (path, query) = match target.iter().position(|&b| b == b'?') {
        Some(q) => (&target[..q], Some(&target[q + 1..])),
        None => (target, None),
    };

    // Bound check before anything is copied.
    if path.len() > ENDPOINT_MAX_LEN {
        return Err(ParseError::EndpointTooLong);
    }
    let path = core::str::from_utf8(path).map_err(|_| ParseError::MalformedRequestLine)?;
    let mut endpoint = EndpointPath::new();
    endpoint
        .push_str(path)
        .map_err(|()| ParseError::EndpointTooLong)?;

    let argument = match query {
        Some(q) if !q.is_empty() => Some(percent_decode(q)?),
        _ => None,
    };

    Ok(Request {
        method,
        endpoint,
        argument,
    })
}

/// Decode `%XX` escapes, then enforce the argument bound.
///
/// Malformed escapes are kept literally.
pub fn percent_decode(input: &[u8]) -> Result<Argument, ParseError> {
    let mut out: heapless::Vec<u8, ARGUMENT_MAX_LEN> = heapless::Vec::new();
    let mut i = 0;
    while i < input.len() {
        let byte = match input[i] {
            b'%' if i + 2 < input.len() => {
                match (hex_val(input[i + 1]), hex_val(input[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        i += 2;
                        (hi << 4) | lo
                    }
                    _ => b'%',
                }
            }
            b => b,
        };
        out.push(byte).map_err(|_| ParseError::ArgumentTooLong)?;
        i += 1;
    }
    let text = core::str::from_utf8(&out).map_err(|_| ParseError::Encoding)?;
    let mut argument = Argument::new();
    argument
        .push_str(text)
        .map_err(|()| ParseError::ArgumentTooLong)?;
    Ok(argument)
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Read one request from `stream`, giving up after `timeout_ms`.
///
/// Blocks the caller for at most the timeout; a stalled or truncated
/// request is reported as [`ParseError::Timeout`].
pub fn read_request<S: Stream, C: Clock>(
    stream: &mut S,
    clock: &C,
    timeout_ms: u32,
) -> Result<Request, ParseError> {
    let mut parser = RequestParser::stream();
    let mut chunk = [0u8; HEADER_MAX_LEN];
    let started = clock.now_ms();

    loop {
        let n = stream.read(&mut chunk).map_err(|e| {
            debug!("HOMEY(tcp): read failed: {:?}", e);
            ParseError::Truncated
        })?;

        if n > 0 {
            if let Some(request) = parser.feed(&chunk[..n])? {
                return Ok(request);
            }
        }

        if clock.now_ms().saturating_sub(started) >= u64::from(timeout_ms) {
            return Err(ParseError::Timeout);
        }
    }
}
