//! Typed values and the response a callback hands back.

use core::fmt::{self, Write};

use log::warn;

/// Longest response body a callback can produce.
pub const BODY_MAX_LEN: usize = 256;

/// Response body storage.
pub type Body = heapless::String<BODY_MAX_LEN>;

/// Wire type tag of a value or response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    #[default]
    Null,
    String,
    Number,
    Boolean,
}

impl ValueKind {
    /// Tag used in the `Content-Type` line and in event frames.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
        }
    }
}

/// A scalar carried by a response or an event.
///
/// Integer and floating types are kept apart so their decimal text stays
/// canonical, but they share the `Number` tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Null,
    Str(&'a str),
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
}

impl Value<'_> {
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Str(_) => ValueKind::String,
            Self::Bool(_) => ValueKind::Boolean,
            Self::Float(x) if !x.is_finite() => ValueKind::Null,
            Self::Double(x) if !x.is_finite() => ValueKind::Null,
            Self::Int(_) | Self::Float(_) | Self::Double(_) => ValueKind::Number,
        }
    }

    /// JSON form used inside event frames.
    pub fn to_json(&self) -> serde_json::Value {
        match *self {
            Self::Null => serde_json::Value::Null,
            Self::Str(s) => serde_json::Value::from(s),
            Self::Bool(b) => serde_json::Value::Bool(b),
            Self::Int(i) => serde_json::Value::from(i),
            // Non-finite floats have no JSON form and become null.
            Self::Float(f) => serde_json::Value::from(f),
            Self::Double(f) => serde_json::Value::from(f),
        }
    }
}

/// Text form: `true`/`false` for booleans, canonical decimal for numbers,
/// nothing for null. NaN and infinities have no decimal form and render
/// like null.
impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Str(s) => f.write_str(s),
            Self::Bool(true) => f.write_str("true"),
            Self::Bool(false) => f.write_str("false"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.is_finite() => write!(f, "{x}"),
            Self::Double(x) if x.is_finite() => write!(f, "{x}"),
            Self::Float(_) | Self::Double(_) => Ok(()),
        }
    }
}

impl From<()> for Value<'_> {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value<'_> {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<i64> for Value<'_> {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u32> for Value<'_> {
    fn from(i: u32) -> Self {
        Self::Int(i.into())
    }
}

impl From<f32> for Value<'_> {
    fn from(x: f32) -> Self {
        Self::Float(x)
    }
}

impl From<f64> for Value<'_> {
    fn from(x: f64) -> Self {
        Self::Double(x)
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// What the engine sends back for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub code: u16,
    pub body: Body,
    pub kind: ValueKind,
    /// Answer with the index payload instead of `body`.
    pub index: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::nothing()
    }
}

impl Response {
    /// Empty success.
    pub fn nothing() -> Self {
        Self {
            code: 200,
            body: Body::new(),
            kind: ValueKind::Null,
            index: false,
        }
    }

    /// Success carrying a typed result.
    pub fn result<'a>(value: impl Into<Value<'a>>) -> Self {
        let value = value.into();
        let mut body = Body::new();
        let mut out = Clipped {
            body: &mut body,
            full: false,
        };
        // `Clipped` never fails, it only stops copying.
        let _ = write!(out, "{value}");
        if out.full {
            warn!("HOMEY: result truncated to {} bytes", BODY_MAX_LEN);
        }
        Self {
            code: 200,
            body,
            kind: value.kind(),
            index: false,
        }
    }

    /// Error with the default code 500.
    pub fn error(message: &str) -> Self {
        Self::error_with_code(message, 500)
    }

    /// Error with an explicit status code.
    pub fn error_with_code(message: &str, code: u16) -> Self {
        let mut body = Body::new();
        let mut out = Clipped {
            body: &mut body,
            full: false,
        };
        let _ = out.write_str(message);
        if out.full {
            warn!("HOMEY: error message truncated to {} bytes", BODY_MAX_LEN);
        }
        Self {
            code,
            body,
            kind: ValueKind::String,
            index: false,
        }
    }

    /// Ask the engine to answer with the introspection payload.
    pub fn index() -> Self {
        Self {
            index: true,
            ..Self::nothing()
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Body writer that keeps as much as fits, stopping on a char boundary.
struct Clipped<'a> {
    body: &'a mut Body,
    full: bool,
}

impl Write for Clipped<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.full {
            return Ok(());
        }
        for c in s.chars() {
            if self.body.push(c).is_err() {
                self.full = true;
                break;
            }
        }
        Ok(())
    }
}
