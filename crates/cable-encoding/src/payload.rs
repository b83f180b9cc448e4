use bytes::Bytes;
use serde_json::Value;

/// A JSON header travelling with an opaque body.
#[derive(Debug, Clone, PartialEq)]
pub struct Mixed {
    pub header: Value,
    pub body: Bytes,
}

impl Mixed {
    pub fn new(header: Value, body: impl Into<Bytes>) -> Self {
        Self {
            header,
            body: body.into(),
        }
    }

    /// A mixed value with only a header.
    pub fn header_only(header: Value) -> Self {
        Self::new(header, Bytes::new())
    }
}

impl Default for Mixed {
    fn default() -> Self {
        Self::header_only(Value::Object(serde_json::Map::new()))
    }
}

/// An application-level value carried by a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No value. Decoding an empty `json` payload yields this.
    Empty,
    /// Raw bytes.
    Bytes(Bytes),
    /// UTF-8 text.
    Text(String),
    /// A JSON document.
    Json(Value),
    /// Header plus body, for the `mixed` encoding.
    Mixed(Mixed),
}

impl Payload {
    /// Short name of the variant, used in errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Empty => "empty",
            Payload::Bytes(_) => "bytes",
            Payload::Text(_) => "text",
            Payload::Json(_) => "json",
            Payload::Mixed(_) => "mixed",
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Empty => true,
            Payload::Bytes(bytes) => bytes.is_empty(),
            Payload::Text(text) => text.is_empty(),
            Payload::Json(_) | Payload::Mixed(_) => false,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Payload::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_mixed(&self) -> Option<&Mixed> {
        match self {
            Payload::Mixed(mixed) => Some(mixed),
            _ => None,
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(bytes: &'static [u8]) -> Self {
        Payload::Bytes(Bytes::from_static(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<Mixed> for Payload {
    fn from(mixed: Mixed) -> Self {
        Payload::Mixed(mixed)
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Empty
    }
}
