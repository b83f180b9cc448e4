use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{DecodeError, EncodeError, ParseEncodingError};
use crate::mixed;
use crate::payload::{Mixed, Payload};

/// Payload encoding, fixed for the lifetime of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Bytes pass through unchanged.
    #[default]
    Raw,
    /// Payloads decode as UTF-8 text.
    Utf8,
    /// Payloads are JSON documents.
    Json,
    /// JSON header plus opaque body.
    Mixed,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Raw => "raw",
            Encoding::Utf8 => "utf8",
            Encoding::Json => "json",
            Encoding::Mixed => "mixed",
        }
    }

    /// Convert a value into payload bytes.
    pub fn encode(self, payload: &Payload) -> Result<Bytes, EncodeError> {
        match (self, payload) {
            (Encoding::Mixed, Payload::Mixed(value)) => mixed::encode(value),
            (Encoding::Mixed, Payload::Json(header)) => {
                mixed::encode(&Mixed::header_only(header.clone()))
            }
            (Encoding::Mixed, Payload::Bytes(body)) => mixed::encode(&Mixed {
                body: body.clone(),
                ..Mixed::default()
            }),
            (Encoding::Mixed, Payload::Text(text)) => mixed::encode(&Mixed {
                body: Bytes::copy_from_slice(text.as_bytes()),
                ..Mixed::default()
            }),
            (Encoding::Mixed, Payload::Empty) => mixed::encode(&Mixed::default()),

            (_, Payload::Bytes(bytes)) => Ok(bytes.clone()),

            (Encoding::Json, Payload::Empty) => Ok(Bytes::from_static(b"null")),
            (Encoding::Json, Payload::Text(text)) => Ok(serde_json::to_vec(text)?.into()),
            (Encoding::Json, Payload::Json(value)) => Ok(serde_json::to_vec(value)?.into()),

            (_, Payload::Empty) => Ok(Bytes::new()),
            (_, Payload::Text(text)) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            (_, Payload::Json(value)) => json_to_raw(value).ok_or(EncodeError::Unsupported {
                kind: payload.kind(),
                encoding: self,
            }),
            (_, Payload::Mixed(_)) => Err(EncodeError::Unsupported {
                kind: payload.kind(),
                encoding: self,
            }),
        }
    }

    /// Convert payload bytes back into a value.
    ///
    /// Only `mixed` can fail. `json` yields [`Payload::Empty`] for an empty
    /// payload and `null` for one that does not parse.
    pub fn decode(self, bytes: Bytes) -> Result<Payload, DecodeError> {
        match self {
            Encoding::Raw => Ok(Payload::Bytes(bytes)),
            Encoding::Utf8 => Ok(Payload::Text(String::from_utf8_lossy(&bytes).into_owned())),
            Encoding::Json => {
                if bytes.is_empty() {
                    return Ok(Payload::Empty);
                }
                match serde_json::from_slice(&bytes) {
                    Ok(value) => Ok(Payload::Json(value)),
                    Err(err) => {
                        debug!(error = %err, len = bytes.len(), "json payload did not parse; using null");
                        Ok(Payload::Json(Value::Null))
                    }
                }
            }
            Encoding::Mixed => mixed::decode(bytes).map(Payload::Mixed),
        }
    }
}

/// Byte form of a JSON value for the byte-oriented encodings: strings as
/// their UTF-8, arrays of octets as those octets, `null` as nothing.
fn json_to_raw(value: &Value) -> Option<Bytes> {
    match value {
        Value::Null => Some(Bytes::new()),
        Value::String(text) => Some(Bytes::copy_from_slice(text.as_bytes())),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
            .collect::<Option<Vec<u8>>>()
            .map(Bytes::from),
        _ => None,
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = ParseEncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "none" | "binary" => Ok(Encoding::Raw),
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "json" => Ok(Encoding::Json),
            "mixed" => Ok(Encoding::Mixed),
            _ => Err(ParseEncodingError(s.to_string())),
        }
    }
}
