use crate::encoding::Encoding;

/// A value could not be turned into payload bytes.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The configured encoding has no byte form for this kind of value.
    #[error("{kind} payload cannot be encoded as {encoding}")]
    Unsupported {
        kind: &'static str,
        encoding: Encoding,
    },

    /// JSON serialization failed.
    #[error("json encode error: {0}")]
    Json(#[from] serde_json::Error),

    /// A mixed header or body exceeds the 32-bit length prefix.
    #[error("mixed {section} too large ({size} bytes)")]
    SectionTooLarge { section: &'static str, size: usize },
}

/// Payload bytes could not be turned back into a value.
///
/// Only the `mixed` encoding can fail; `json` maps bad input to `null`.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload is shorter than its length prefixes claim.
    #[error("mixed payload truncated (need {needed} bytes, have {available})")]
    Truncated { needed: usize, available: usize },

    /// The mixed header section is not valid JSON.
    #[error("mixed header is not valid JSON: {0}")]
    Header(#[source] serde_json::Error),
}

/// An encoding name was not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown encoding '{0}' (expected raw, utf8, json or mixed)")]
pub struct ParseEncodingError(pub String);
