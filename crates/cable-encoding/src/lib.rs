//! Payload encodings for cable frames.
//!
//! An [`Encoding`] is chosen once per connection and converts application
//! [`Payload`] values to and from frame payload bytes:
//!
//! - `raw`: bytes pass through unchanged (default)
//! - `utf8`: payloads decode as text
//! - `json`: payloads are JSON documents; malformed input decodes as `null`
//! - `mixed`: a JSON header plus an opaque body in one payload
//!
//! Byte payloads are never re-encoded except under `mixed`, where they
//! become the body.

pub mod encoding;
pub mod error;
pub mod mixed;
pub mod payload;

pub use encoding::Encoding;
pub use error::{DecodeError, EncodeError, ParseEncodingError};
pub use mixed::MIXED_PREFIX_SIZE;
pub use payload::{Mixed, Payload};
