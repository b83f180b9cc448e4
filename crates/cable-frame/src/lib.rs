//! Wire framing for the cable protocol.
//!
//! Every frame is a 7-byte header followed by the payload:
//! - 1 byte frame type (message, request, response ok/err, ping)
//! - 2 byte little-endian call id
//! - 4 byte little-endian payload length
//!
//! [`FrameParser`] reassembles frames from arbitrarily chunked input and
//! never yields a partial header or payload.

pub mod error;
pub mod frame;
pub mod parser;

#[cfg(feature = "async")]
pub mod codec;

pub use error::{FrameError, Result};
pub use frame::{
    decode_header, encode_frame, encode_header, Frame, FrameType, Header, HEADER_SIZE,
};
pub use parser::FrameParser;

#[cfg(feature = "async")]
pub use codec::CableCodec;
