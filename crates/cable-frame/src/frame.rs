use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: type (1) + id (2) + length (4) = 7 bytes.
pub const HEADER_SIZE: usize = 7;

/// The kind of traffic a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// Fire-and-forget message. The id is conventionally 0.
    Message = 0,
    /// Call expecting a response with the same id.
    Request = 1,
    /// Successful response to a request or ping.
    ResponseOk = 2,
    /// Failed response; the payload is the error text.
    ResponseErr = 3,
    /// Keepalive. Answered with an empty `ResponseOk`.
    Ping = 4,
}

impl FrameType {
    /// Whether frames of this type resolve a pending call on receipt.
    pub fn is_response(self) -> bool {
        matches!(self, FrameType::ResponseOk | FrameType::ResponseErr)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameType::Message => "MESSAGE",
            FrameType::Request => "REQUEST",
            FrameType::ResponseOk => "RESPONSE_OK",
            FrameType::ResponseErr => "RESPONSE_ERR",
            FrameType::Ping => "PING",
        }
    }
}

impl TryFrom<u8> for FrameType {
    type Error = u8;

    fn try_from(byte: u8) -> std::result::Result<Self, u8> {
        match byte {
            0 => Ok(FrameType::Message),
            1 => Ok(FrameType::Request),
            2 => Ok(FrameType::ResponseOk),
            3 => Ok(FrameType::ResponseErr),
            4 => Ok(FrameType::Ping),
            other => Err(other),
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded frame header. The type byte is kept raw so that unknown types
/// can still be skipped by length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub type_byte: u8,
    pub id: u16,
    pub length: u32,
}

impl Header {
    pub fn frame_type(&self) -> std::result::Result<FrameType, u8> {
        FrameType::try_from(self.type_byte)
    }
}

/// One complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    pub id: u16,
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(frame_type: FrameType, id: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            id,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Build the 7-byte header for a frame.
///
/// ```text
/// ┌──────────┬───────────┬──────────────┬─────────────────┐
/// │ Type (1B)│ Id (2B LE)│ Length (4B LE)│ Payload          │
/// └──────────┴───────────┴──────────────┴─────────────────┘
/// ```
pub fn encode_header(frame_type: FrameType, id: u16, length: u32) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[0] = frame_type as u8;
    header[1..3].copy_from_slice(&id.to_le_bytes());
    header[3..7].copy_from_slice(&length.to_le_bytes());
    header
}

/// Parse a header from exactly [`HEADER_SIZE`] bytes.
pub fn decode_header(bytes: &[u8; HEADER_SIZE]) -> Header {
    Header {
        type_byte: bytes[0],
        id: u16::from_le_bytes([bytes[1], bytes[2]]),
        length: u32::from_le_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]),
    }
}

/// Append one frame (header, then payload) to `dst`.
pub fn encode_frame(frame_type: FrameType, id: u16, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let length = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&encode_header(frame_type, id, length));
    dst.put_slice(payload);
    Ok(())
}
