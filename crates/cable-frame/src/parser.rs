//! Streaming frame reassembly.
//!
//! The parser alternates between two phases:
//! - header: wait for 7 bytes, parse type/id/length
//! - body: wait for `length` bytes, emit the frame
//!
//! A zero-length payload skips the body phase. Phase and parsed header
//! survive across calls, so input may be split at any byte boundary.

use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::frame::{decode_header, Frame, FrameType, Header, HEADER_SIZE};

pub(crate) const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ParseState {
    #[default]
    Header,
    Body(Header),
}

impl ParseState {
    /// Bytes required to finish the current phase.
    pub(crate) fn expected(&self) -> usize {
        match self {
            ParseState::Header => HEADER_SIZE,
            ParseState::Body(header) => header.length as usize,
        }
    }

    /// Advance over `src` by at most one frame.
    ///
    /// Consumes bytes only when a phase completes; otherwise `src` is left
    /// untouched and `Ok(None)` is returned.
    pub(crate) fn step(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            match *self {
                ParseState::Header => {
                    let Some(raw) = src.get(..HEADER_SIZE) else {
                        return Ok(None);
                    };
                    let mut bytes = [0u8; HEADER_SIZE];
                    bytes.copy_from_slice(raw);
                    src.advance(HEADER_SIZE);

                    let header = decode_header(&bytes);
                    trace!(
                        type_byte = header.type_byte,
                        id = header.id,
                        length = header.length,
                        "parsed frame header"
                    );
                    if header.length == 0 {
                        return complete(header, Bytes::new());
                    }
                    *self = ParseState::Body(header);
                }
                ParseState::Body(header) => {
                    let length = header.length as usize;
                    if src.len() < length {
                        return Ok(None);
                    }
                    let payload = src.split_to(length).freeze();
                    *self = ParseState::Header;
                    return complete(header, payload);
                }
            }
        }
    }
}

fn complete(header: Header, payload: Bytes) -> Result<Option<Frame>> {
    match FrameType::try_from(header.type_byte) {
        Ok(frame_type) => Ok(Some(Frame {
            frame_type,
            id: header.id,
            payload,
        })),
        Err(type_byte) => Err(FrameError::UnknownType {
            type_byte,
            id: header.id,
            length: header.length,
        }),
    }
}

/// Reassembles frames from an arbitrarily chunked byte stream.
///
/// ```
/// use cable_frame::{encode_frame, FrameParser, FrameType};
/// use bytes::BytesMut;
///
/// let mut wire = BytesMut::new();
/// encode_frame(FrameType::Message, 0, b"hello", &mut wire).unwrap();
///
/// let mut parser = FrameParser::new();
/// parser.extend(&wire[..4]);
/// assert!(parser.next_frame().unwrap().is_none());
///
/// parser.extend(&wire[4..]);
/// let frame = parser.next_frame().unwrap().unwrap();
/// assert_eq!(frame.payload.as_ref(), b"hello");
/// ```
#[derive(Debug)]
pub struct FrameParser {
    buf: BytesMut,
    state: ParseState,
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            state: ParseState::Header,
        }
    }

    /// Append incoming bytes to the reassembly buffer.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Extract the next complete frame, if the buffer holds one.
    ///
    /// An [`FrameError::UnknownType`] error consumes the offending frame;
    /// calling again continues with whatever follows it.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.state.step(&mut self.buf)
    }

    /// Append `chunk` and collect every frame it completes.
    ///
    /// Frames with unknown type bytes are skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.extend(chunk);
        let mut frames = Vec::new();
        loop {
            match self.next_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => return frames,
                Err(err) => tracing::warn!(error = %err, "skipping frame"),
            }
        }
    }

    /// Bytes the current phase needs in total (7 in the header phase).
    pub fn expected(&self) -> usize {
        self.state.expected()
    }

    /// Bytes buffered but not yet part of an emitted frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// True while waiting for a payload whose header has been parsed.
    pub fn in_body(&self) -> bool {
        matches!(self.state, ParseState::Body(_))
    }

    /// True when no partial frame is pending.
    pub fn is_idle(&self) -> bool {
        !self.in_body() && self.buf.is_empty()
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}
