//! `tokio_util::codec` adapter over the same two-phase parser.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FrameError;
use crate::frame::{encode_frame, Frame};
use crate::parser::{ParseState, INITIAL_BUFFER_CAPACITY};

/// Frame codec for use with `FramedRead` / `FramedWrite`.
///
/// Decoding keeps the parse phase between calls, so a header consumed
/// from one read is not re-parsed on the next.
#[derive(Debug, Default)]
pub struct CableCodec {
    state: ParseState,
}

impl CableCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for CableCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        let frame = self.state.step(src)?;
        if frame.is_none() {
            // The declared length comes from the peer; grow as bytes arrive.
            let missing = self.state.expected().saturating_sub(src.len());
            src.reserve(missing.min(INITIAL_BUFFER_CAPACITY));
        }
        Ok(frame)
    }
}

impl Encoder<Frame> for CableCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(frame.frame_type, frame.id, &frame.payload, dst)
    }
}
