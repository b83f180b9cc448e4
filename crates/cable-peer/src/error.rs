use cable_encoding::{DecodeError, EncodeError};
use cable_frame::FrameError;
use cable_transport::TransportError;

/// Errors surfaced by the cable engine and its connection drivers.
///
/// Call failures (`Remote`, `ConnectionClosed`, `Decode`) reach the
/// caller through the same response handler that would have received the
/// success value.
#[derive(Debug, thiserror::Error)]
pub enum CableError {
    /// All 65536 call ids are in use.
    #[error("stack overflow: all 65536 call ids are in use")]
    CapacityExceeded,

    /// The peer answered with a RESPONSE_ERR frame.
    #[error("{0}")]
    Remote(String),

    /// The connection finished while the call was pending, or a call was
    /// attempted after it finished.
    #[error("cable was destroyed")]
    ConnectionClosed,

    /// A response payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An outgoing value could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Transport setup error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// I/O error on the byte channel.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CableError {
    /// True for read/write timeouts on the underlying stream.
    pub fn is_timeout(&self) -> bool {
        let io = match self {
            CableError::Io(err) => err,
            CableError::Transport(err) => match err.io_source() {
                Some(err) => err,
                None => return false,
            },
            _ => return false,
        };
        matches!(
            io.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        )
    }
}

pub type Result<T> = std::result::Result<T, CableError>;
