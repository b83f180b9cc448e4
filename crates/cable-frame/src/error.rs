/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header carried a type byte outside the known set.
    ///
    /// The frame's payload has already been consumed, so the stream stays
    /// aligned and parsing can continue with the next frame.
    #[error("unknown frame type {type_byte} (id {id}, {length} payload bytes skipped)")]
    UnknownType { type_byte: u8, id: u16, length: u32 },

    /// The payload does not fit the 32-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
