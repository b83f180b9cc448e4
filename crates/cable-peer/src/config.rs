use std::time::Duration;

use cable_encoding::Encoding;

/// Engine configuration, fixed at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CableConfig {
    /// Payload encoding for every frame on this connection.
    pub encoding: Encoding,
}

impl CableConfig {
    pub fn with_encoding(encoding: Encoding) -> Self {
        Self { encoding }
    }
}

/// Stream-driver configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Size of each read from the byte channel. Default: 8 KiB.
    pub read_chunk_size: usize,
    /// Read timeout applied to socket streams.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to socket streams.
    pub write_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 8 * 1024,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
