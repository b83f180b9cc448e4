//! Duplex byte channels for cable peers.
//!
//! The protocol engine only needs an ordered, reliable byte stream. This
//! crate supplies one over Unix domain sockets: bind/accept on a filesystem
//! path, connect to it, and a [`CableStream`] that is `Read + Write` and can
//! half-close its write side.

pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::CableStream;

#[cfg(unix)]
pub use uds::UnixSocketListener;
