//! Call correlation, dispatch and connection drivers for cable peers.
//!
//! [`Cable`] is the protocol engine: it turns outgoing messages, calls and
//! pings into frames, matches responses back to their callers by id, and
//! surfaces inbound traffic as [`Event`]s. It performs no I/O. The drivers
//! ([`Connection`], and [`AsyncConnection`] with the `async` feature) pump
//! bytes between an engine and a duplex stream.

#[cfg(feature = "async")]
pub mod async_connection;
pub mod cable;
pub mod config;
pub mod connection;
pub mod connector;
pub mod correlator;
pub mod error;
pub mod event;
#[cfg(unix)]
pub mod listener;

#[cfg(all(feature = "async", unix))]
pub use async_connection::connect_async;
#[cfg(feature = "async")]
pub use async_connection::AsyncConnection;
pub use cable::{Cable, PongHandler, ResponseHandler};
pub use config::{CableConfig, ConnectionConfig};
pub use connection::{ByteChannel, Connection};
pub use connector::{connect, connect_with_config};
pub use correlator::{CallTable, MAX_CALLS};
pub use error::{CableError, Result};
pub use event::{Event, Responder};
#[cfg(unix)]
pub use listener::CableListener;
