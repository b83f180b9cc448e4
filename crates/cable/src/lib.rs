//! Multiplexed messages, calls and pings over a single byte stream.
//!
//! A cable carries three kinds of traffic on one ordered duplex channel:
//! fire-and-forget messages, request/response calls correlated by a 16-bit
//! id, and pings. Payloads are transcoded with one of four encodings chosen
//! when the cable is built.
//!
//! # Crate Structure
//!
//! - [`transport`]: Unix domain socket byte channels
//! - [`frame`]: 7-byte header wire format and the streaming parser
//! - [`encoding`]: Payload transcoders (raw, utf8, json, mixed)
//! - [`peer`]: The protocol engine and connection drivers (behind `peer` feature)

/// Re-export transport types.
pub mod transport {
    pub use cable_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use cable_frame::*;
}

/// Re-export encoding types.
pub mod encoding {
    pub use cable_encoding::*;
}

/// Re-export engine and driver types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use cable_peer::*;
}

#[cfg(feature = "peer")]
pub use cable_peer::{Cable, CableConfig, CableError, Connection, Event};
pub use cable_encoding::{Encoding, Payload};
