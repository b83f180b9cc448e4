use std::path::Path;

use cable_transport::{CableStream, UnixSocketListener};
use tracing::debug;

use crate::config::{CableConfig, ConnectionConfig};
use crate::connection::Connection;
use crate::connector::apply_timeouts;
use crate::error::Result;

/// Accepts cable connections on a Unix domain socket.
pub struct CableListener {
    socket: UnixSocketListener,
    cable_config: CableConfig,
    connection_config: ConnectionConfig,
}

impl CableListener {
    /// Bind to a Unix domain socket path.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let socket = UnixSocketListener::bind(path)?;
        Ok(Self {
            socket,
            cable_config: CableConfig::default(),
            connection_config: ConnectionConfig::default(),
        })
    }

    /// Engine settings for accepted connections.
    pub fn with_cable_config(mut self, config: CableConfig) -> Self {
        self.cable_config = config;
        self
    }

    /// Driver settings (chunk size, timeouts) for accepted connections.
    pub fn with_connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection_config = config;
        self
    }

    /// Block until the next client connects.
    pub fn accept(&self) -> Result<Connection<CableStream>> {
        let stream = self.socket.accept()?;
        apply_timeouts(&stream, &self.connection_config)?;
        debug!(encoding = %self.cable_config.encoding, "accepted cable connection");
        Ok(Connection::with_config(
            stream,
            self.cable_config,
            &self.connection_config,
        ))
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        self.socket.path()
    }
}
