use std::path::Path;

use cable_transport::CableStream;

use crate::config::{CableConfig, ConnectionConfig};
use crate::connection::Connection;
use crate::error::Result;

/// Connect to a listening cable peer.
pub fn connect(path: impl AsRef<Path>, config: CableConfig) -> Result<Connection<CableStream>> {
    connect_with_config(path, config, &ConnectionConfig::default())
}

/// Connect with explicit driver configuration.
pub fn connect_with_config(
    path: impl AsRef<Path>,
    config: CableConfig,
    connection: &ConnectionConfig,
) -> Result<Connection<CableStream>> {
    #[cfg(not(unix))]
    {
        let _ = (config, connection);
        return Err(cable_transport::TransportError::Connect {
            path: path.as_ref().to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "cable connections require Unix domain sockets",
            ),
        }
        .into());
    }

    #[cfg(unix)]
    {
        let stream = cable_transport::UnixSocketListener::connect(path)?;
        apply_timeouts(&stream, connection)?;
        Ok(Connection::with_config(stream, config, connection))
    }
}

pub(crate) fn apply_timeouts(stream: &CableStream, connection: &ConnectionConfig) -> Result<()> {
    stream.set_read_timeout(connection.read_timeout)?;
    stream.set_write_timeout(connection.write_timeout)?;
    Ok(())
}
