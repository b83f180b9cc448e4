//! Tokio driver for a [`Cable`].
//!
//! Same surface as [`Connection`](crate::Connection) with `async fn`s. The
//! engine itself stays synchronous; only stream reads and writes await.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use cable_encoding::Payload;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::cable::Cable;
use crate::config::{CableConfig, ConnectionConfig};
use crate::error::{CableError, Result};
use crate::event::{Event, Responder};

pub struct AsyncConnection<S> {
    cable: Cable,
    stream: S,
    read_buf: Vec<u8>,
    backlog: VecDeque<Event>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncConnection<S> {
    pub fn new(stream: S, config: CableConfig) -> Self {
        Self::with_config(stream, config, &ConnectionConfig::default())
    }

    pub fn with_config(stream: S, config: CableConfig, connection: &ConnectionConfig) -> Self {
        Self {
            cable: Cable::new(config),
            stream,
            read_buf: vec![0; connection.read_chunk_size.max(1)],
            backlog: VecDeque::new(),
        }
    }

    pub async fn send(&mut self, payload: impl Into<Payload>) -> Result<()> {
        self.cable.send(payload)?;
        self.flush().await
    }

    pub async fn call<F>(&mut self, payload: impl Into<Payload>, handler: F) -> Result<u16>
    where
        F: FnOnce(Result<Payload>) + Send + 'static,
    {
        let id = self.cable.call(payload, handler)?;
        self.flush().await?;
        Ok(id)
    }

    pub async fn ping<F>(&mut self, handler: F) -> Result<u16>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let id = self.cable.ping(handler)?;
        self.flush().await?;
        Ok(id)
    }

    pub async fn respond(
        &mut self,
        responder: Responder,
        result: std::result::Result<Payload, String>,
    ) -> Result<()> {
        let outcome = self.cable.respond(responder, result);
        self.flush().await?;
        outcome
    }

    /// Send a call and wait for its response.
    ///
    /// Inbound requests that arrive meanwhile wait in the backlog for the
    /// next [`pump`](Self::pump); they are not answered while waiting.
    pub async fn request(&mut self, payload: impl Into<Payload>) -> Result<Payload> {
        let (tx, rx) = oneshot::channel();
        self.call(payload, move |result| {
            let _ = tx.send(result);
        })
        .await?;
        self.wait_for(rx).await
    }

    /// Ping the peer and wait for the pong.
    pub async fn ping_wait(&mut self) -> Result<Duration> {
        let (tx, rx) = oneshot::channel();
        let started = Instant::now();
        self.ping(move |result| {
            let _ = tx.send(result.map(|()| started.elapsed()));
        })
        .await?;
        self.wait_for(rx).await
    }

    async fn wait_for<T>(&mut self, mut rx: oneshot::Receiver<Result<T>>) -> Result<T> {
        loop {
            match rx.try_recv() {
                Ok(result) => return result,
                Err(oneshot::error::TryRecvError::Closed) => {
                    return Err(CableError::ConnectionClosed)
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
            }
            self.read_once().await?;
            let events: Vec<Event> = self.cable.drain_events().collect();
            self.backlog.extend(events);
        }
    }

    /// Read one chunk and return the events it produced.
    ///
    /// Behaves like [`Connection::pump`](crate::Connection::pump): end of
    /// stream finishes the cable and later calls return
    /// [`CableError::ConnectionClosed`].
    pub async fn pump(&mut self) -> Result<Vec<Event>> {
        if self.backlog.is_empty() && !self.cable.is_ended() {
            self.read_once().await?;
        }
        let mut events: Vec<Event> = self.backlog.drain(..).collect();
        events.extend(self.cable.drain_events());
        if events.is_empty() && self.cable.is_ended() {
            return Err(CableError::ConnectionClosed);
        }
        Ok(events)
    }

    async fn read_once(&mut self) -> Result<()> {
        if self.cable.is_ended() {
            return Err(CableError::ConnectionClosed);
        }
        let read = self.stream.read(&mut self.read_buf).await?;
        if read == 0 {
            debug!("peer closed the stream");
            self.cable.finish();
            return Ok(());
        }
        let dispatched = self.cable.feed(&self.read_buf[..read]);
        trace!(read, dispatched, "fed chunk");
        self.flush().await
    }

    pub async fn flush(&mut self) -> Result<()> {
        let mut wrote = false;
        while let Some(bytes) = self.cable.take_outgoing() {
            self.stream.write_all(&bytes).await?;
            wrote = true;
        }
        if wrote {
            self.stream.flush().await?;
        }
        Ok(())
    }

    /// Destroy the cable, write what is queued, and shut down our write side.
    pub async fn close(&mut self) -> Result<()> {
        self.cable.destroy();
        self.flush().await?;
        match self.stream.shutdown().await {
            Err(err) if err.kind() != std::io::ErrorKind::NotConnected => return Err(err.into()),
            _ => {}
        }
        debug!("connection closed");
        Ok(())
    }

    pub fn cable(&self) -> &Cable {
        &self.cable
    }

    pub fn cable_mut(&mut self) -> &mut Cable {
        &mut self.cable
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Connect to a listening peer from a tokio runtime.
#[cfg(unix)]
pub async fn connect_async(
    path: impl AsRef<std::path::Path>,
    config: CableConfig,
) -> Result<AsyncConnection<tokio::net::UnixStream>> {
    let path = path.as_ref();
    let stream = tokio::net::UnixStream::connect(path).await.map_err(|source| {
        cable_transport::TransportError::Connect {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(AsyncConnection::new(stream, config))
}
