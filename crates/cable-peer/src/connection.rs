//! Blocking driver that runs a [`Cable`] over a duplex byte stream.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use cable_encoding::Payload;
use cable_transport::{CableStream, TransportError};
use tracing::{debug, trace};

use crate::cable::Cable;
use crate::config::{CableConfig, ConnectionConfig};
use crate::error::{CableError, Result};
use crate::event::{Event, Responder};

/// A duplex stream whose write side can be closed on its own.
pub trait ByteChannel: Read + Write {
    /// Signal end of output to the peer while still allowing reads.
    fn close_write(&mut self) -> io::Result<()>;
}

impl ByteChannel for CableStream {
    fn close_write(&mut self) -> io::Result<()> {
        self.shutdown_write().map_err(|err| match err {
            TransportError::Io(err) => err,
            other => io::Error::other(other),
        })
    }
}

#[cfg(unix)]
impl ByteChannel for std::os::unix::net::UnixStream {
    fn close_write(&mut self) -> io::Result<()> {
        match self.shutdown(std::net::Shutdown::Write) {
            Err(err) if err.kind() != io::ErrorKind::NotConnected => Err(err),
            _ => Ok(()),
        }
    }
}

/// A cable bound to a stream.
///
/// Outgoing operations write their frames before returning. Inbound
/// traffic is processed by [`pump`](Self::pump), one read at a time.
pub struct Connection<S> {
    cable: Cable,
    stream: S,
    read_buf: Vec<u8>,
    backlog: VecDeque<Event>,
}

impl<S: Read + Write> Connection<S> {
    pub fn new(stream: S, config: CableConfig) -> Self {
        Self::with_config(stream, config, &ConnectionConfig::default())
    }

    /// Build a connection with an explicit driver configuration.
    ///
    /// Timeouts in `connection` are not applied here since `S` is opaque;
    /// [`connect_with_config`](crate::connect_with_config) and
    /// [`CableListener`](crate::CableListener) set them on the socket.
    pub fn with_config(stream: S, config: CableConfig, connection: &ConnectionConfig) -> Self {
        Self {
            cable: Cable::new(config),
            stream,
            read_buf: vec![0; connection.read_chunk_size.max(1)],
            backlog: VecDeque::new(),
        }
    }

    pub fn send(&mut self, payload: impl Into<Payload>) -> Result<()> {
        self.cable.send(payload)?;
        self.flush()
    }

    pub fn call<F>(&mut self, payload: impl Into<Payload>, handler: F) -> Result<u16>
    where
        F: FnOnce(Result<Payload>) + Send + 'static,
    {
        let id = self.cable.call(payload, handler)?;
        self.flush()?;
        Ok(id)
    }

    pub fn ping<F>(&mut self, handler: F) -> Result<u16>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let id = self.cable.ping(handler)?;
        self.flush()?;
        Ok(id)
    }

    pub fn respond(
        &mut self,
        responder: Responder,
        result: std::result::Result<Payload, String>,
    ) -> Result<()> {
        let outcome = self.cable.respond(responder, result);
        // An encode failure still queues RESPONSE_ERR for the peer.
        self.flush()?;
        outcome
    }

    /// Send a call and block until its response arrives.
    ///
    /// Events that arrive while waiting are kept and returned by the next
    /// [`pump`](Self::pump). Requests among them are not answered until the
    /// caller handles them, so two peers both blocked in `request` on each
    /// other's reply will wait forever.
    pub fn request(&mut self, payload: impl Into<Payload>) -> Result<Payload> {
        let (tx, rx) = mpsc::channel();
        self.call(payload, move |result| {
            let _ = tx.send(result);
        })?;
        self.wait_for(&rx)
    }

    /// Ping the peer and block until the pong arrives.
    pub fn ping_blocking(&mut self) -> Result<Duration> {
        let (tx, rx) = mpsc::channel();
        let started = Instant::now();
        self.ping(move |result| {
            let _ = tx.send(result.map(|()| started.elapsed()));
        })?;
        self.wait_for(&rx)
    }

    fn wait_for<T>(&mut self, rx: &mpsc::Receiver<Result<T>>) -> Result<T> {
        loop {
            if let Ok(result) = rx.try_recv() {
                return result;
            }
            self.read_once()?;
            let events: Vec<Event> = self.cable.drain_events().collect();
            self.backlog.extend(events);
        }
    }

    /// Read one chunk from the stream and return the events it produced.
    ///
    /// Replies the engine generates on its own (pongs, rejections) are
    /// written before returning. On end of stream the cable finishes, which
    /// fails every pending call; after that, once queued events have been
    /// handed out, `pump` returns [`CableError::ConnectionClosed`].
    pub fn pump(&mut self) -> Result<Vec<Event>> {
        if self.backlog.is_empty() && !self.cable.is_ended() {
            self.read_once()?;
        }
        let mut events: Vec<Event> = self.backlog.drain(..).collect();
        events.extend(self.cable.drain_events());
        if events.is_empty() && self.cable.is_ended() {
            return Err(CableError::ConnectionClosed);
        }
        Ok(events)
    }

    fn read_once(&mut self) -> Result<()> {
        if self.cable.is_ended() {
            return Err(CableError::ConnectionClosed);
        }
        let read = loop {
            match self.stream.read(&mut self.read_buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        };

        if read == 0 {
            debug!("peer closed the stream");
            self.cable.finish();
            return Ok(());
        }

        let dispatched = self.cable.feed(&self.read_buf[..read]);
        trace!(read, dispatched, "fed chunk");
        self.flush()
    }

    /// Write every queued frame to the stream.
    pub fn flush(&mut self) -> Result<()> {
        let mut wrote = false;
        while let Some(bytes) = self.cable.take_outgoing() {
            self.stream.write_all(&bytes)?;
            wrote = true;
        }
        if wrote {
            self.stream.flush()?;
        }
        Ok(())
    }

    pub fn cable(&self) -> &Cable {
        &self.cable
    }

    pub fn cable_mut(&mut self) -> &mut Cable {
        &mut self.cable
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: ByteChannel> Connection<S> {
    /// Destroy the cable, write what is still queued, and close our side.
    ///
    /// Pending calls fail with [`CableError::ConnectionClosed`]. The
    /// [`Event::Close`] notification is returned by the next `pump`.
    pub fn close(&mut self) -> Result<()> {
        self.cable.destroy();
        self.flush()?;
        self.stream.close_write()?;
        debug!("connection closed");
        Ok(())
    }
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("cable", &self.cable)
            .field("backlog", &self.backlog.len())
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixStream;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use bytes::Bytes;
    use cable_encoding::Encoding;
    use serde_json::json;

    use super::*;

    fn pair(encoding: Encoding) -> (Connection<UnixStream>, Connection<UnixStream>) {
        let (left, right) = UnixStream::pair().expect("socketpair should be creatable");
        let config = CableConfig::with_encoding(encoding);
        (Connection::new(left, config), Connection::new(right, config))
    }

    /// Answer requests by echoing their payload until the peer hangs up.
    fn serve_echo(mut server: Connection<UnixStream>) -> thread::JoinHandle<usize> {
        thread::spawn(move || {
            let mut handled = 0;
            while let Ok(events) = server.pump() {
                for event in events {
                    match event {
                        Event::Request(payload, responder) => {
                            server
                                .respond(responder, Ok(payload))
                                .expect("response should be written");
                            handled += 1;
                        }
                        Event::Message(payload) => {
                            server.send(payload).expect("echo should be written");
                            handled += 1;
                        }
                        Event::Ping | Event::Close => {}
                    }
                }
            }
            handled
        })
    }

    #[test]
    fn request_round_trip_over_socketpair() {
        let (mut client, server) = pair(Encoding::Json);
        let server = serve_echo(server);

        let reply = client
            .request(json!({"hello": "world"}))
            .expect("request should succeed");
        assert_eq!(reply, Payload::Json(json!({"hello": "world"})));

        let latency = client.ping_blocking().expect("ping should succeed");
        assert!(latency < Duration::from_secs(5));

        client.close().expect("close should succeed");
        assert_eq!(server.join().expect("server thread should finish"), 1);
    }

    #[test]
    fn many_outstanding_calls_resolve() {
        let (mut client, server) = pair(Encoding::Raw);
        let server = serve_echo(server);

        let results = Arc::new(Mutex::new(Vec::new()));
        for n in 0..100u8 {
            let results = Arc::clone(&results);
            client
                .call(Bytes::from(vec![n]), move |result| {
                    results.lock().unwrap().push(result.unwrap());
                })
                .expect("call should be written");
        }
        while client.cable().pending_calls() > 0 {
            client.pump().expect("pump should succeed");
        }

        let mut seen: Vec<u8> = results
            .lock()
            .unwrap()
            .iter()
            .map(|payload| payload.as_bytes().expect("raw payload")[0])
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<u8>>());

        client.close().expect("close should succeed");
        server.join().expect("server thread should finish");
    }

    #[test]
    fn messages_received_while_waiting_are_kept() {
        let (mut client, mut server) = pair(Encoding::Utf8);

        let server = thread::spawn(move || {
            let events = loop {
                let events = server.pump().expect("server pump should succeed");
                if !events.is_empty() {
                    break events;
                }
            };
            let Some(Event::Request(_, responder)) = events.into_iter().next() else {
                panic!("expected request");
            };
            server.send("interleaved").expect("message should be written");
            server
                .respond(responder, Ok("done".into()))
                .expect("response should be written");
            server
        });

        assert_eq!(
            client.request("go").expect("request should succeed"),
            Payload::Text("done".to_string())
        );
        let events = client.pump().expect("backlog should be returned");
        assert!(matches!(&events[..], [Event::Message(Payload::Text(t))] if t == "interleaved"));

        drop(server.join().expect("server thread should finish"));
    }

    #[test]
    fn requests_received_while_waiting_are_answered_later() {
        let (mut client, mut server) = pair(Encoding::Utf8);

        let server = thread::spawn(move || {
            let events = loop {
                let events = server.pump().expect("server pump should succeed");
                if !events.is_empty() {
                    break events;
                }
            };
            let Some(Event::Request(_, responder)) = events.into_iter().next() else {
                panic!("expected request");
            };
            let (tx, rx) = mpsc::channel();
            server
                .call("who?", move |result| {
                    let _ = tx.send(result);
                })
                .expect("call should be written");
            server
                .respond(responder, Ok("done".into()))
                .expect("response should be written");
            loop {
                if let Ok(result) = rx.try_recv() {
                    break result;
                }
                server.pump().expect("server pump should succeed");
            }
        });

        assert_eq!(
            client.request("go").expect("request should succeed"),
            Payload::Text("done".to_string())
        );
        assert_eq!(client.cable().pending_calls(), 0);

        let events = client.pump().expect("backlog should be returned");
        let Some(Event::Request(Payload::Text(question), responder)) = events.into_iter().next()
        else {
            panic!("expected the server's request in the backlog");
        };
        assert_eq!(question, "who?");
        client
            .respond(responder, Ok("client".into()))
            .expect("response should be written");

        let answer = server.join().expect("server thread should finish");
        assert_eq!(
            answer.expect("server call should succeed"),
            Payload::Text("client".to_string())
        );
    }

    #[test]
    fn eof_fails_pending_calls_then_reports_closed() {
        let (mut client, server) = pair(Encoding::Raw);
        let outcome = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&outcome);
        // Queue without writing so the peer closes with nothing unread.
        client
            .cable_mut()
            .call(Bytes::from_static(b"never answered"), move |result| {
                *slot.lock().unwrap() = Some(result.map(|_| ()));
            })
            .expect("call should be queued");
        drop(server);

        let events = client.pump().expect("eof is not an error");
        assert!(events.is_empty());
        assert!(client.cable().is_ended());
        assert!(matches!(
            outcome.lock().unwrap().take(),
            Some(Err(CableError::ConnectionClosed))
        ));
        assert!(matches!(client.pump(), Err(CableError::ConnectionClosed)));
        assert!(matches!(
            client.request(Bytes::new()),
            Err(CableError::ConnectionClosed)
        ));
    }

    #[test]
    fn close_emits_close_event_and_half_closes() {
        let (mut client, mut server) = pair(Encoding::Raw);
        client.send(Bytes::from_static(b"last")).expect("send should succeed");
        client.close().expect("close should succeed");

        let events = client.pump().expect("close event should be queued");
        assert!(matches!(&events[..], [Event::Close]));
        assert!(matches!(client.pump(), Err(CableError::ConnectionClosed)));

        let mut received = Vec::new();
        loop {
            match server.pump() {
                Ok(events) => received.extend(events),
                Err(CableError::ConnectionClosed) => break,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }
        assert!(matches!(&received[..], [Event::Message(_)]));
    }

    #[test]
    fn read_timeout_surfaces_as_io_error() {
        let (left, _right) = UnixStream::pair().expect("socketpair should be creatable");
        left.set_read_timeout(Some(Duration::from_millis(20)))
            .expect("timeout should apply");
        let mut conn = Connection::new(left, CableConfig::default());

        let err = conn.pump().expect_err("read should time out");
        assert!(err.is_timeout());
        assert!(!conn.cable().is_ended());
    }
}
