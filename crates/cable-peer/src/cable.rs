//! The protocol engine.
//!
//! A [`Cable`] owns the frame parser, the pending-call table and the
//! outgoing byte queue. It does no I/O: callers feed it bytes read from the
//! transport and drain the bytes it wants written. Everything runs
//! synchronously inside `feed`, `send`, `call`, `ping`, `respond`,
//! `finish` and `destroy`.

use std::collections::vec_deque::Drain;
use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use cable_encoding::{Encoding, Payload};
use cable_frame::{encode_frame, Frame, FrameParser, FrameType};
use tracing::{debug, trace, warn};

use crate::config::CableConfig;
use crate::correlator::CallTable;
use crate::error::{CableError, Result};
use crate::event::{Event, Responder};

/// Handler invoked once with the outcome of a call.
pub type ResponseHandler = Box<dyn FnOnce(Result<Payload>) + Send + 'static>;

/// Handler invoked once when a ping is answered.
pub type PongHandler = Box<dyn FnOnce(Result<()>) + Send + 'static>;

const UNKNOWN_ERROR: &str = "unknown error";

enum Pending {
    Call(ResponseHandler),
    Ping(PongHandler),
}

impl Pending {
    fn fail(self, err: CableError) {
        match self {
            Pending::Call(handler) => handler(Err(err)),
            Pending::Ping(handler) => handler(Err(err)),
        }
    }
}

/// Multiplexed message / call / ping engine over one byte stream.
pub struct Cable {
    encoding: Encoding,
    parser: FrameParser,
    calls: CallTable<Pending>,
    outgoing: BytesMut,
    events: VecDeque<Event>,
    ended: bool,
    destroyed: bool,
}

impl Cable {
    pub fn new(config: CableConfig) -> Self {
        Self {
            encoding: config.encoding,
            parser: FrameParser::new(),
            calls: CallTable::new(),
            outgoing: BytesMut::new(),
            events: VecDeque::new(),
            ended: false,
            destroyed: false,
        }
    }

    pub fn with_encoding(encoding: Encoding) -> Self {
        Self::new(CableConfig::with_encoding(encoding))
    }

    /// Send a fire-and-forget message. A no-op once the cable has ended.
    pub fn send(&mut self, payload: impl Into<Payload>) -> Result<()> {
        if self.ended {
            debug!("send after end ignored");
            return Ok(());
        }
        let bytes = self.encoding.encode(&payload.into())?;
        self.write_frame(FrameType::Message, 0, &bytes)
    }

    /// Send a request; `handler` receives the response exactly once.
    ///
    /// Returns the call id. Fails without allocating an id or writing
    /// anything when the value cannot be encoded, when 65536 calls are
    /// already outstanding, or when the cable has ended.
    pub fn call<F>(&mut self, payload: impl Into<Payload>, handler: F) -> Result<u16>
    where
        F: FnOnce(Result<Payload>) + Send + 'static,
    {
        if self.ended {
            return Err(CableError::ConnectionClosed);
        }
        let bytes = self.encoding.encode(&payload.into())?;
        let id = self.register(Pending::Call(Box::new(handler)))?;
        self.write_frame(FrameType::Request, id, &bytes)?;
        Ok(id)
    }

    /// Send a ping; `handler` fires when the matching pong arrives.
    pub fn ping<F>(&mut self, handler: F) -> Result<u16>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        if self.ended {
            return Err(CableError::ConnectionClosed);
        }
        let id = self.register(Pending::Ping(Box::new(handler)))?;
        self.write_frame(FrameType::Ping, id, &[])?;
        Ok(id)
    }

    /// Answer an inbound request.
    ///
    /// `Err(message)` is sent as RESPONSE_ERR with the message text. If an
    /// `Ok` value cannot be encoded the peer gets RESPONSE_ERR carrying the
    /// encode error and the error is also returned here.
    pub fn respond(
        &mut self,
        responder: Responder,
        result: std::result::Result<Payload, String>,
    ) -> Result<()> {
        let id = responder.id();
        match result {
            Ok(payload) => match self.encoding.encode(&payload) {
                Ok(bytes) => self.write_frame(FrameType::ResponseOk, id, &bytes),
                Err(err) => {
                    let err = CableError::from(err);
                    self.write_frame(FrameType::ResponseErr, id, err.to_string().as_bytes())?;
                    Err(err)
                }
            },
            Err(message) => {
                let message = if message.is_empty() {
                    UNKNOWN_ERROR
                } else {
                    message.as_str()
                };
                self.write_frame(FrameType::ResponseErr, id, message.as_bytes())
            }
        }
    }

    /// Feed bytes received from the transport.
    ///
    /// Dispatches every frame the bytes complete and returns how many were
    /// dispatched. Partial frames stay buffered for the next call. Bytes
    /// fed after the cable has ended are ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> usize {
        if self.ended {
            debug!(len = chunk.len(), "bytes after end ignored");
            return 0;
        }
        self.parser.extend(chunk);

        let mut dispatched = 0;
        loop {
            match self.parser.next_frame() {
                Ok(Some(frame)) => {
                    self.dispatch(frame);
                    dispatched += 1;
                }
                Ok(None) => return dispatched,
                Err(err) => warn!(error = %err, "dropping frame"),
            }
        }
    }

    /// Take the bytes queued for the transport, if any.
    pub fn take_outgoing(&mut self) -> Option<Bytes> {
        if self.outgoing.is_empty() {
            None
        } else {
            Some(self.outgoing.split().freeze())
        }
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Next queued inbound notification.
    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Drain all queued inbound notifications.
    pub fn drain_events(&mut self) -> Drain<'_, Event> {
        self.events.drain(..)
    }

    /// Close the outgoing side and fail every pending call.
    ///
    /// Bytes queued before this point remain available from
    /// [`take_outgoing`](Self::take_outgoing); nothing further is written.
    /// Pending handlers receive [`CableError::ConnectionClosed`] in
    /// ascending id order. Calling it again does nothing.
    pub fn finish(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        let pending = self.calls.drain_pending();
        debug!(pending = pending.len(), "cable finished");
        for (id, call) in pending {
            trace!(id, "failing pending call");
            call.fail(CableError::ConnectionClosed);
        }
    }

    /// Tear the cable down. Queues [`Event::Close`] and finishes.
    /// Only the first call has any effect.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        debug!("cable destroyed");
        self.events.push_back(Event::Close);
        self.finish();
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Number of calls and pings awaiting a response.
    pub fn pending_calls(&self) -> usize {
        self.calls.pending()
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn register(&mut self, pending: Pending) -> Result<u16> {
        self.calls.allocate(pending).map_err(|_| {
            warn!("call table exhausted");
            CableError::CapacityExceeded
        })
    }

    fn write_frame(&mut self, frame_type: FrameType, id: u16, payload: &[u8]) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        encode_frame(frame_type, id, payload, &mut self.outgoing)?;
        trace!(%frame_type, id, len = payload.len(), "queued frame");
        Ok(())
    }

    fn dispatch(&mut self, frame: Frame) {
        let Frame {
            frame_type,
            id,
            payload,
        } = frame;
        debug!(%frame_type, id, len = payload.len(), "dispatching frame");

        match frame_type {
            FrameType::Message => match self.encoding.decode(payload) {
                Ok(value) => self.events.push_back(Event::Message(value)),
                Err(err) => warn!(error = %err, "dropping undecodable message"),
            },
            FrameType::Request => match self.encoding.decode(payload) {
                Ok(value) => self
                    .events
                    .push_back(Event::Request(value, Responder::new(id))),
                Err(err) => {
                    warn!(id, error = %err, "rejecting undecodable request");
                    let message = CableError::from(err).to_string();
                    self.reply(FrameType::ResponseErr, id, message.as_bytes());
                }
            },
            FrameType::ResponseOk => match self.calls.resolve(id) {
                Some(Pending::Call(handler)) => {
                    handler(self.encoding.decode(payload).map_err(CableError::from))
                }
                Some(Pending::Ping(handler)) => handler(Ok(())),
                None => warn!(id, "response for unknown call id"),
            },
            FrameType::ResponseErr => {
                let message = String::from_utf8_lossy(&payload).into_owned();
                match self.calls.resolve(id) {
                    Some(pending) => pending.fail(CableError::Remote(message)),
                    None => warn!(id, "error response for unknown call id"),
                }
            }
            FrameType::Ping => {
                self.events.push_back(Event::Ping);
                self.reply(FrameType::ResponseOk, id, &[]);
            }
        }
    }

    fn reply(&mut self, frame_type: FrameType, id: u16, payload: &[u8]) {
        if let Err(err) = self.write_frame(frame_type, id, payload) {
            warn!(id, error = %err, "failed to queue reply");
        }
    }
}

impl Default for Cable {
    fn default() -> Self {
        Self::new(CableConfig::default())
    }
}

impl std::fmt::Debug for Cable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cable")
            .field("encoding", &self.encoding)
            .field("pending_calls", &self.calls.pending())
            .field("queued_bytes", &self.outgoing.len())
            .field("queued_events", &self.events.len())
            .field("ended", &self.ended)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    use bytes::BufMut;
    use cable_encoding::Mixed;
    use cable_frame::HEADER_SIZE;
    use serde_json::json;

    use super::*;
    use crate::correlator::MAX_CALLS;

    /// Move queued bytes from `from` into `to`.
    fn shuttle(from: &mut Cable, to: &mut Cable) -> usize {
        match from.take_outgoing() {
            Some(bytes) => to.feed(&bytes),
            None => 0,
        }
    }

    fn frames_of(bytes: &[u8]) -> Vec<Frame> {
        FrameParser::new().push(bytes)
    }

    type Log = Arc<Mutex<Vec<(u16, String)>>>;

    fn recording_handler(log: &Log, tag: u16) -> impl FnOnce(Result<Payload>) + Send + 'static {
        let log = Arc::clone(log);
        move |result| {
            let entry = match result {
                Ok(payload) => format!("ok:{payload:?}"),
                Err(err) => format!("err:{err}"),
            };
            log.lock().unwrap().push((tag, entry));
        }
    }

    #[test]
    fn request_encodes_to_exact_wire_bytes() {
        let mut cable = Cable::default();
        for _ in 0..42 {
            cable.call(Bytes::new(), |_| {}).unwrap();
        }
        cable.take_outgoing();

        let id = cable.call(Bytes::from_static(b"hi"), |_| {}).unwrap();
        assert_eq!(id, 42);
        assert_eq!(
            cable.take_outgoing().unwrap().as_ref(),
            &[0x01, 0x2A, 0x00, 0x02, 0x00, 0x00, 0x00, 0x68, 0x69]
        );
    }

    #[test]
    fn request_bytes_dispatch_with_responder() {
        let mut cable = Cable::default();
        let dispatched = cable.feed(&[0x01, 0x2A, 0x00, 0x02, 0x00, 0x00, 0x00, 0x68, 0x69]);
        assert_eq!(dispatched, 1);

        match cable.poll_event() {
            Some(Event::Request(Payload::Bytes(bytes), responder)) => {
                assert_eq!(bytes.as_ref(), b"hi");
                assert_eq!(responder.id(), 42);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn message_is_fire_and_forget() {
        let mut a = Cable::with_encoding(Encoding::Utf8);
        let mut b = Cable::with_encoding(Encoding::Utf8);

        a.send("hello").unwrap();
        assert_eq!(a.pending_calls(), 0);
        let wire = a.take_outgoing().unwrap();
        assert_eq!(wire[0], FrameType::Message as u8);
        assert_eq!(&wire[1..3], &[0, 0]);

        assert_eq!(b.feed(&wire), 1);
        assert!(matches!(b.poll_event(), Some(Event::Message(Payload::Text(t))) if t == "hello"));
        assert!(!b.has_outgoing(), "messages are never acknowledged");
    }

    #[test]
    fn call_and_response_round_trip() {
        let mut client = Cable::with_encoding(Encoding::Json);
        let mut server = Cable::with_encoding(Encoding::Json);
        let (tx, rx) = mpsc::channel();

        client
            .call(json!({"op": "add", "args": [2, 3]}), move |result| {
                tx.send(result.unwrap()).unwrap();
            })
            .unwrap();
        shuttle(&mut client, &mut server);

        let Some(Event::Request(Payload::Json(request), responder)) = server.poll_event() else {
            panic!("expected request");
        };
        let sum: i64 = request["args"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n.as_i64().unwrap())
            .sum();
        server.respond(responder, Ok(json!(sum).into())).unwrap();
        shuttle(&mut server, &mut client);

        assert_eq!(rx.try_recv().unwrap(), Payload::Json(json!(5)));
        assert_eq!(client.pending_calls(), 0);
    }

    #[test]
    fn error_response_reaches_handler_as_remote_failure() {
        let mut client = Cable::default();
        let mut server = Cable::default();
        let (tx, rx) = mpsc::channel();

        client
            .call(Bytes::from_static(b"x"), move |result| {
                tx.send(result).unwrap();
            })
            .unwrap();
        shuttle(&mut client, &mut server);

        let Some(Event::Request(_, responder)) = server.poll_event() else {
            panic!("expected request");
        };
        server
            .respond(responder, Err("no such method".to_string()))
            .unwrap();

        let wire = server.take_outgoing().unwrap();
        let frames = frames_of(&wire);
        assert_eq!(frames[0].frame_type, FrameType::ResponseErr);
        assert_eq!(frames[0].payload.as_ref(), b"no such method");

        client.feed(&wire);
        match rx.try_recv().unwrap() {
            Err(CableError::Remote(message)) => assert_eq!(message, "no such method"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn empty_error_message_becomes_unknown_error() {
        let mut server = Cable::default();
        server.feed(&[0x01, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00]);
        let Some(Event::Request(_, responder)) = server.poll_event() else {
            panic!("expected request");
        };
        server.respond(responder, Err(String::new())).unwrap();

        let frames = frames_of(&server.take_outgoing().unwrap());
        assert_eq!(frames[0].id, 5);
        assert_eq!(frames[0].payload.as_ref(), UNKNOWN_ERROR.as_bytes());
    }

    #[test]
    fn ping_is_answered_with_empty_response() {
        let mut a = Cable::with_encoding(Encoding::Mixed);
        let mut b = Cable::with_encoding(Encoding::Mixed);
        let (tx, rx) = mpsc::channel();

        let id = a
            .ping(move |result| {
                tx.send(result.is_ok()).unwrap();
            })
            .unwrap();
        shuttle(&mut a, &mut b);
        assert!(matches!(b.poll_event(), Some(Event::Ping)));

        let pong = b.take_outgoing().unwrap();
        assert_eq!(pong.len(), HEADER_SIZE);
        let frames = frames_of(&pong);
        assert_eq!(frames[0].frame_type, FrameType::ResponseOk);
        assert_eq!(frames[0].id, id);
        assert!(frames[0].payload.is_empty());

        a.feed(&pong);
        assert!(rx.try_recv().unwrap());
        assert_eq!(a.pending_calls(), 0);
    }

    #[test]
    fn responses_dispatch_by_id_regardless_of_order() {
        let mut client = Cable::default();
        let mut server = Cable::default();
        let log: Log = Arc::default();

        for tag in 0..3u16 {
            client
                .call(Bytes::from(vec![tag as u8]), recording_handler(&log, tag))
                .unwrap();
        }
        shuttle(&mut client, &mut server);

        let mut requests: Vec<(Payload, Responder)> = server
            .drain_events()
            .map(|event| match event {
                Event::Request(payload, responder) => (payload, responder),
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        requests.reverse();
        for (payload, responder) in requests {
            server.respond(responder, Ok(payload)).unwrap();
        }
        shuttle(&mut server, &mut client);

        let log = log.lock().unwrap();
        let tags: Vec<u16> = log.iter().map(|(tag, _)| *tag).collect();
        assert_eq!(tags, vec![2, 1, 0]);
        assert!(log[0].1.contains("\\x02"), "{}", log[0].1);
    }

    #[test]
    fn completed_ids_are_reused() {
        let mut client = Cable::default();
        let mut server = Cable::default();

        let first = client.call(Bytes::new(), |_| {}).unwrap();
        let second = client.call(Bytes::new(), |_| {}).unwrap();
        assert_eq!((first, second), (0, 1));
        shuttle(&mut client, &mut server);

        let events: Vec<Event> = server.drain_events().collect();
        for event in events {
            if let Event::Request(_, responder) = event {
                server.respond(responder, Ok(Payload::Empty)).unwrap();
            }
        }
        shuttle(&mut server, &mut client);

        assert_eq!(client.call(Bytes::new(), |_| {}).unwrap(), 1);
        assert_eq!(client.call(Bytes::new(), |_| {}).unwrap(), 0);
        assert_eq!(client.call(Bytes::new(), |_| {}).unwrap(), 2);
    }

    #[test]
    fn duplicate_response_is_dispatched_once() {
        let mut client = Cable::default();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let id = client
            .call(Bytes::new(), move |_| *counter.lock().unwrap() += 1)
            .unwrap();

        let mut wire = BytesMut::new();
        encode_frame(FrameType::ResponseOk, id, b"", &mut wire).unwrap();
        encode_frame(FrameType::ResponseOk, id, b"", &mut wire).unwrap();
        client.feed(&wire);

        assert_eq!(*calls.lock().unwrap(), 1);
        // The id was released once, so two new calls get two distinct ids.
        let a = client.call(Bytes::new(), |_| {}).unwrap();
        let b = client.call(Bytes::new(), |_| {}).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn capacity_exhaustion_fails_synchronously() {
        let mut cable = Cable::default();
        for _ in 0..MAX_CALLS - 1 {
            cable.call(Bytes::new(), |_| {}).unwrap();
        }
        assert_eq!(cable.call(Bytes::new(), |_| {}).unwrap(), u16::MAX);
        let queued = cable.take_outgoing().unwrap().len();
        assert_eq!(queued, MAX_CALLS * HEADER_SIZE);

        let fired = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&fired);
        let err = cable
            .call(Bytes::from_static(b"one too many"), move |_| {
                *flag.lock().unwrap() = true
            })
            .unwrap_err();
        assert!(matches!(err, CableError::CapacityExceeded));
        assert!(err.to_string().contains("stack overflow"));
        assert!(!*fired.lock().unwrap());
        assert!(!cable.has_outgoing(), "nothing reaches the wire");
        assert_eq!(cable.pending_calls(), MAX_CALLS);
        assert!(matches!(
            cable.ping(|_| {}),
            Err(CableError::CapacityExceeded)
        ));
    }

    #[test]
    fn finish_fails_pending_calls_in_ascending_order() {
        for outstanding in [0u16, 1, 5] {
            let mut cable = Cable::default();
            let log: Log = Arc::default();
            for tag in 0..outstanding {
                cable.call(Bytes::new(), recording_handler(&log, tag)).unwrap();
            }

            cable.finish();
            {
                let log = log.lock().unwrap();
                assert_eq!(log.len(), usize::from(outstanding));
                for (index, (tag, entry)) in log.iter().enumerate() {
                    assert_eq!(usize::from(*tag), index);
                    assert_eq!(entry, "err:cable was destroyed");
                }
            }

            cable.finish();
            cable.destroy();
            assert_eq!(log.lock().unwrap().len(), usize::from(outstanding));
            assert_eq!(cable.pending_calls(), 0);
        }
    }

    #[test]
    fn finish_skips_completed_calls() {
        let mut cable = Cable::default();
        let log: Log = Arc::default();
        for tag in 0..4 {
            cable.call(Bytes::new(), recording_handler(&log, tag)).unwrap();
        }
        let mut wire = BytesMut::new();
        encode_frame(FrameType::ResponseOk, 1, b"", &mut wire).unwrap();
        encode_frame(FrameType::ResponseErr, 2, b"nope", &mut wire).unwrap();
        cable.feed(&wire);

        cable.finish();
        let log = log.lock().unwrap();
        let closed: Vec<u16> = log
            .iter()
            .filter(|(_, entry)| entry == "err:cable was destroyed")
            .map(|(tag, _)| *tag)
            .collect();
        assert_eq!(closed, vec![0, 3]);
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn nothing_is_written_after_end() {
        let mut cable = Cable::default();
        cable.send(Bytes::from_static(b"before")).unwrap();
        cable.feed(&[0x01, 0x09, 0x00, 0x00, 0x00, 0x00, 0x00]);
        let Some(Event::Request(_, responder)) = cable.poll_event() else {
            panic!("expected request");
        };

        cable.finish();
        let queued = cable.take_outgoing().unwrap();
        assert_eq!(frames_of(&queued).len(), 1, "bytes queued before end survive");

        cable.send(Bytes::from_static(b"after")).unwrap();
        cable.respond(responder, Ok(Payload::Empty)).unwrap();
        assert!(matches!(
            cable.call(Bytes::new(), |_| {}),
            Err(CableError::ConnectionClosed)
        ));
        assert!(matches!(
            cable.ping(|_| {}),
            Err(CableError::ConnectionClosed)
        ));
        assert!(cable.take_outgoing().is_none());
        assert_eq!(cable.pending_calls(), 0);
    }

    #[test]
    fn feed_after_end_is_ignored() {
        let mut cable = Cable::default();
        cable.finish();
        assert_eq!(cable.feed(&[0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]), 0);
        assert!(cable.poll_event().is_none());
    }

    #[test]
    fn destroy_is_idempotent_and_emits_close_once() {
        let mut cable = Cable::default();
        let (tx, rx) = mpsc::channel();
        cable
            .call(Bytes::new(), move |result| tx.send(result.is_err()).unwrap())
            .unwrap();

        cable.destroy();
        cable.destroy();

        assert!(cable.is_destroyed());
        assert!(cable.is_ended());
        assert!(rx.try_recv().unwrap());
        let events: Vec<Event> = cable.drain_events().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::Close));
    }

    #[test]
    fn chunking_does_not_change_dispatch() {
        let mut source = Cable::with_encoding(Encoding::Utf8);
        source.send("one").unwrap();
        source.call("two", |_| {}).unwrap();
        source.ping(|_| {}).unwrap();
        source.send("").unwrap();
        let wire = source.take_outgoing().unwrap();

        let describe = |cable: &mut Cable| -> Vec<String> {
            cable
                .drain_events()
                .map(|event| match event {
                    Event::Message(p) => format!("message:{p:?}"),
                    Event::Request(p, r) => format!("request:{}:{p:?}", r.id()),
                    Event::Ping => "ping".to_string(),
                    Event::Close => "close".to_string(),
                })
                .collect()
        };

        let mut whole = Cable::with_encoding(Encoding::Utf8);
        whole.feed(&wire);
        let expected = describe(&mut whole);
        assert_eq!(expected.len(), 4);

        for split in 0..=wire.len() {
            let mut cable = Cable::with_encoding(Encoding::Utf8);
            cable.feed(&wire[..split]);
            cable.feed(&wire[split..]);
            assert_eq!(describe(&mut cable), expected, "split at {split}");
        }

        let mut trickle = Cable::with_encoding(Encoding::Utf8);
        for byte in wire.iter() {
            trickle.feed(std::slice::from_ref(byte));
        }
        assert_eq!(describe(&mut trickle), expected);
    }

    #[test]
    fn undecodable_mixed_request_is_rejected() {
        let mut server = Cable::with_encoding(Encoding::Mixed);
        let mut wire = BytesMut::new();
        encode_frame(FrameType::Request, 3, b"\x01\x00", &mut wire).unwrap();
        server.feed(&wire);

        assert!(server.poll_event().is_none());
        let frames = frames_of(&server.take_outgoing().unwrap());
        assert_eq!(frames[0].frame_type, FrameType::ResponseErr);
        assert_eq!(frames[0].id, 3);
        assert!(String::from_utf8_lossy(&frames[0].payload).contains("truncated"));
    }

    #[test]
    fn undecodable_mixed_response_fails_the_call() {
        let mut client = Cable::with_encoding(Encoding::Mixed);
        let (tx, rx) = mpsc::channel();
        let id = client
            .call(Mixed::default(), move |result| tx.send(result).unwrap())
            .unwrap();

        let mut wire = BytesMut::new();
        encode_frame(FrameType::ResponseOk, id, b"", &mut wire).unwrap();
        client.feed(&wire);

        assert!(matches!(rx.try_recv().unwrap(), Err(CableError::Decode(_))));
    }

    #[test]
    fn mixed_values_cross_the_wire() {
        let mut a = Cable::with_encoding(Encoding::Mixed);
        let mut b = Cable::with_encoding(Encoding::Mixed);
        let value = Mixed::new(json!({"file": "a.bin"}), vec![1u8, 2, 3]);

        a.send(value.clone()).unwrap();
        shuttle(&mut a, &mut b);
        assert!(matches!(b.poll_event(), Some(Event::Message(Payload::Mixed(m))) if m == value));
    }

    #[test]
    fn encode_failure_does_not_allocate() {
        let mut cable = Cable::with_encoding(Encoding::Raw);
        let err = cable.call(json!({"not": "bytes"}), |_| {}).unwrap_err();
        assert!(matches!(err, CableError::Encode(_)));
        assert_eq!(cable.pending_calls(), 0);
        assert!(!cable.has_outgoing());
        assert_eq!(cable.call(Bytes::new(), |_| {}).unwrap(), 0);
    }

    #[test]
    fn unencodable_response_is_reported_to_both_sides() {
        let mut server = Cable::with_encoding(Encoding::Raw);
        server.feed(&[0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00]);
        let Some(Event::Request(_, responder)) = server.poll_event() else {
            panic!("expected request");
        };

        let err = server
            .respond(responder, Ok(Payload::Mixed(Mixed::default())))
            .unwrap_err();
        assert!(matches!(err, CableError::Encode(_)));
        let frames = frames_of(&server.take_outgoing().unwrap());
        assert_eq!(frames[0].frame_type, FrameType::ResponseErr);
        assert_eq!(frames[0].id, 2);
    }

    #[test]
    fn unknown_frame_types_are_skipped() {
        let mut cable = Cable::default();
        let mut wire = BytesMut::new();
        wire.put_u8(0x7F);
        wire.put_u16_le(1);
        wire.put_u32_le(2);
        wire.put_slice(b"??");
        encode_frame(FrameType::Message, 0, b"next", &mut wire).unwrap();

        assert_eq!(cable.feed(&wire), 1);
        assert!(matches!(cable.poll_event(), Some(Event::Message(_))));
    }

    #[test]
    fn response_for_unknown_id_is_ignored() {
        let mut cable = Cable::default();
        let mut wire = BytesMut::new();
        encode_frame(FrameType::ResponseOk, 99, b"stray", &mut wire).unwrap();
        encode_frame(FrameType::ResponseErr, 100, b"stray", &mut wire).unwrap();
        assert_eq!(cable.feed(&wire), 2);
        assert_eq!(cable.call(Bytes::new(), |_| {}).unwrap(), 0);
    }

    #[test]
    fn json_request_payload_edge_cases() {
        let mut cable = Cable::with_encoding(Encoding::Json);
        let mut wire = BytesMut::new();
        encode_frame(FrameType::Message, 0, b"", &mut wire).unwrap();
        encode_frame(FrameType::Message, 0, b"{bad", &mut wire).unwrap();
        cable.feed(&wire);

        assert!(matches!(cable.poll_event(), Some(Event::Message(Payload::Empty))));
        assert!(matches!(
            cable.poll_event(),
            Some(Event::Message(Payload::Json(serde_json::Value::Null)))
        ));
    }
}
