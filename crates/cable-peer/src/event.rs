use cable_encoding::Payload;

/// Inbound notification produced while feeding bytes to a [`Cable`].
///
/// [`Cable`]: crate::Cable
#[derive(Debug)]
pub enum Event {
    /// Fire-and-forget message.
    Message(Payload),
    /// Request awaiting an answer through the attached [`Responder`].
    Request(Payload, Responder),
    /// The peer pinged us. The pong has already been queued.
    Ping,
    /// The cable was destroyed.
    Close,
}

impl Event {
    /// The payload of a message or request.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Event::Message(payload) | Event::Request(payload, _) => Some(payload),
            Event::Ping | Event::Close => None,
        }
    }
}

/// Answer handle for one inbound request.
///
/// Not `Clone`: passing it to [`Cable::respond`] consumes it, so each
/// request is answered at most once.
///
/// [`Cable::respond`]: crate::Cable::respond
#[derive(Debug, PartialEq, Eq)]
#[must_use = "the peer's call stays pending until the responder is used"]
pub struct Responder {
    id: u16,
}

impl Responder {
    pub(crate) fn new(id: u16) -> Self {
        Self { id }
    }

    /// The call id the response will carry.
    pub fn id(&self) -> u16 {
        self.id
    }
}
