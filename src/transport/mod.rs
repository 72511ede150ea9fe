//! Transport contract consumed by `StompClient`.
//!
//! A transport moves whole text messages (one STOMP frame, or a heartbeat)
//! over some bidirectional connection. The client opens one through a
//! `Connector` each time it connects, and the transport reports what
//! happens to it through the `TransportEvents` handle it was opened with.
//!
//! Implementations must not call `TransportEvents` synchronously from within
//! `Connector::open`, `Transport::write_text` or `Transport::close`: those
//! methods are invoked while the client holds its state lock.

use std::fmt;
use std::sync::Weak;
use tracing::trace;

use crate::error::TransportError;

pub mod tcp;

/// One live connection.
pub trait Transport: Send + 'static {
    /// Queue `text` for transmission. Must not block on the network.
    fn write_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Begin closing the connection. Must not block on the network.
    fn close(&mut self);

    /// Whether the connection is currently open for writes.
    fn is_open(&self) -> bool;
}

/// Opens transports bound to an address.
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    /// Start opening a connection to `address`. Completion is reported later
    /// through `events.opened()` or `events.closed(..)`.
    fn open(&self, address: &str, events: TransportEvents)
    -> Result<Self::Transport, TransportError>;
}

/// Something that happened to a transport.
#[derive(Debug)]
pub(crate) enum TransportEvent {
    Opened,
    Closed(Option<TransportError>),
    Text(String),
}

/// Receiver of transport events, keyed by the session they belong to.
pub(crate) trait EventTarget: Send + Sync {
    fn handle_event(&self, session: u64, event: TransportEvent);
}

/// Handle a transport uses to report its events back to the client that
/// opened it.
///
/// Each handle is bound to one connect attempt; events arriving after the
/// client has moved on to another session (or has been dropped) are
/// discarded.
#[derive(Clone)]
pub struct TransportEvents {
    session: u64,
    target: Weak<dyn EventTarget>,
}

impl TransportEvents {
    pub(crate) fn new(session: u64, target: Weak<dyn EventTarget>) -> Self {
        Self { session, target }
    }

    /// The connection is open and writable.
    pub fn opened(&self) {
        self.emit(TransportEvent::Opened);
    }

    /// The connection closed, with the error that caused it if any.
    pub fn closed(&self, error: Option<TransportError>) {
        self.emit(TransportEvent::Closed(error));
    }

    /// A text message arrived.
    pub fn text_received(&self, text: impl Into<String>) {
        self.emit(TransportEvent::Text(text.into()));
    }

    fn emit(&self, event: TransportEvent) {
        match self.target.upgrade() {
            Some(target) => target.handle_event(self.session, event),
            None => trace!(session = self.session, "client dropped; discarding transport event"),
        }
    }
}

impl fmt::Debug for TransportEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportEvents")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
