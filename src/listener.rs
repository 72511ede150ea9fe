use serde_json::Value;

use crate::error::StompError;
use crate::frame::ClientFrame;
use crate::header::Headers;

/// Receives the notifications of a `StompClient`.
///
/// One listener is registered when the client is constructed. Callbacks run
/// on whichever thread drove the event (the caller for `send`/`connect`, the
/// transport for inbound traffic) and never while the client's internal lock
/// is held, so a listener may call back into the client.
///
/// Every method has an empty default body.
pub trait StompListener: Send + Sync {
    /// The CONNECTED frame arrived and any queued frames were flushed.
    fn on_connected(&self) {}

    /// A MESSAGE frame arrived. `body` is the decoded JSON payload
    /// (`Value::Null` for an empty body).
    fn on_message(&self, destination: &str, body: Value, headers: &Headers) {
        let _ = (destination, body, headers);
    }

    /// `frame` was buffered instead of transmitted because no session is
    /// established.
    fn on_frame_queued(&self, frame: &ClientFrame) {
        let _ = frame;
    }

    /// A protocol, encoding or transport failure that did not end the
    /// session.
    fn on_error(&self, error: &StompError) {
        let _ = error;
    }

    /// The transport closed. `error` is `None` for a solicited close.
    fn on_disconnected(&self, error: Option<&StompError>) {
        let _ = error;
    }
}

/// A listener that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl StompListener for NoopListener {}
