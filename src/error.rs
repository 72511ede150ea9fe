use std::io;
use std::sync::Arc;
use thiserror::Error;

use crate::frame::ServerError;

/// Errors produced while parsing an inbound frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The command line is not one of CONNECTED, MESSAGE, RECEIPT or ERROR.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),
    /// A header value could not be interpreted (for example a non-numeric
    /// `content-length`, or an undefined escape sequence).
    #[error("malformed header '{name}': {reason}")]
    MalformedHeader { name: String, reason: String },
    /// The text contained no command line at all.
    #[error("missing command line")]
    MissingCommand,
}

impl FrameError {
    pub(crate) fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        FrameError::MalformedHeader {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by a transport implementation.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// A write was attempted on a transport that is not open.
    #[error("transport is not open")]
    NotOpen,
    /// The connection was closed by the peer or by the transport task.
    #[error("connection closed")]
    Closed,
    /// The transport needs a tokio runtime and none was available.
    #[error("no tokio runtime available to drive the transport")]
    NoRuntime,
    /// I/O-level error from the underlying socket.
    #[error("io error: {0}")]
    Io(Arc<io::Error>),
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::Io(Arc::new(err))
    }
}

/// Errors reported by `StompClient` operations and surfaced to the
/// registered `StompListener`.
///
/// The type is `Clone` so the same failure can be returned to a caller and
/// reported to the listener.
#[derive(Error, Debug, Clone)]
pub enum StompError {
    /// An inbound frame could not be parsed. Only that frame is discarded.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    /// A payload could not be encoded to, or a body decoded from, JSON.
    #[error("encoding error: {0}")]
    Encoding(Arc<serde_json::Error>),
    /// Failure propagated from the transport layer.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The server sent an ERROR frame.
    #[error("{0}")]
    Server(ServerError),
}

impl From<serde_json::Error> for StompError {
    fn from(err: serde_json::Error) -> Self {
        StompError::Encoding(Arc::new(err))
    }
}

impl From<ServerError> for StompError {
    fn from(err: ServerError) -> Self {
        StompError::Server(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_display_names_token() {
        let err = FrameError::UnknownCommand("BOGUS".into());
        assert!(err.to_string().contains("BOGUS"));
    }

    #[test]
    fn io_error_converts_into_transport_error() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err: TransportError = io_err.into();
        match err {
            TransportError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionRefused),
            other => panic!("expected Io variant, got {:?}", other),
        }
    }

    #[test]
    fn stomp_error_wraps_frame_error() {
        let err: StompError = FrameError::malformed("content-length", "not a number").into();
        let display = err.to_string();
        assert!(display.contains("frame error"));
        assert!(display.contains("content-length"));
    }
}
