pub mod client;
pub mod codec;
pub mod error;
pub mod frame;
pub mod header;
pub mod heartbeat;
pub mod listener;
pub mod options;
pub mod parser;
pub mod queue;
pub mod reconnect;
pub mod transport;

pub use client::{ConnectionState, JSON_CONTENT_TYPE, ServerInfo, StompClient, WeakStompClient};
pub use codec::StompCodec;
pub use error::{FrameError, StompError, TransportError};
pub use frame::{ClientCommand, ClientFrame, ServerCommand, ServerError, ServerFrame};
pub use header::{Header, Headers};
pub use heartbeat::{Heartbeat, negotiate_heartbeats, parse_heartbeat_header};
pub use listener::{NoopListener, StompListener};
pub use options::{AckMode, ConnectOptions};
pub use parser::{StompItem, parse_server_frame};
pub use queue::FrameQueue;
pub use reconnect::{PolicyState, ReconnectConfig, ReconnectPolicy};
pub use transport::tcp::{TcpConnector, TcpTransport};
pub use transport::{Connector, Transport, TransportEvents};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke_frame_display() {
        let f = ClientFrame::new(ClientCommand::Send)
            .header(Header::Destination("/queue/a".into()))
            .set_body("hello");
        let s = format!("{}", f);
        assert!(s.contains("SEND"));
        assert!(s.contains("Body (5 bytes)"));
    }
}
