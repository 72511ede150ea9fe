//! Shared test fixtures: an in-memory connector that records every write and
//! hands out the event handles of the transports it opened, plus a listener
//! that records every notification.

#![allow(dead_code)]

use serde_json::Value;
use std::sync::{Arc, Mutex};
use stomp_relay::{
    ClientCommand, ClientFrame, Connector, Headers, StompClient, StompError, StompListener,
    Transport, TransportError, TransportEvents,
};

#[derive(Default)]
struct Wire {
    writes: Vec<String>,
    events: Vec<TransportEvents>,
    addresses: Vec<String>,
    closes: usize,
    fail_open: bool,
    fail_writes: bool,
}

#[derive(Clone, Default)]
pub struct MockConnector {
    wire: Arc<Mutex<Wire>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written to any transport, in order.
    pub fn writes(&self) -> Vec<String> {
        self.wire.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.wire.lock().unwrap().writes.clear();
    }

    /// Event handle of the most recently opened transport.
    pub fn events(&self) -> TransportEvents {
        self.wire
            .lock()
            .unwrap()
            .events
            .last()
            .cloned()
            .expect("no transport opened")
    }

    /// Event handle of the `n`th transport opened (0-based).
    pub fn events_at(&self, n: usize) -> TransportEvents {
        self.wire.lock().unwrap().events[n].clone()
    }

    pub fn open_count(&self) -> usize {
        self.wire.lock().unwrap().events.len()
    }

    pub fn close_count(&self) -> usize {
        self.wire.lock().unwrap().closes
    }

    pub fn addresses(&self) -> Vec<String> {
        self.wire.lock().unwrap().addresses.clone()
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.wire.lock().unwrap().fail_open = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.wire.lock().unwrap().fail_writes = fail;
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn open(&self, address: &str, events: TransportEvents) -> Result<MockTransport, TransportError> {
        let mut wire = self.wire.lock().unwrap();
        if wire.fail_open {
            return Err(TransportError::NotOpen);
        }
        wire.addresses.push(address.to_string());
        wire.events.push(events);
        Ok(MockTransport {
            wire: self.wire.clone(),
            open: true,
        })
    }
}

pub struct MockTransport {
    wire: Arc<Mutex<Wire>>,
    open: bool,
}

impl Transport for MockTransport {
    fn write_text(&mut self, text: &str) -> Result<(), TransportError> {
        let mut wire = self.wire.lock().unwrap();
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        if wire.fail_writes {
            return Err(TransportError::Closed);
        }
        wire.writes.push(text.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.wire.lock().unwrap().closes += 1;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    Connected,
    Message {
        destination: String,
        body: Value,
        headers: Headers,
    },
    FrameQueued(ClientFrame),
    Error(StompError),
    Disconnected(Option<StompError>),
}

#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn connected(&self) -> usize {
        self.count(|e| matches!(e, Event::Connected))
    }

    pub fn queued(&self) -> usize {
        self.count(|e| matches!(e, Event::FrameQueued(_)))
    }

    pub fn errors(&self) -> Vec<StompError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    pub fn disconnects(&self) -> Vec<Option<StompError>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Disconnected(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<(String, Value, Headers)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Message {
                    destination,
                    body,
                    headers,
                } => Some((destination, body, headers)),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl StompListener for Recorder {
    fn on_connected(&self) {
        self.push(Event::Connected);
    }

    fn on_message(&self, destination: &str, body: Value, headers: &Headers) {
        self.push(Event::Message {
            destination: destination.to_string(),
            body,
            headers: headers.clone(),
        });
    }

    fn on_frame_queued(&self, frame: &ClientFrame) {
        self.push(Event::FrameQueued(frame.clone()));
    }

    fn on_error(&self, error: &StompError) {
        self.push(Event::Error(error.clone()));
    }

    fn on_disconnected(&self, error: Option<&StompError>) {
        self.push(Event::Disconnected(error.cloned()));
    }
}

pub const CONNECTED: &str = "CONNECTED\nversion:1.2\n\n\0";

pub fn new_client(address: &str) -> (StompClient<MockConnector>, MockConnector, Arc<Recorder>) {
    let connector = MockConnector::new();
    let recorder = Recorder::new();
    let client = StompClient::new(address, connector.clone(), recorder.clone());
    (client, connector, recorder)
}

/// Drive `client` through open and handshake.
pub fn establish(client: &StompClient<MockConnector>, connector: &MockConnector) {
    client.connect();
    connector.events().opened();
    connector.events().text_received(CONNECTED);
}

/// Command line of a written frame.
pub fn command_of(text: &str) -> &str {
    text.split('\n').next().unwrap_or_default()
}

pub fn is_command(text: &str, command: ClientCommand) -> bool {
    command_of(text) == command.as_str()
}

/// Parse a frame the client wrote by presenting it as a MESSAGE, so the
/// server-frame parser (and its unescaping) can read it back.
pub fn reparse(text: &str) -> stomp_relay::ServerFrame {
    let (_, rest) = text.split_once('\n').expect("command line");
    match stomp_relay::parse_server_frame(&format!("MESSAGE\n{}", rest)) {
        Ok(stomp_relay::StompItem::Frame(frame)) => frame,
        other => panic!("expected frame, got {:?}", other),
    }
}
