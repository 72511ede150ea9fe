use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::codec::HEARTBEAT;
use crate::error::StompError;
use crate::frame::{ClientCommand, ClientFrame, ServerCommand, ServerError, ServerFrame};
use crate::header::{Header, Headers};
use crate::heartbeat::{negotiate_heartbeats, parse_heartbeat_header};
use crate::listener::StompListener;
use crate::options::{AckMode, ConnectOptions, DEFAULT_ACCEPT_VERSION, host_from_address};
use crate::parser::{StompItem, parse_server_frame};
use crate::queue::FrameQueue;
use crate::transport::{Connector, EventTarget, Transport, TransportEvent, TransportEvents};

/// `content-type` of every SEND frame.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Connection lifecycle of a `StompClient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport.
    Offline,
    /// A transport was asked to open.
    Connecting,
    /// Transport open, CONNECT written, CONNECTED not yet received.
    AwaitingHandshake,
    /// Handshake complete; frames go straight to the wire.
    Established,
    /// DISCONNECT written; waiting for its RECEIPT before closing.
    Disconnecting,
}

/// What the server told us in its CONNECTED frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerInfo {
    pub version: Option<String>,
    pub session: Option<String>,
    pub server: Option<String>,
    /// Negotiated `(outgoing, incoming)` heartbeat intervals.
    pub heartbeat: (Option<Duration>, Option<Duration>),
}

/// Listener notifications collected under the lock and delivered after it
/// is released.
enum Notice {
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

struct Session<T> {
    state: ConnectionState,
    transport: Option<T>,
    queue: FrameQueue,
    /// Bumped on every connect and teardown; events tagged with an older
    /// value belong to a dead transport.
    generation: u64,
    disconnect_receipt: Option<String>,
    server: Option<ServerInfo>,
}

struct Inner<C: Connector> {
    address: String,
    options: ConnectOptions,
    connector: C,
    listener: Arc<dyn StompListener>,
    next_id: AtomicU64,
    session: Mutex<Session<C::Transport>>,
}

/// STOMP protocol engine bound to one target address.
///
/// The client runs the connect / handshake / teardown state machine over
/// transports opened by its `Connector`. Frames produced while no session is
/// established are buffered and flushed, in order, as soon as the next
/// CONNECTED frame arrives. Every outcome is reported to the registered
/// `StompListener`; no operation waits on the network.
///
/// `StompClient` is a cheap handle: clones share the same state.
pub struct StompClient<C: Connector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for StompClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Non-owning handle to a `StompClient`.
pub struct WeakStompClient<C: Connector> {
    inner: Weak<Inner<C>>,
}

impl<C: Connector> Clone for WeakStompClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Connector> WeakStompClient<C> {
    pub fn upgrade(&self) -> Option<StompClient<C>> {
        self.inner.upgrade().map(|inner| StompClient { inner })
    }
}

fn custom_headers<'a>(headers: &'a [(&str, &str)]) -> impl Iterator<Item = Header> + 'a {
    headers.iter().map(|(k, v)| Header::custom(*k, *v))
}

impl<C: Connector> StompClient<C> {
    /// Create an offline client with default `ConnectOptions`.
    pub fn new(address: impl Into<String>, connector: C, listener: Arc<dyn StompListener>) -> Self {
        Self::with_options(address, connector, listener, ConnectOptions::default())
    }

    pub fn with_options(
        address: impl Into<String>,
        connector: C,
        listener: Arc<dyn StompListener>,
        options: ConnectOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                address: address.into(),
                options,
                connector,
                listener,
                next_id: AtomicU64::new(1),
                session: Mutex::new(Session {
                    state: ConnectionState::Offline,
                    transport: None,
                    queue: FrameQueue::new(),
                    generation: 0,
                    disconnect_receipt: None,
                    server: None,
                }),
            }),
        }
    }

    /// Open a transport to the target address. No-op while a transport is
    /// already live.
    pub fn connect(&self) {
        let mut notices = Vec::new();
        {
            let mut guard = self.inner.lock();
            let s = &mut *guard;
            if s.transport.is_some() {
                trace!(state = ?s.state, "connect ignored: transport already live");
                return;
            }
            s.generation += 1;
            let events = TransportEvents::new(s.generation, self.event_target());
            match self.inner.connector.open(&self.inner.address, events) {
                Ok(transport) => {
                    s.transport = Some(transport);
                    s.state = ConnectionState::Connecting;
                    debug!(address = %self.inner.address, "connecting");
                }
                Err(e) => {
                    warn!(address = %self.inner.address, error = %e, "transport failed to open");
                    notices.push(Notice::Error(e.into()));
                }
            }
        }
        self.inner.notify(notices);
    }

    /// Gracefully end the session.
    ///
    /// With an established session a DISCONNECT carrying a fresh receipt id
    /// is written and the transport is closed when the matching RECEIPT
    /// arrives. Without one, any live transport is closed immediately.
    /// Queued frames are kept for the next session.
    pub fn disconnect(&self) {
        let mut notices = Vec::new();
        {
            let mut guard = self.inner.lock();
            let s = &mut *guard;
            match s.state {
                ConnectionState::Offline | ConnectionState::Disconnecting => {
                    trace!(state = ?s.state, "disconnect ignored");
                }
                ConnectionState::Connecting | ConnectionState::AwaitingHandshake => {
                    debug!(state = ?s.state, "no session established; closing transport");
                    self.inner.teardown(s, true);
                    notices.push(Notice::Disconnected(None));
                }
                ConnectionState::Established => {
                    let receipt = self.inner.next_id("receipt");
                    let frame = ClientFrame::new(ClientCommand::Disconnect)
                        .header(Header::Receipt(receipt.clone()));
                    match s.transport.as_mut().map(|t| t.write_text(&frame.to_wire())) {
                        Some(Ok(())) => {
                            debug!(%receipt, "DISCONNECT sent; awaiting receipt");
                            s.state = ConnectionState::Disconnecting;
                            s.disconnect_receipt = Some(receipt);
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "DISCONNECT write failed; closing transport");
                            self.inner.teardown(s, true);
                            notices.push(Notice::Disconnected(Some(e.into())));
                        }
                        None => {
                            self.inner.teardown(s, false);
                            notices.push(Notice::Disconnected(None));
                        }
                    }
                }
            }
        }
        self.inner.notify(notices);
    }

    /// Close the transport immediately, without the DISCONNECT/RECEIPT
    /// exchange. Queued frames are kept.
    pub fn close(&self) {
        let mut notices = Vec::new();
        {
            let mut guard = self.inner.lock();
            let s = &mut *guard;
            if s.transport.is_some() {
                debug!(state = ?s.state, "closing transport");
                self.inner.teardown(s, true);
                notices.push(Notice::Disconnected(None));
            }
        }
        self.inner.notify(notices);
    }

    /// Publish `payload` as JSON to `destination`.
    ///
    /// The frame is written at once when a session is established and
    /// queued otherwise (`on_frame_queued` fires). An encoding failure is
    /// returned and also reported to the listener; nothing is queued.
    pub fn send<T: Serialize + ?Sized>(
        &self,
        destination: &str,
        payload: &T,
        headers: &[(&str, &str)],
    ) -> Result<(), StompError> {
        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(e) => {
                let err = StompError::from(e);
                warn!(%destination, error = %err, "payload could not be encoded");
                self.inner.notify(vec![Notice::Error(err.clone())]);
                return Err(err);
            }
        };
        let frame = ClientFrame::new(ClientCommand::Send)
            .headers(custom_headers(headers))
            .header(Header::Destination(destination.to_string()))
            .header(Header::ContentType(JSON_CONTENT_TYPE.to_string()))
            .header(Header::ContentLength(body.len()))
            .set_body(body);
        self.dispatch(frame);
        Ok(())
    }

    /// Subscribe to `destination` and return the new subscription id.
    ///
    /// The id is returned whatever the connection state; an unsent SUBSCRIBE
    /// is replayed with the rest of the queue on the next handshake.
    pub fn subscribe(&self, destination: &str, headers: &[(&str, &str)]) -> String {
        let id = self.inner.next_id("sub");
        let frame = ClientFrame::new(ClientCommand::Subscribe)
            .headers(custom_headers(headers))
            .header(Header::SubscriptionId(id.clone()))
            .header(Header::Destination(destination.to_string()))
            .header(Header::Ack(self.inner.options.ack_mode.as_str().to_string()));
        self.dispatch(frame);
        id
    }

    /// Cancel the subscription with id `subscription_id`.
    pub fn unsubscribe(&self, subscription_id: &str) {
        let frame = ClientFrame::new(ClientCommand::Unsubscribe)
            .header(Header::SubscriptionId(subscription_id.to_string()));
        self.dispatch(frame);
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Whether a transport exists and reports itself open.
    pub fn is_connected(&self) -> bool {
        self.inner
            .lock()
            .transport
            .as_ref()
            .is_some_and(|t| t.is_open())
    }

    pub fn is_established(&self) -> bool {
        self.state() == ConnectionState::Established
    }

    /// Number of frames waiting for the next established session.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Details of the current session, once CONNECTED has been received.
    pub fn server_info(&self) -> Option<ServerInfo> {
        self.inner.lock().server.clone()
    }

    pub fn address(&self) -> &str {
        &self.inner.address
    }

    pub fn downgrade(&self) -> WeakStompClient<C> {
        WeakStompClient {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn dispatch(&self, frame: ClientFrame) {
        let mut notices = Vec::new();
        {
            let mut guard = self.inner.lock();
            self.inner.transmit(&mut guard, frame, &mut notices);
        }
        self.inner.notify(notices);
    }

    fn event_target(&self) -> Weak<dyn EventTarget> {
        let strong: Arc<dyn EventTarget> = self.inner.clone();
        Arc::downgrade(&strong)
    }
}

impl<C: Connector> fmt::Debug for StompClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StompClient")
            .field("address", &self.inner.address)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Inner<C> {
    fn lock(&self) -> MutexGuard<'_, Session<C::Transport>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn notify(&self, notices: Vec<Notice>) {
        for notice in notices {
            match notice {
                Notice::Connected => self.listener.on_connected(),
                Notice::Message {
                    destination,
                    body,
                    headers,
                } => self.listener.on_message(&destination, body, &headers),
                Notice::FrameQueued(frame) => self.listener.on_frame_queued(&frame),
                Notice::Error(err) => self.listener.on_error(&err),
                Notice::Disconnected(err) => self.listener.on_disconnected(err.as_ref()),
            }
        }
    }

    /// Write `frame` if the session is established and nothing is queued
    /// ahead of it; otherwise append it to the queue.
    fn transmit(&self, s: &mut Session<C::Transport>, frame: ClientFrame, notices: &mut Vec<Notice>) {
        if s.state == ConnectionState::Established && s.queue.is_empty() {
            if let Some(transport) = s.transport.as_mut() {
                match transport.write_text(&frame.to_wire()) {
                    Ok(()) => {
                        trace!(command = %frame.command(), "frame written");
                        return;
                    }
                    Err(e) => {
                        warn!(command = %frame.command(), error = %e, "write failed; queueing frame");
                        notices.push(Notice::Error(e.into()));
                    }
                }
            }
        }
        s.queue.enqueue(frame.clone());
        debug!(command = %frame.command(), pending = s.queue.len(), "frame queued");
        notices.push(Notice::FrameQueued(frame));
    }

    /// Write an ACK on the live session. An ACK is never queued: its id is
    /// only valid on the session that delivered the MESSAGE, and the broker
    /// redelivers whatever goes unacknowledged.
    fn acknowledge(&self, s: &mut Session<C::Transport>, ack: ClientFrame, notices: &mut Vec<Notice>) {
        let transport = match s.transport.as_mut() {
            Some(transport) if s.state == ConnectionState::Established => transport,
            _ => {
                warn!(state = ?s.state, "no established session; ACK dropped");
                return;
            }
        };
        match transport.write_text(&ack.to_wire()) {
            Ok(()) => trace!("ACK written"),
            Err(e) => {
                warn!(error = %e, "ACK write failed; dropped");
                notices.push(Notice::Error(e.into()));
            }
        }
    }

    /// Write queued frames in order until the queue is empty or a write
    /// fails. A frame leaves the queue only after its write succeeded.
    fn flush_queue(&self, s: &mut Session<C::Transport>, notices: &mut Vec<Notice>) {
        let Session {
            queue, transport, ..
        } = s;
        let Some(transport) = transport.as_mut() else {
            return;
        };
        let mut flushed = 0usize;
        while let Some(frame) = queue.front() {
            if let Err(e) = transport.write_text(&frame.to_wire()) {
                warn!(error = %e, remaining = queue.len(), "flush interrupted");
                notices.push(Notice::Error(e.into()));
                break;
            }
            queue.dequeue();
            flushed += 1;
        }
        if flushed > 0 {
            debug!(flushed, "queued frames flushed");
        }
    }

    /// Drop the transport (closing it first if `close`) and return to
    /// `Offline`. The queue is left intact.
    fn teardown(&self, s: &mut Session<C::Transport>, close: bool) {
        if let Some(mut transport) = s.transport.take() {
            if close {
                transport.close();
            }
        }
        s.state = ConnectionState::Offline;
        s.disconnect_receipt = None;
        s.server = None;
        s.generation += 1;
        debug!(pending = s.queue.len(), "offline");
    }

    fn connect_frame(&self) -> ClientFrame {
        let o = &self.options;
        let mut frame = ClientFrame::new(ClientCommand::Connect)
            .headers(o.headers.iter().map(|(k, v)| Header::custom(k, v)))
            .header(Header::AcceptVersion(
                o.accept_version
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ACCEPT_VERSION.to_string()),
            ))
            .header(Header::Host(
                o.host
                    .clone()
                    .unwrap_or_else(|| host_from_address(&self.address)),
            ))
            .header(Header::HeartBeat(o.heartbeat.to_string()));
        if let Some(login) = &o.login {
            frame = frame.header(Header::Login(login.clone()));
        }
        if let Some(passcode) = &o.passcode {
            frame = frame.header(Header::Passcode(passcode.clone()));
        }
        frame
    }

    fn on_opened(&self, s: &mut Session<C::Transport>, notices: &mut Vec<Notice>) {
        if s.state != ConnectionState::Connecting {
            trace!(state = ?s.state, "ignoring duplicate open event");
            return;
        }
        let frame = self.connect_frame();
        let Some(transport) = s.transport.as_mut() else {
            return;
        };
        match transport.write_text(&frame.to_wire()) {
            Ok(()) => {
                s.state = ConnectionState::AwaitingHandshake;
                debug!("CONNECT sent; awaiting CONNECTED");
            }
            Err(e) => {
                warn!(error = %e, "CONNECT write failed; closing transport");
                self.teardown(s, true);
                notices.push(Notice::Disconnected(Some(e.into())));
            }
        }
    }

    fn on_text(&self, s: &mut Session<C::Transport>, text: &str, notices: &mut Vec<Notice>) {
        if s.state == ConnectionState::Connecting {
            trace!("ignoring text received before open");
            return;
        }
        match parse_server_frame(text) {
            Ok(StompItem::Heartbeat) => {
                trace!("heartbeat received");
                if let Some(transport) = s.transport.as_mut() {
                    if let Err(e) = transport.write_text(HEARTBEAT) {
                        warn!(error = %e, "heartbeat reply failed");
                        notices.push(Notice::Error(e.into()));
                    }
                }
            }
            Ok(StompItem::Frame(frame)) => self.on_frame(s, frame, notices),
            Err(e) => {
                warn!(error = %e, "discarding unparseable frame");
                notices.push(Notice::Error(e.into()));
            }
        }
    }

    fn on_frame(&self, s: &mut Session<C::Transport>, frame: ServerFrame, notices: &mut Vec<Notice>) {
        match frame.command() {
            ServerCommand::Connected => {
                if s.state != ConnectionState::AwaitingHandshake {
                    warn!(state = ?s.state, "unexpected CONNECTED frame ignored");
                    return;
                }
                let info = self.server_info(&frame);
                debug!(version = ?info.version, session = ?info.session, "session established");
                s.server = Some(info);
                s.state = ConnectionState::Established;
                self.flush_queue(s, notices);
                notices.push(Notice::Connected);
            }
            ServerCommand::Message => self.on_message(s, frame, notices),
            ServerCommand::Receipt => {
                let receipt_id = frame.get_header("receipt-id");
                if receipt_id.is_some() && receipt_id == s.disconnect_receipt {
                    debug!(receipt = ?receipt_id, "disconnect confirmed; closing transport");
                    self.teardown(s, true);
                    notices.push(Notice::Disconnected(None));
                } else {
                    trace!(receipt = ?receipt_id, "ignoring receipt");
                }
            }
            ServerCommand::Error => {
                let err = ServerError::from_frame(frame);
                warn!(message = %err.message, "server sent ERROR frame");
                notices.push(Notice::Error(StompError::Server(err)));
            }
        }
    }

    fn on_message(&self, s: &mut Session<C::Transport>, frame: ServerFrame, notices: &mut Vec<Notice>) {
        let destination = frame.get_header("destination").unwrap_or_default();

        if self.options.ack_mode != AckMode::Auto {
            match frame
                .get_header("ack")
                .or_else(|| frame.get_header("message-id"))
            {
                Some(ack_id) => {
                    let mut ack =
                        ClientFrame::new(ClientCommand::Ack).header(Header::SubscriptionId(ack_id));
                    if let Some(subscription) = frame.get_header("subscription") {
                        ack = ack.header(Header::Subscription(subscription));
                    }
                    if let Some(message_id) = frame.get_header("message-id") {
                        ack = ack.header(Header::MessageId(message_id));
                    }
                    self.acknowledge(s, ack, notices);
                }
                None => warn!(%destination, "MESSAGE without ack or message-id; not acknowledged"),
            }
        }

        let body = if frame.body().trim().is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(frame.body())
        };
        match body {
            Ok(body) => notices.push(Notice::Message {
                destination,
                body,
                headers: frame.headers().clone(),
            }),
            Err(e) => {
                warn!(%destination, error = %e, "MESSAGE body is not valid JSON");
                notices.push(Notice::Error(e.into()));
            }
        }
    }

    fn server_info(&self, frame: &ServerFrame) -> ServerInfo {
        let (server_out, server_in) = frame
            .get_header("heart-beat")
            .map(|v| parse_heartbeat_header(&v))
            .unwrap_or((0, 0));
        ServerInfo {
            version: frame.get_header("version"),
            session: frame.get_header("session"),
            server: frame.get_header("server"),
            heartbeat: negotiate_heartbeats(self.options.heartbeat, server_out, server_in),
        }
    }
}

impl<C: Connector> EventTarget for Inner<C> {
    fn handle_event(&self, session: u64, event: TransportEvent) {
        let mut notices = Vec::new();
        {
            let mut guard = self.lock();
            let s = &mut *guard;
            if s.generation != session || s.transport.is_none() {
                trace!(session, current = s.generation, "discarding event from stale transport");
                return;
            }
            match event {
                TransportEvent::Opened => self.on_opened(s, &mut notices),
                TransportEvent::Closed(error) => {
                    debug!(state = ?s.state, error = ?error, "transport closed");
                    self.teardown(s, false);
                    notices.push(Notice::Disconnected(error.map(StompError::from)));
                }
                TransportEvent::Text(text) => self.on_text(s, &text, &mut notices),
            }
        }
        self.notify(notices);
    }
}
