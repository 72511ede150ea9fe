//! TCP transport driven by a tokio task.
//!
//! The task owns the socket, frames it with `StompCodec`, forwards each
//! inbound frame as one text message and drains an unbounded channel of
//! outbound text, so none of the `Transport` methods touch the network.

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::codec::StompCodec;
use crate::error::TransportError;
use crate::transport::{Connector, Transport, TransportEvents};

/// Opens `TcpTransport`s on the current tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn open(&self, address: &str, events: TransportEvents) -> Result<TcpTransport, TransportError> {
        let handle = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let open = Arc::new(AtomicBool::new(false));

        handle.spawn(run_connection(
            address.to_string(),
            events,
            outbound_rx,
            shutdown_rx,
            open.clone(),
        ));

        Ok(TcpTransport {
            outbound_tx,
            shutdown_tx: Some(shutdown_tx),
            open,
        })
    }
}

/// Handle to one TCP connection task.
///
/// Dropping the handle shuts the connection down.
#[derive(Debug)]
pub struct TcpTransport {
    outbound_tx: mpsc::UnboundedSender<String>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    open: Arc<AtomicBool>,
}

impl Transport for TcpTransport {
    fn write_text(&mut self, text: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.outbound_tx
            .send(text.to_string())
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

async fn run_connection(
    addr: String,
    events: TransportEvents,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    mut shutdown_rx: oneshot::Receiver<()>,
    open: Arc<AtomicBool>,
) {
    let stream = tokio::select! {
        _ = &mut shutdown_rx => {
            debug!(%addr, "connect abandoned before completion");
            return;
        }
        res = TcpStream::connect(&addr) => match res {
            Ok(stream) => stream,
            Err(e) => {
                warn!(%addr, error = %e, "tcp connect failed");
                events.closed(Some(e.into()));
                return;
            }
        },
    };

    debug!(%addr, "tcp connection open");
    open.store(true, Ordering::SeqCst);
    events.opened();

    let (mut sink, mut stream) = Framed::new(stream, StompCodec::new()).split();

    let outcome: Option<TransportError> = loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                let _ = sink.close().await;
                break None;
            }
            maybe = outbound_rx.recv() => match maybe {
                Some(text) => {
                    if let Err(e) = sink.send(text).await {
                        break Some(e.into());
                    }
                }
                None => {
                    let _ = sink.close().await;
                    break None;
                }
            },
            item = stream.next() => match item {
                Some(Ok(text)) => events.text_received(text),
                Some(Err(e)) => break Some(e.into()),
                None => break Some(TransportError::Closed),
            },
        }
    };

    open.store(false, Ordering::SeqCst);
    match &outcome {
        Some(e) => debug!(%addr, error = %e, "tcp connection ended"),
        None => debug!(%addr, "tcp connection closed"),
    }
    events.closed(outcome);
}
