//! Application-side reconnect policy.
//!
//! `StompClient` never reconnects on its own. `ReconnectPolicy` sits between
//! the client and the application's listener, watches the notifications
//! that flow through it and drives `connect`/`disconnect` on timers:
//!
//! - while `Active`, a queued frame, an error or a disconnect while offline
//!   schedules one `connect()` after the current backoff, which doubles up
//!   to `max_delay` and resets once a session is established;
//! - `pause()` cancels pending retries and disconnects, and a session that
//!   comes up while paused is disconnected after `paused_grace`;
//! - `resume()` reconnects immediately.
//!
//! ```no_run
//! use std::sync::Arc;
//! use stomp_relay::{NoopListener, ReconnectConfig, ReconnectPolicy, StompClient, TcpConnector};
//!
//! # async fn run() {
//! let policy = ReconnectPolicy::<TcpConnector>::new(Arc::new(NoopListener), ReconnectConfig::default());
//! let client = StompClient::new("127.0.0.1:61613", TcpConnector::new(), policy.clone());
//! policy.attach(&client);
//! client.connect();
//! # }
//! ```

use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::client::{ConnectionState, StompClient, WeakStompClient};
use crate::error::StompError;
use crate::frame::ClientFrame;
use crate::header::Headers;
use crate::listener::StompListener;
use crate::transport::Connector;

/// Timing of a `ReconnectPolicy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// First retry delay, and the delay after a successful session.
    pub initial_delay: Duration,
    /// Upper bound of the doubling backoff.
    pub max_delay: Duration,
    /// How long a session that comes up while paused is kept before it is
    /// disconnected.
    pub paused_grace: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            paused_grace: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    Active,
    Paused,
}

struct PolicyInner {
    mode: PolicyState,
    backoff: Duration,
    timer: Option<JoinHandle<()>>,
}

impl PolicyInner {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn timer_pending(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }
}

/// Reconnect driver that also acts as the client's `StompListener`,
/// forwarding every notification to the wrapped application listener.
pub struct ReconnectPolicy<C: Connector> {
    me: Weak<ReconnectPolicy<C>>,
    listener: Arc<dyn StompListener>,
    config: ReconnectConfig,
    client: OnceLock<WeakStompClient<C>>,
    inner: Mutex<PolicyInner>,
}

fn spawn_after<F>(delay: Duration, f: F) -> Option<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        })),
        Err(_) => {
            warn!("no tokio runtime available; reconnect timer not scheduled");
            None
        }
    }
}

impl<C: Connector> ReconnectPolicy<C> {
    /// Create an `Active` policy wrapping `listener`. Register the returned
    /// value as the client's listener, then call `attach`.
    pub fn new(listener: Arc<dyn StompListener>, config: ReconnectConfig) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            listener,
            config,
            client: OnceLock::new(),
            inner: Mutex::new(PolicyInner {
                mode: PolicyState::Active,
                backoff: config.initial_delay,
                timer: None,
            }),
        })
    }

    /// Bind the policy to the client it drives. Only the first call has an
    /// effect; the policy keeps a non-owning handle.
    pub fn attach(&self, client: &StompClient<C>) {
        if self.client.set(client.downgrade()).is_err() {
            warn!("reconnect policy already attached; ignoring");
        }
    }

    pub fn state(&self) -> PolicyState {
        self.lock().mode
    }

    /// Delay the next scheduled retry will wait.
    pub fn current_backoff(&self) -> Duration {
        self.lock().backoff
    }

    /// Whether a retry or grace timer is outstanding.
    pub fn timer_pending(&self) -> bool {
        self.lock().timer_pending()
    }

    /// Stop reconnecting and disconnect the client if it has a transport.
    pub fn pause(&self) {
        {
            let mut inner = self.lock();
            inner.mode = PolicyState::Paused;
            inner.cancel_timer();
        }
        debug!("reconnect policy paused");
        if let Some(client) = self.client() {
            if client.state() != ConnectionState::Offline {
                client.disconnect();
            }
        }
    }

    /// Resume reconnecting and connect at once if the client is offline.
    pub fn resume(&self) {
        {
            let mut inner = self.lock();
            inner.mode = PolicyState::Active;
            inner.cancel_timer();
            inner.backoff = self.config.initial_delay;
        }
        debug!("reconnect policy resumed");
        if let Some(client) = self.client() {
            if client.state() == ConnectionState::Offline {
                client.connect();
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, PolicyInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn client(&self) -> Option<StompClient<C>> {
        self.client.get().and_then(WeakStompClient::upgrade)
    }

    fn client_offline(&self) -> bool {
        self.client()
            .is_some_and(|c| c.state() == ConnectionState::Offline)
    }

    fn schedule_retry(&self) {
        if !self.client_offline() {
            return;
        }
        let mut inner = self.lock();
        if inner.mode != PolicyState::Active {
            return;
        }
        if inner.timer_pending() {
            trace!("retry already scheduled");
            return;
        }
        let delay = inner.backoff;
        inner.backoff = (delay * 2).min(self.config.max_delay);
        debug!(?delay, "reconnect scheduled");
        let me = self.me.clone();
        inner.timer = spawn_after(delay, move || {
            if let Some(policy) = me.upgrade() {
                policy.fire_retry();
            }
        });
    }

    fn fire_retry(&self) {
        {
            let mut inner = self.lock();
            // dropped without abort so a failure inside connect() can
            // schedule the next attempt
            inner.timer = None;
            if inner.mode != PolicyState::Active {
                return;
            }
        }
        if let Some(client) = self.client() {
            if client.state() == ConnectionState::Offline {
                debug!(address = %client.address(), "reconnecting");
                client.connect();
            }
        }
    }

    fn schedule_grace_disconnect(&self) {
        let mut inner = self.lock();
        if inner.mode != PolicyState::Paused {
            return;
        }
        inner.cancel_timer();
        let grace = self.config.paused_grace;
        debug!(?grace, "connected while paused; disconnect scheduled");
        let me = self.me.clone();
        inner.timer = spawn_after(grace, move || {
            if let Some(policy) = me.upgrade() {
                policy.fire_grace_disconnect();
            }
        });
    }

    fn fire_grace_disconnect(&self) {
        {
            let mut inner = self.lock();
            inner.timer = None;
            if inner.mode != PolicyState::Paused {
                return;
            }
        }
        if let Some(client) = self.client() {
            client.disconnect();
        }
    }
}

impl<C: Connector> StompListener for ReconnectPolicy<C> {
    fn on_connected(&self) {
        self.lock().backoff = self.config.initial_delay;
        self.listener.on_connected();
        self.schedule_grace_disconnect();
    }

    fn on_message(&self, destination: &str, body: Value, headers: &Headers) {
        self.listener.on_message(destination, body, headers);
    }

    fn on_frame_queued(&self, frame: &ClientFrame) {
        self.listener.on_frame_queued(frame);
        self.schedule_retry();
    }

    fn on_error(&self, error: &StompError) {
        self.listener.on_error(error);
        self.schedule_retry();
    }

    fn on_disconnected(&self, error: Option<&StompError>) {
        self.listener.on_disconnected(error);
        self.schedule_retry();
    }
}

impl<C: Connector> fmt::Debug for ReconnectPolicy<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ReconnectPolicy")
            .field("state", &inner.mode)
            .field("backoff", &inner.backoff)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Drop for ReconnectPolicy<C> {
    fn drop(&mut self) {
        self.inner
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel_timer();
    }
}
