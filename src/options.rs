use crate::heartbeat::Heartbeat;

/// Protocol versions offered in CONNECT unless overridden.
pub const DEFAULT_ACCEPT_VERSION: &str = "1.1,1.2";

/// Subscription acknowledgement modes as defined by STOMP 1.2.
///
/// With `Client` or `ClientIndividual` the client acknowledges every
/// MESSAGE automatically as soon as it is received; with `Auto` the broker
/// considers messages delivered on send and no ACK is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckMode {
    Auto,
    Client,
    #[default]
    ClientIndividual,
}

impl AckMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AckMode::Auto => "auto",
            AckMode::Client => "client",
            AckMode::ClientIndividual => "client-individual",
        }
    }
}

/// Options applied to every CONNECT frame and subscription of a client.
///
/// # Example
///
/// ```
/// use stomp_relay::{AckMode, ConnectOptions, Heartbeat};
///
/// let options = ConnectOptions::new()
///     .host("/production")
///     .login("guest")
///     .passcode("guest")
///     .heartbeat(Heartbeat::new(5000, 5000))
///     .ack_mode(AckMode::Client);
/// assert_eq!(options.host.as_deref(), Some("/production"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// `accept-version` header; `None` sends `DEFAULT_ACCEPT_VERSION`.
    pub accept_version: Option<String>,
    /// `host` header; `None` uses the host part of the target address.
    pub host: Option<String>,
    /// `login` header, passed through unchanged.
    pub login: Option<String>,
    /// `passcode` header, passed through unchanged.
    pub passcode: Option<String>,
    /// Proposed `heart-beat` intervals.
    pub heartbeat: Heartbeat,
    /// Acknowledgement mode requested in SUBSCRIBE.
    pub ack_mode: AckMode,
    /// Extra CONNECT headers. Protocol headers set by the client take
    /// precedence over entries with the same name.
    pub headers: Vec<(String, String)>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_version(mut self, versions: impl Into<String>) -> Self {
        self.accept_version = Some(versions.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    pub fn passcode(mut self, passcode: impl Into<String>) -> Self {
        self.passcode = Some(passcode.into());
        self
    }

    pub fn heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn ack_mode(mut self, ack_mode: AckMode) -> Self {
        self.ack_mode = ack_mode;
        self
    }

    /// Add a custom CONNECT header (builder style).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Host part of a target address, used as the default `host` header.
///
/// Accepts `host:port`, `[v6]:port` and URL forms such as
/// `ws://host:port/path`.
pub(crate) fn host_from_address(address: &str) -> String {
    let without_scheme = address
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(address);
    let authority = without_scheme.split('/').next().unwrap_or(without_scheme);
    let authority = authority
        .rsplit_once('@')
        .map(|(_, host)| host)
        .unwrap_or(authority);

    if let Some(v6) = authority.strip_prefix('[') {
        return v6.split(']').next().unwrap_or(v6).to_string();
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host.to_string(),
        _ => authority.to_string(),
    }
}
