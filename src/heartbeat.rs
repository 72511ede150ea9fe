use std::fmt;
use std::time::Duration;

/// Heartbeat intervals proposed in the CONNECT `heart-beat` header.
///
/// `send_ms` is how often the client promises to send heartbeats and
/// `receive_ms` how often it wants to receive them; `0` disables a
/// direction. The engine only proposes and negotiates these values;
/// liveness monitoring is left to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub send_ms: u64,
    pub receive_ms: u64,
}

impl Heartbeat {
    pub const fn new(send_ms: u64, receive_ms: u64) -> Self {
        Self {
            send_ms,
            receive_ms,
        }
    }

    /// No heartbeats in either direction (`0,0`).
    pub const fn disabled() -> Self {
        Self::new(0, 0)
    }

    /// The same interval in both directions.
    pub fn from_duration(interval: Duration) -> Self {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        Self::new(ms, ms)
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(10_000, 10_000)
    }
}

impl fmt::Display for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.send_ms, self.receive_ms)
    }
}

/// Parse the STOMP `heart-beat` header value (format: "cx,cy").
///
/// Returns `(cx, cy)` in milliseconds. Missing or invalid fields default
/// to `0`.
pub fn parse_heartbeat_header(header: &str) -> (u64, u64) {
    let mut parts = header.split(',');
    let cx = parts
        .next()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let cy = parts
        .next()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    (cx, cy)
}

/// Negotiate heartbeat intervals between client and server.
///
/// Returns `(outgoing, incoming)`, each `None` when disabled in that
/// direction. A direction is enabled only when both sides ask for it; the
/// interval is then the larger of the two values.
pub fn negotiate_heartbeats(
    client: Heartbeat,
    server_out: u64,
    server_in: u64,
) -> (Option<Duration>, Option<Duration>) {
    let pick = |ours: u64, theirs: u64| {
        if ours == 0 || theirs == 0 {
            None
        } else {
            Some(Duration::from_millis(ours.max(theirs)))
        }
    };
    (
        pick(client.send_ms, server_in),
        pick(client.receive_ms, server_out),
    )
}
