use std::fmt;

use crate::error::FrameError;
use crate::header::{Header, Headers};

/// Commands a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientCommand {
    Connect,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Disconnect,
}

impl ClientCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientCommand::Connect => "CONNECT",
            ClientCommand::Send => "SEND",
            ClientCommand::Subscribe => "SUBSCRIBE",
            ClientCommand::Unsubscribe => "UNSUBSCRIBE",
            ClientCommand::Ack => "ACK",
            ClientCommand::Disconnect => "DISCONNECT",
        }
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands a server may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerCommand {
    Connected,
    Message,
    Receipt,
    Error,
}

impl ServerCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerCommand::Connected => "CONNECTED",
            ServerCommand::Message => "MESSAGE",
            ServerCommand::Receipt => "RECEIPT",
            ServerCommand::Error => "ERROR",
        }
    }

    /// Parse a command token, failing with `UnknownCommand` for anything
    /// outside the server command set.
    pub fn parse(token: &str) -> Result<ServerCommand, FrameError> {
        match token {
            "CONNECTED" => Ok(ServerCommand::Connected),
            "MESSAGE" => Ok(ServerCommand::Message),
            "RECEIPT" => Ok(ServerCommand::Receipt),
            "ERROR" => Ok(ServerCommand::Error),
            other => Err(FrameError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for ServerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Escape a header name or value for the wire.
///
/// STOMP 1.2 escapes backslash, carriage return, line feed and colon.
pub(crate) fn escape_header_value(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\r' => result.push_str("\\r"),
            '\n' => result.push_str("\\n"),
            ':' => result.push_str("\\c"),
            _ => result.push(ch),
        }
    }
    result
}

/// One outbound protocol unit.
///
/// A `ClientFrame` is assembled with the builder methods and is not modified
/// after it has been handed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFrame {
    command: ClientCommand,
    headers: Headers,
    body: String,
}

impl ClientFrame {
    /// Create a new frame with the given command and empty headers/body.
    pub fn new(command: ClientCommand) -> Self {
        Self {
            command,
            headers: Headers::new(),
            body: String::new(),
        }
    }

    /// Add a header (builder style). A header with the same name replaces
    /// the earlier one.
    pub fn header(mut self, header: Header) -> Self {
        self.headers.insert(header);
        self
    }

    /// Add several headers (builder style).
    pub fn headers(mut self, headers: impl IntoIterator<Item = Header>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Set the frame body (builder style).
    pub fn set_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn command(&self) -> ClientCommand {
        self.command
    }

    pub fn header_set(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Get a header value by name.
    pub fn get_header(&self, name: &str) -> Option<String> {
        self.headers.get(name).map(|v| v.into_owned())
    }

    /// Serialize to the wire format: command line, one `name:value` line per
    /// header in insertion order, a blank line, the body and a NUL.
    ///
    /// CONNECT headers are written verbatim; every other command escapes
    /// header names and values.
    pub fn to_wire(&self) -> String {
        let escape = self.command != ClientCommand::Connect;
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for header in &self.headers {
            let value = header.value();
            if escape {
                out.push_str(&escape_header_value(header.name()));
                out.push(':');
                out.push_str(&escape_header_value(&value));
            } else {
                out.push_str(header.name());
                out.push(':');
                out.push_str(&value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

impl fmt::Display for ClientFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Command: {}", self.command)?;
        for header in &self.headers {
            writeln!(f, "{}", header)?;
        }
        writeln!(f, "Body ({} bytes)", self.body.len())
    }
}

/// One inbound protocol unit, produced by `parse_server_frame`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerFrame {
    command: ServerCommand,
    headers: Headers,
    body: String,
}

impl ServerFrame {
    pub fn new(command: ServerCommand, headers: Headers, body: impl Into<String>) -> Self {
        Self {
            command,
            headers,
            body: body.into(),
        }
    }

    pub fn command(&self) -> ServerCommand {
        self.command
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Get a header value by name.
    pub fn get_header(&self, name: &str) -> Option<String> {
        self.headers.get(name).map(|v| v.into_owned())
    }
}

impl fmt::Display for ServerFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Command: {}", self.command)?;
        for header in &self.headers {
            writeln!(f, "{}", header)?;
        }
        writeln!(f, "Body ({} bytes)", self.body.len())
    }
}

/// A server-reported error, built from an ERROR frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// The `message` header, or `"unknown error"` when absent.
    pub message: String,
    /// The frame body, if any.
    pub body: Option<String>,
    /// The `receipt-id` header, when the error relates to a receipted frame.
    pub receipt_id: Option<String>,
    /// The original ERROR frame.
    pub frame: ServerFrame,
}

impl ServerError {
    pub fn from_frame(frame: ServerFrame) -> Self {
        let message = frame
            .get_header("message")
            .unwrap_or_else(|| "unknown error".to_string());
        let body = if frame.body().is_empty() {
            None
        } else {
            Some(frame.body().to_string())
        };
        let receipt_id = frame.get_header("receipt-id");
        Self {
            message,
            body,
            receipt_id,
            frame,
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "STOMP server error: {}", self.message)?;
        if let Some(body) = &self.body {
            write!(f, "\n{}", body)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServerError {}
