// Text-based STOMP server frame parser.
use tracing::trace;

use crate::error::FrameError;
use crate::frame::{ServerCommand, ServerFrame};
use crate::header::{Header, Headers};

/// Result of parsing one inbound text message.
///
/// A `StompItem` is either a decoded `ServerFrame` or a `Heartbeat` marker
/// for a message made only of line breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StompItem {
    /// A decoded STOMP frame (command + headers + body)
    Frame(ServerFrame),
    /// A heartbeat pulse (no frame)
    Heartbeat,
}

/// Unescape a STOMP header name or value.
///
/// Recognized sequences are `\\`, `\r`, `\n` and `\c`; anything else after
/// a backslash is an error.
pub fn unescape_header_value(input: &str) -> Result<String, String> {
    if !input.contains('\\') {
        return Ok(input.to_string());
    }
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            Some(other) => return Err(format!("undefined escape sequence '\\{}'", other)),
            None => return Err("incomplete escape sequence at end of input".to_string()),
        }
    }
    Ok(out)
}

/// Split off the next line (without its LF and optional trailing CR).
/// Returns `(line, rest)`; when no LF is present the whole input is the line.
fn next_line(input: &str) -> (&str, &str) {
    let (line, rest) = match input.find('\n') {
        Some(i) => (&input[..i], &input[i + 1..]),
        None => (input, ""),
    };
    (line.strip_suffix('\r').unwrap_or(line), rest)
}

/// Parse one inbound text message into a `StompItem`.
///
/// Leading line breaks are skipped; if nothing else remains the message is a
/// heartbeat. Otherwise the first line must be a server command, followed by
/// `name:value` header lines up to the first blank line. Header lines
/// without a colon are skipped. When a header repeats, the first occurrence
/// is kept. The body runs for `content-length` bytes when that header is
/// present, else up to the first NUL.
pub fn parse_server_frame(text: &str) -> Result<StompItem, FrameError> {
    let rest = text.trim_start_matches(['\n', '\r']);
    if rest.is_empty() {
        return Ok(StompItem::Heartbeat);
    }

    let (command_line, mut rest) = next_line(rest);
    let command_line = command_line.trim_end_matches('\0');
    if command_line.is_empty() {
        return Err(FrameError::MissingCommand);
    }
    let command = ServerCommand::parse(command_line)?;
    // CONNECTED frames are exempt from escaping.
    let unescape = command != ServerCommand::Connected;

    let mut headers = Headers::new();
    while !rest.is_empty() {
        let (line, after) = next_line(rest);
        rest = after;
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            trace!(line, "skipping header line without colon");
            continue;
        };
        let (name, value) = if unescape {
            let name = unescape_header_value(name).map_err(|e| FrameError::malformed(name, e))?;
            let value =
                unescape_header_value(value).map_err(|e| FrameError::malformed(&name, e))?;
            (name, value)
        } else {
            (name.to_string(), value.to_string())
        };
        if headers.contains(&name) {
            continue;
        }
        headers.insert(Header::parse(&name, &value)?);
    }

    let body = match headers.content_length() {
        Some(len) => {
            if len > rest.len() || !rest.is_char_boundary(len) {
                return Err(FrameError::malformed(
                    "content-length",
                    format!("declared {} bytes but body has {}", len, rest.len()),
                ));
            }
            &rest[..len]
        }
        None => match rest.find('\0') {
            Some(nul) => &rest[..nul],
            None => rest,
        },
    };

    Ok(StompItem::Frame(ServerFrame::new(command, headers, body)))
}
