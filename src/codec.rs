use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// The text message a heartbeat is delivered as.
pub const HEARTBEAT: &str = "\n";

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// `StompCodec` splits a STOMP byte stream into whole text messages, one per
/// frame, so a stream transport can hand the client the same unit a
/// message-oriented transport would.
///
/// Responsibilities:
/// - Decode a single LF (or CRLF) as the heartbeat message `"\n"`.
/// - Decode a frame as its complete text including the trailing NUL,
///   honouring `content-length` when present.
/// - Encode text messages verbatim.
#[derive(Debug, Default)]
pub struct StompCodec {}

impl StompCodec {
    pub fn new() -> Self {
        Self {}
    }
}

/// Length of the frame at the start of `buf`, including its NUL terminator.
///
/// Returns `Ok(None)` when more bytes are needed.
fn frame_extent(buf: &[u8]) -> io::Result<Option<usize>> {
    let mut pos = 0usize;
    let mut content_length: Option<usize> = None;
    let mut content_length_seen = false;
    let mut command_line = true;

    loop {
        let lf = buf[pos..].iter().position(|&b| b == b'\n');
        if command_line {
            // A NUL before the first LF ends a frame with no header block.
            let nul = buf.iter().position(|&b| b == 0);
            match (nul, lf) {
                (Some(n), Some(l)) if n < l => return Ok(Some(n + 1)),
                (Some(n), None) => return Ok(Some(n + 1)),
                _ => {}
            }
        }
        let Some(rel) = lf else {
            return Ok(None);
        };
        let mut line = &buf[pos..pos + rel];
        if let [rest @ .., b'\r'] = line {
            line = rest;
        }
        pos += rel + 1;

        if command_line {
            command_line = false;
            continue;
        }
        if line.is_empty() {
            break;
        }
        if !content_length_seen {
            if let Some(value) = line.strip_prefix(b"content-length:") {
                content_length_seen = true;
                // an unreadable length frames to the NUL; the parser reports it
                content_length = std::str::from_utf8(value)
                    .ok()
                    .and_then(|text| text.trim().parse::<usize>().ok());
                if content_length.is_none() {
                    trace!("unreadable content-length; scanning for NUL");
                }
            }
        }
    }

    match content_length {
        Some(n) => {
            let end = pos
                .checked_add(n)
                .ok_or_else(|| invalid(format!("content-length {} too large", n)))?;
            if buf.len() <= end {
                return Ok(None);
            }
            if buf[end] != 0 {
                return Err(invalid("missing NUL terminator after content-length body"));
            }
            Ok(Some(end + 1))
        }
        None => Ok(buf[pos..]
            .iter()
            .position(|&b| b == 0)
            .map(|nul| pos + nul + 1)),
    }
}

impl Decoder for StompCodec {
    type Item = String;
    type Error = io::Error;

    /// Decode the next text message from `src`.
    ///
    /// Returns `Ok(None)` and leaves `src` untouched when the buffered bytes
    /// do not yet hold a complete frame.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.first() == Some(&b'\n') {
            src.advance(1);
            return Ok(Some(HEARTBEAT.to_string()));
        }
        if src.starts_with(b"\r\n") {
            src.advance(2);
            return Ok(Some(HEARTBEAT.to_string()));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let Some(len) = frame_extent(&src[..])? else {
            return Ok(None);
        };
        let bytes = src.split_to(len);
        // optional EOL after the NUL belongs to the frame
        if src.first() == Some(&b'\n') {
            src.advance(1);
        }

        String::from_utf8(bytes.to_vec())
            .map(Some)
            .map_err(|e| invalid(format!("invalid utf8 in frame: {}", e)))
    }
}

impl Encoder<String> for StompCodec {
    type Error = io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        dst.put_slice(item.as_bytes());
        Ok(())
    }
}
