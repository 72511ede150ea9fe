use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::FrameError;

/// A single STOMP header.
///
/// Well-known headers get their own variant; anything else is carried as
/// `Custom`. Equality and hashing consider the header *name* only, so two
/// headers with the same name and different values are the same entry.
#[derive(Debug, Clone)]
pub enum Header {
    ContentLength(usize),
    ContentType(String),
    Receipt(String),
    AcceptVersion(String),
    Host(String),
    Login(String),
    Passcode(String),
    HeartBeat(String),
    Version(String),
    Session(String),
    Server(String),
    Destination(String),
    Transaction(String),
    /// The `id` header (subscription id on SUBSCRIBE/UNSUBSCRIBE, ack id on ACK).
    SubscriptionId(String),
    Ack(String),
    MessageId(String),
    Subscription(String),
    ReceiptId(String),
    Custom(String, String),
}

impl Header {
    /// Build a typed header from a wire name/value pair.
    ///
    /// `content-length` must be a non-negative integer; any other value is a
    /// `MalformedHeader` error. Unknown names become `Custom`.
    pub fn parse(name: &str, value: &str) -> Result<Header, FrameError> {
        let value = value.to_string();
        let header = match name {
            "content-length" => {
                let trimmed = value.trim();
                let len = trimmed.parse::<usize>().map_err(|e| {
                    FrameError::malformed(name, format!("invalid content-length '{}': {}", trimmed, e))
                })?;
                Header::ContentLength(len)
            }
            "content-type" => Header::ContentType(value),
            "receipt" => Header::Receipt(value),
            "accept-version" => Header::AcceptVersion(value),
            "host" => Header::Host(value),
            "login" => Header::Login(value),
            "passcode" => Header::Passcode(value),
            "heart-beat" => Header::HeartBeat(value),
            "version" => Header::Version(value),
            "session" => Header::Session(value),
            "server" => Header::Server(value),
            "destination" => Header::Destination(value),
            "transaction" => Header::Transaction(value),
            "id" => Header::SubscriptionId(value),
            "ack" => Header::Ack(value),
            "message-id" => Header::MessageId(value),
            "subscription" => Header::Subscription(value),
            "receipt-id" => Header::ReceiptId(value),
            _ => Header::Custom(name.to_string(), value),
        };
        Ok(header)
    }

    /// Build an application-defined header.
    pub fn custom(name: impl Into<String>, value: impl Into<String>) -> Header {
        Header::Custom(name.into(), value.into())
    }

    /// The wire name of this header.
    pub fn name(&self) -> &str {
        match self {
            Header::ContentLength(_) => "content-length",
            Header::ContentType(_) => "content-type",
            Header::Receipt(_) => "receipt",
            Header::AcceptVersion(_) => "accept-version",
            Header::Host(_) => "host",
            Header::Login(_) => "login",
            Header::Passcode(_) => "passcode",
            Header::HeartBeat(_) => "heart-beat",
            Header::Version(_) => "version",
            Header::Session(_) => "session",
            Header::Server(_) => "server",
            Header::Destination(_) => "destination",
            Header::Transaction(_) => "transaction",
            Header::SubscriptionId(_) => "id",
            Header::Ack(_) => "ack",
            Header::MessageId(_) => "message-id",
            Header::Subscription(_) => "subscription",
            Header::ReceiptId(_) => "receipt-id",
            Header::Custom(name, _) => name,
        }
    }

    /// The wire value of this header.
    pub fn value(&self) -> Cow<'_, str> {
        match self {
            Header::ContentLength(len) => Cow::Owned(len.to_string()),
            Header::ContentType(v)
            | Header::Receipt(v)
            | Header::AcceptVersion(v)
            | Header::Host(v)
            | Header::Login(v)
            | Header::Passcode(v)
            | Header::HeartBeat(v)
            | Header::Version(v)
            | Header::Session(v)
            | Header::Server(v)
            | Header::Destination(v)
            | Header::Transaction(v)
            | Header::SubscriptionId(v)
            | Header::Ack(v)
            | Header::MessageId(v)
            | Header::Subscription(v)
            | Header::ReceiptId(v)
            | Header::Custom(_, v) => Cow::Borrowed(v),
        }
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Header {}

impl Hash for Header {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if matches!(self, Header::Passcode(_)) {
            return write!(f, "{}: ******", self.name());
        }
        write!(f, "{}: {}", self.name(), self.value())
    }
}

/// An insertion-ordered header collection in which every name is unique.
///
/// Inserting a header whose name is already present replaces the earlier
/// entry in place, so serialization order stays deterministic.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<Header>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `header`, replacing any entry with the same name.
    ///
    /// Returns the replaced header, if any.
    pub fn insert(&mut self, header: Header) -> Option<Header> {
        match self.entries.iter_mut().find(|h| **h == header) {
            Some(slot) => Some(std::mem::replace(slot, header)),
            None => {
                self.entries.push(header);
                None
            }
        }
    }

    /// Look up a header value by name (case-sensitive).
    pub fn get(&self, name: &str) -> Option<Cow<'_, str>> {
        self.find(name).map(Header::value)
    }

    /// Look up a header entry by name (case-sensitive).
    pub fn find(&self, name: &str) -> Option<&Header> {
        self.entries.iter().find(|h| h.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Header> {
        let pos = self.entries.iter().position(|h| h.name() == name)?;
        Some(self.entries.remove(pos))
    }

    /// The typed `content-length`, when present.
    pub fn content_length(&self) -> Option<usize> {
        self.entries.iter().find_map(|h| match h {
            Header::ContentLength(len) => Some(*len),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.entries.iter()
    }

    /// Owned `(name, value)` pairs in insertion order.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|h| (h.name().to_string(), h.value().into_owned()))
            .collect()
    }
}

/// Set semantics: two collections are equal when they hold the same
/// name/value pairs, regardless of order.
impl PartialEq for Headers {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.entries.iter().all(|h| {
                other
                    .find(h.name())
                    .is_some_and(|o| o.value() == h.value())
            })
    }
}

impl Eq for Headers {}

impl FromIterator<Header> for Headers {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for h in iter {
            headers.insert(h);
        }
        headers
    }
}

impl Extend<Header> for Headers {
    fn extend<I: IntoIterator<Item = Header>>(&mut self, iter: I) {
        for h in iter {
            self.insert(h);
        }
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
