//! Unit tests for the frame model: builders, header collections, wire
//! serialization and the serialize/parse round trip.

mod common;

use common::reparse;
use stomp_relay::{ClientCommand, ClientFrame, Header, Headers, ServerCommand};

// =============================================================================
// Headers
// =============================================================================

#[test]
fn same_name_insert_keeps_one_entry_with_later_value() {
    let mut headers = Headers::new();
    headers.insert(Header::Destination("/queue/a".into()));
    let replaced = headers.insert(Header::Destination("/queue/b".into()));

    assert_eq!(headers.len(), 1);
    assert_eq!(headers.get("destination").as_deref(), Some("/queue/b"));
    assert_eq!(replaced.map(|h| h.value().into_owned()), Some("/queue/a".to_string()));
}

#[test]
fn custom_header_with_known_name_replaces_typed_one() {
    let mut headers = Headers::new();
    headers.insert(Header::ContentType("text/plain".into()));
    headers.insert(Header::custom("content-type", "application/json"));
    assert_eq!(headers.len(), 1);
    assert_eq!(headers.get("content-type").as_deref(), Some("application/json"));
}

#[test]
fn replacement_keeps_original_position() {
    let headers: Headers = [
        Header::custom("a", "1"),
        Header::custom("b", "2"),
        Header::custom("a", "3"),
    ]
    .into_iter()
    .collect();
    assert_eq!(
        headers.to_pairs(),
        vec![("a".to_string(), "3".to_string()), ("b".to_string(), "2".to_string())]
    );
}

#[test]
fn headers_compare_as_sets() {
    let a: Headers = [Header::custom("x", "1"), Header::custom("y", "2")]
        .into_iter()
        .collect();
    let b: Headers = [Header::custom("y", "2"), Header::custom("x", "1")]
        .into_iter()
        .collect();
    let c: Headers = [Header::custom("y", "2"), Header::custom("x", "9")]
        .into_iter()
        .collect();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn header_equality_ignores_value() {
    assert_eq!(Header::Receipt("r-1".into()), Header::Receipt("r-2".into()));
    assert_ne!(Header::Receipt("r-1".into()), Header::ReceiptId("r-1".into()));
}

#[test]
fn subscription_id_uses_id_wire_name() {
    assert_eq!(Header::SubscriptionId("sub-1".into()).name(), "id");
    assert!(matches!(
        Header::parse("id", "sub-1"),
        Ok(Header::SubscriptionId(v)) if v == "sub-1"
    ));
}

#[test]
fn remove_and_contains() {
    let mut headers = Headers::new();
    headers.insert(Header::Ack("auto".into()));
    assert!(headers.contains("ack"));
    assert!(headers.remove("ack").is_some());
    assert!(!headers.contains("ack"));
    assert!(headers.is_empty());
}

// =============================================================================
// ClientFrame
// =============================================================================

#[test]
fn builder_sets_command_headers_and_body() {
    let frame = ClientFrame::new(ClientCommand::Send)
        .header(Header::Destination("/queue/a".into()))
        .headers([Header::custom("x-a", "1"), Header::custom("x-b", "2")])
        .set_body("{}");

    assert_eq!(frame.command(), ClientCommand::Send);
    assert_eq!(frame.header_set().len(), 3);
    assert_eq!(frame.get_header("x-b").as_deref(), Some("2"));
    assert_eq!(frame.body(), "{}");
}

#[test]
fn frame_display_lists_headers_and_body_size() {
    let frame = ClientFrame::new(ClientCommand::Send)
        .header(Header::Destination("/queue/a".into()))
        .set_body("hello");
    let s = frame.to_string();
    assert!(s.contains("Command: SEND"));
    assert!(s.contains("destination: /queue/a"));
    assert!(s.contains("Body (5 bytes)"));
}

#[test]
fn frame_display_masks_passcode() {
    let frame = ClientFrame::new(ClientCommand::Connect).header(Header::Passcode("secret".into()));
    let s = frame.to_string();
    assert!(!s.contains("secret"));
    assert!(s.contains("passcode: ******"));
}

#[test]
fn wire_form_without_headers() {
    let frame = ClientFrame::new(ClientCommand::Disconnect);
    assert_eq!(frame.to_wire(), "DISCONNECT\n\n\0");
}

#[test]
fn wire_form_preserves_header_order() {
    let frame = ClientFrame::new(ClientCommand::Subscribe)
        .header(Header::SubscriptionId("sub-1".into()))
        .header(Header::Destination("/topic/t".into()))
        .header(Header::Ack("client-individual".into()));
    assert_eq!(
        frame.to_wire(),
        "SUBSCRIBE\nid:sub-1\ndestination:/topic/t\nack:client-individual\n\n\0"
    );
}

#[test]
fn command_names() {
    assert_eq!(ClientCommand::Unsubscribe.as_str(), "UNSUBSCRIBE");
    assert_eq!(ClientCommand::Ack.to_string(), "ACK");
    assert_eq!(ServerCommand::parse("RECEIPT"), Ok(ServerCommand::Receipt));
    assert!(ServerCommand::parse("SEND").is_err());
}

// =============================================================================
// Round trip
// =============================================================================

fn assert_round_trip(frame: &ClientFrame) {
    let parsed = reparse(&frame.to_wire());
    assert_eq!(parsed.headers(), frame.header_set(), "headers of {}", frame);
    assert_eq!(parsed.body(), frame.body());
}

#[test]
fn round_trip_send_with_json_body() {
    let body = r#"{"text":"hi","n":[1,2,3]}"#;
    assert_round_trip(
        &ClientFrame::new(ClientCommand::Send)
            .header(Header::Destination("chat.room1".into()))
            .header(Header::ContentType("application/json;charset=UTF-8".into()))
            .header(Header::ContentLength(body.len()))
            .set_body(body),
    );
}

#[test]
fn round_trip_with_special_characters_in_headers() {
    assert_round_trip(
        &ClientFrame::new(ClientCommand::Send)
            .header(Header::Destination("/queue/a:b".into()))
            .header(Header::custom("multi", "line1\nline2\r\\end"))
            .header(Header::custom("we:ird", "v")),
    );
}

#[test]
fn round_trip_subscribe_and_ack() {
    assert_round_trip(
        &ClientFrame::new(ClientCommand::Subscribe)
            .header(Header::SubscriptionId("sub-3".into()))
            .header(Header::Destination("/topic/x".into()))
            .header(Header::Ack("client".into())),
    );
    assert_round_trip(
        &ClientFrame::new(ClientCommand::Ack)
            .header(Header::SubscriptionId("m-1".into()))
            .header(Header::Subscription("sub-3".into()))
            .header(Header::MessageId("m-1".into())),
    );
}

#[test]
fn round_trip_body_with_nul_needs_content_length() {
    let body = "a\0b";
    assert_round_trip(
        &ClientFrame::new(ClientCommand::Send)
            .header(Header::ContentLength(body.len()))
            .set_body(body),
    );
}
