//! Unit tests for heartbeat parsing and negotiation functions.

use std::time::Duration;
use stomp_relay::{Heartbeat, negotiate_heartbeats, parse_heartbeat_header};

// =============================================================================
// parse_heartbeat_header tests
// =============================================================================

#[test]
fn parse_standard_heartbeat() {
    let (cx, cy) = parse_heartbeat_header("10000,10000");
    assert_eq!(cx, 10000);
    assert_eq!(cy, 10000);
}

#[test]
fn parse_zero_heartbeat() {
    assert_eq!(parse_heartbeat_header("0,0"), (0, 0));
}

#[test]
fn parse_asymmetric_heartbeat() {
    assert_eq!(parse_heartbeat_header("5000,15000"), (5000, 15000));
}

#[test]
fn parse_whitespace_padded() {
    assert_eq!(parse_heartbeat_header(" 10000 , 10000 "), (10000, 10000));
}

#[test]
fn parse_missing_second_value() {
    let (cx, cy) = parse_heartbeat_header("10000");
    assert_eq!(cx, 10000);
    assert_eq!(cy, 0); // defaults to 0
}

#[test]
fn parse_garbage_is_zero() {
    assert_eq!(parse_heartbeat_header("abc,-5"), (0, 0));
    assert_eq!(parse_heartbeat_header(""), (0, 0));
}

// =============================================================================
// negotiate_heartbeats tests
// =============================================================================

#[test]
fn negotiate_takes_larger_interval() {
    let (out, inc) = negotiate_heartbeats(Heartbeat::new(10000, 10000), 5000, 20000);
    assert_eq!(out, Some(Duration::from_millis(20000)));
    assert_eq!(inc, Some(Duration::from_millis(10000)));
}

#[test]
fn negotiate_client_disabled() {
    let (out, inc) = negotiate_heartbeats(Heartbeat::disabled(), 5000, 5000);
    assert_eq!(out, None);
    assert_eq!(inc, None);
}

#[test]
fn negotiate_server_disabled() {
    let (out, inc) = negotiate_heartbeats(Heartbeat::default(), 0, 0);
    assert_eq!(out, None);
    assert_eq!(inc, None);
}

#[test]
fn negotiate_one_direction_only() {
    // client only sends; server only receives
    let (out, inc) = negotiate_heartbeats(Heartbeat::new(3000, 0), 7000, 4000);
    assert_eq!(out, Some(Duration::from_millis(4000)));
    assert_eq!(inc, None);
}

// =============================================================================
// Heartbeat configuration
// =============================================================================

#[test]
fn default_proposes_ten_seconds_each_way() {
    assert_eq!(Heartbeat::default().to_string(), "10000,10000");
}

#[test]
fn from_duration_is_symmetric() {
    let hb = Heartbeat::from_duration(Duration::from_secs(4));
    assert_eq!(hb, Heartbeat::new(4000, 4000));
}

#[test]
fn disabled_formats_as_zeroes() {
    assert_eq!(Heartbeat::disabled().to_string(), "0,0");
}
