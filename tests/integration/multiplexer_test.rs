// tests/integration/multiplexer_test.rs

//! Integration tests for the request multiplexer
//! Tests: slot reuse, completion routing, failure path, unknown slots, shutdown

use super::test_helpers::TestContext;
use bytes::Bytes;
use httpmux::config::Config;
use httpmux::core::classify::FormatHint;
use httpmux::core::events::MuxEvent;
use httpmux::core::metrics::gather_metrics;
use httpmux::core::request::{Header, HttpVerb, SubmitRequest};
use httpmux::core::slots::SlotTicket;
use httpmux::core::transport::TransportResponse;
use std::time::Duration;

// ===== Slot lifecycle Tests =====

#[tokio::test]
async fn test_lowest_completed_slot_is_reused() {
    let mut ctx = TestContext::new();
    for keyword in ["a", "b", "c"] {
        assert!(ctx.submit(keyword, FormatHint::Default));
    }
    assert_eq!(ctx.mux.in_flight(), 3);
    assert_eq!(&*ctx.mux.slot_snapshot(2).unwrap().keyword, "c");

    ctx.transport.succeed(0, "application/json", "{}");
    assert_eq!(ctx.drain_events().len(), 1);
    assert_eq!(ctx.mux.in_flight(), 2);

    assert!(ctx.submit("d", FormatHint::Default));
    let reused = ctx.mux.slot_snapshot(0).unwrap();
    assert_eq!(&*reused.keyword, "d");
    assert!(reused.in_flight);
    assert!(reused.text.is_empty());
    assert!(ctx.mux.slot_snapshot(3).is_none());
}

#[tokio::test]
async fn test_completed_slot_keeps_buffers_for_inspection() {
    let ctx = TestContext::new();
    ctx.submit("a", FormatHint::Default);
    ctx.transport.succeed(0, "text/plain", "hello");

    let snapshot = ctx.mux.slot_snapshot(0).unwrap();
    assert!(!snapshot.in_flight);
    assert_eq!(snapshot.text, "hello");
    assert!(ctx.transport.handle(0).is_finished());
}

// ===== Completion routing Tests =====

#[tokio::test]
async fn test_json_completion_is_text() {
    let mut ctx = TestContext::new();
    ctx.submit("chat", FormatHint::Default);
    ctx.transport.succeed(0, "application/json", r#"{"ok":true}"#);

    assert_eq!(
        ctx.drain_events(),
        vec![MuxEvent::TextCompleted {
            keyword: "chat".into(),
            status: 200,
            headers: vec!["Content-Type: application/json".to_string()],
            text: r#"{"ok":true}"#.to_string(),
        }]
    );
}

#[tokio::test]
async fn test_audio_completion_is_binary_regardless_of_hint() {
    let mut ctx = TestContext::new();
    ctx.submit("speech", FormatHint::Text);
    ctx.transport
        .succeed(0, "audio/mpeg", Bytes::from_static(b"\xff\xfb\x90"));

    match ctx.drain_events().as_slice() {
        [MuxEvent::BinaryCompleted { keyword, bytes, .. }] => {
            assert_eq!(&**keyword, "speech");
            assert_eq!(&bytes[..], b"\xff\xfb\x90");
        }
        other => panic!("unexpected events {other:?}"),
    }
    assert_eq!(&ctx.mux.slot_snapshot(0).unwrap().binary[..], b"\xff\xfb\x90");
}

#[tokio::test]
async fn test_octet_stream_follows_hint() {
    let mut ctx = TestContext::new();
    ctx.submit("bin", FormatHint::Binary);
    ctx.submit("txt", FormatHint::Default);
    ctx.transport.succeed(0, "application/octet-stream", "raw");
    ctx.transport.succeed(1, "application/octet-stream", "raw");

    let kinds: Vec<_> = ctx.drain_events().iter().map(MuxEvent::kind).collect();
    assert_eq!(kinds, vec!["binary", "text"]);
}

#[tokio::test]
async fn test_http_error_status_is_still_a_completion() {
    let mut ctx = TestContext::new();
    ctx.submit("missing", FormatHint::Default);
    ctx.transport
        .succeed_with_status(0, 404, "text/html", "<h1>not found</h1>");

    match ctx.drain_events().as_slice() {
        [MuxEvent::TextCompleted { status, .. }] => assert_eq!(*status, 404),
        other => panic!("unexpected events {other:?}"),
    }
}

// ===== Failure path Tests =====

#[tokio::test]
async fn test_transport_failure_yields_exactly_one_error() {
    let mut ctx = TestContext::new();
    assert!(ctx.submit("doomed", FormatHint::StreamingText));
    ctx.transport.fail(0, 0);

    assert_eq!(
        ctx.drain_events(),
        vec![MuxEvent::Error {
            keyword: "doomed".into(),
            status: 0
        }]
    );
    assert_eq!(ctx.mux.in_flight(), 0);

    assert!(ctx.submit("next", FormatHint::Default));
    assert_eq!(&*ctx.mux.slot_snapshot(0).unwrap().keyword, "next");
}

#[tokio::test]
async fn test_refused_submit_returns_false() {
    let mut ctx = TestContext::new();
    ctx.transport.set_refuse(true);
    assert!(!ctx.submit("a", FormatHint::Default));
    assert_eq!(ctx.mux.in_flight(), 0);
    assert!(ctx.drain_events().is_empty());

    ctx.transport.set_refuse(false);
    assert!(ctx.submit("b", FormatHint::Default));
    assert_eq!(&*ctx.mux.slot_snapshot(0).unwrap().keyword, "b");
}

#[tokio::test]
async fn test_unknown_slot_reports_default_keyword() {
    let mut config = Config::default();
    config.default_keyword = "Fallback".to_string();
    let mut ctx = TestContext::with_config(config);

    ctx.mux.on_complete(
        SlotTicket {
            id: 42,
            generation: 7,
        },
        TransportResponse {
            status: 200,
            success: true,
            ..Default::default()
        },
    );
    assert_eq!(
        ctx.drain_events(),
        vec![MuxEvent::Error {
            keyword: "Fallback".into(),
            status: 200
        }]
    );
}

// ===== Outbound request Tests =====

#[tokio::test]
async fn test_outbound_request_shape() {
    let mut config = Config::default();
    config.timeout_secs = 30;
    let ctx = TestContext::with_config(config);

    let request = SubmitRequest::new("k", "http://localhost/v1/chat")
        .verb(HttpVerb::Post)
        .header(Header::from_int("X-Retry", 3))
        .text_body(r#"{"model":"m"}"#);
    assert!(ctx.mux.submit(request));

    let sent = ctx.transport.request(0);
    assert_eq!(sent.verb, HttpVerb::Post);
    assert_eq!(sent.url, "http://localhost/v1/chat");
    assert_eq!(sent.timeout, Duration::from_secs(30));
    assert_eq!(&sent.body[..], br#"{"model":"m"}"#);
    assert_eq!(
        sent.headers,
        vec![Header::new("X-Retry", "3"), Header::content_json()]
    );
}

#[tokio::test]
async fn test_explicit_content_type_is_kept() {
    let ctx = TestContext::new();
    let request = SubmitRequest::new("k", "http://localhost/upload")
        .header(Header::content_wav())
        .binary_body(Bytes::from_static(b"RIFF"));
    assert!(ctx.mux.submit(request));
    assert_eq!(ctx.transport.request(0).headers, vec![Header::content_wav()]);

    // The match on the header name is case-sensitive.
    let request = SubmitRequest::new("k", "http://localhost/upload")
        .header(("content-type", "audio/wav"))
        .binary_body(Bytes::from_static(b"RIFF"));
    assert!(ctx.mux.submit(request));
    assert_eq!(ctx.transport.request(1).headers.len(), 2);
}

#[tokio::test]
async fn test_only_streaming_hints_register_chunk_callbacks() {
    let ctx = TestContext::new();
    ctx.submit("plain", FormatHint::Text);
    ctx.submit("stream", FormatHint::StreamingBinary);
    assert!(!ctx.transport.is_streaming(0));
    assert!(ctx.transport.is_streaming(1));
}

// ===== Teardown Tests =====

#[tokio::test]
async fn test_shutdown_unbinds_callbacks() {
    let mut ctx = TestContext::new();
    ctx.submit("a", FormatHint::StreamingText);
    ctx.submit("b", FormatHint::Default);

    ctx.mux.shutdown();
    assert!(ctx.mux.is_shut_down());
    assert_eq!(ctx.mux.in_flight(), 0);
    assert!(ctx.transport.handle(0).is_finished());

    assert!(!ctx.transport.chunk(0, b"late"));
    ctx.transport.succeed(1, "text/plain", "late");
    assert!(ctx.drain_events().is_empty());
    assert!(!ctx.submit("c", FormatHint::Default));
}

#[tokio::test]
async fn test_dropped_multiplexer_ignores_callbacks() {
    let ctx = TestContext::new();
    ctx.submit("a", FormatHint::StreamingText);
    let transport = ctx.transport.clone();
    drop(ctx);

    assert!(!transport.chunk(0, b"data: {}"));
    transport.succeed(0, "text/plain", "done");
}

#[tokio::test]
async fn test_metrics_are_exported() {
    let ctx = TestContext::new();
    ctx.submit("a", FormatHint::Default);
    let text = gather_metrics();
    assert!(text.contains("httpmux_requests_submitted_total"));
    assert!(text.contains("httpmux_in_flight_requests"));
}
