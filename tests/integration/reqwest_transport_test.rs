// tests/integration/reqwest_transport_test.rs

//! Integration tests for the reqwest transport against a local HTTP server
//! Tests: text and binary completions, error statuses, connection failures,
//! streamed bodies

use super::test_helpers::{http_response, init_tracing, next_event, spawn_http_server};
use httpmux::config::Config;
use httpmux::core::classify::FormatHint;
use httpmux::core::events::MuxEvent;
use httpmux::core::multiplexer::RequestMultiplexer;
use httpmux::core::request::{HttpVerb, SubmitRequest};
use httpmux::core::transport::ReqwestTransport;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Handle;

fn multiplexer() -> RequestMultiplexer {
    init_tracing();
    let client = reqwest::Client::builder()
        .no_proxy()
        .user_agent("httpmux-tests")
        .build()
        .unwrap();
    let transport = Arc::new(ReqwestTransport::with_client(client, Handle::current()));
    let (mux, pump) = RequestMultiplexer::new(&Config::default(), transport);
    assert!(pump.is_none());
    mux
}

#[tokio::test]
async fn test_json_response_completes_as_text() {
    let addr = spawn_http_server(vec![http_response(
        "200 OK",
        "application/json",
        br#"{"reply":"hello"}"#,
    )])
    .await;
    let mux = multiplexer();
    let mut events = mux.subscribe();

    let request = SubmitRequest::new("chat", format!("http://{addr}/v1/chat"))
        .verb(HttpVerb::Post)
        .text_body(r#"{"prompt":"hi"}"#);
    assert!(mux.submit(request));

    match next_event(&mut events).await {
        MuxEvent::TextCompleted {
            keyword,
            status,
            headers,
            text,
        } => {
            assert_eq!(&*keyword, "chat");
            assert_eq!(status, 200);
            assert!(headers.iter().any(|h| h == "content-type: application/json"));
            assert_eq!(text, r#"{"reply":"hello"}"#);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(mux.in_flight(), 0);
}

#[tokio::test]
async fn test_audio_response_completes_as_binary() {
    let addr = spawn_http_server(vec![http_response("200 OK", "audio/mpeg", b"ID3\x04")]).await;
    let mux = multiplexer();
    let mut events = mux.subscribe();

    assert!(mux.submit(SubmitRequest::new("tts", format!("http://{addr}/speech")).verb(HttpVerb::Get)));

    match next_event(&mut events).await {
        MuxEvent::BinaryCompleted { bytes, .. } => assert_eq!(&bytes[..], b"ID3\x04"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_error_status_is_not_a_transport_failure() {
    let addr = spawn_http_server(vec![http_response(
        "500 Internal Server Error",
        "text/plain",
        b"boom",
    )])
    .await;
    let mux = multiplexer();
    let mut events = mux.subscribe();

    assert!(mux.submit(SubmitRequest::new("k", format!("http://{addr}/"))));
    match next_event(&mut events).await {
        MuxEvent::TextCompleted { status, text, .. } => {
            assert_eq!(status, 500);
            assert_eq!(text, "boom");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_an_error_event() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mux = multiplexer();
    let mut events = mux.subscribe();
    assert!(mux.submit(SubmitRequest::new("offline", format!("http://{addr}/"))));

    assert_eq!(
        next_event(&mut events).await,
        MuxEvent::Error {
            keyword: "offline".into(),
            status: 0
        }
    );
    assert_eq!(mux.in_flight(), 0);
}

#[tokio::test]
async fn test_streamed_body_emits_chunks_before_completion() {
    let head = b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n".to_vec();
    let addr = spawn_http_server(vec![head, b"part-one;".to_vec(), b"part-two".to_vec()]).await;
    let mux = multiplexer();
    let mut events = mux.subscribe();

    let request =
        SubmitRequest::new("stream", format!("http://{addr}/")).hint(FormatHint::StreamingBinary);
    assert!(mux.submit(request));

    let mut chunks = 0;
    loop {
        match next_event(&mut events).await {
            MuxEvent::BinaryChunk { keyword, .. } => {
                assert_eq!(&*keyword, "stream");
                chunks += 1;
            }
            MuxEvent::BinaryCompleted { bytes, .. } => {
                assert_eq!(&bytes[..], b"part-one;part-two");
                break;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert!(chunks >= 1);
}
