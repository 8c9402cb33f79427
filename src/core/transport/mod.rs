// src/core/transport/mod.rs

//! The boundary to whatever actually performs HTTP: opening sockets, TLS and
//! reading bytes. The multiplexer only submits requests and receives
//! completion and chunk callbacks.

use crate::core::request::{Header, HttpVerb};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub mod reqwest_transport;

pub use reqwest_transport::ReqwestTransport;

/// Invoked exactly once when the transport is done with a request.
pub type CompleteCallback = Box<dyn FnOnce(TransportResponse) + Send + 'static>;

/// Invoked for every body chunk of a streaming request. The return value tells
/// the transport whether the chunk was accepted.
pub type ChunkCallback = Arc<dyn Fn(&[u8]) -> bool + Send + Sync + 'static>;

/// A cheaply cloneable handle to an in-flight transport request.
#[derive(Debug, Clone, Default)]
pub struct TransportHandle {
    finished: Arc<AtomicBool>,
}

impl TransportHandle {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }
}

/// Everything a transport needs to send one request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub verb: HttpVerb,
    pub url: String,
    pub headers: Vec<Header>,
    pub body: Bytes,
    pub timeout: Duration,
}

/// What the transport reports back on completion.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub content: Bytes,
    /// Response headers in `"Name: Value"` form.
    pub headers: Vec<String>,
    pub status: u16,
    /// False when no HTTP response was obtained at all (connect error,
    /// timeout, aborted body). HTTP error statuses still count as success.
    pub success: bool,
}

impl TransportResponse {
    /// A response that never made it back from the server.
    pub fn failed(status: u16) -> Self {
        Self {
            status,
            success: false,
            ..Default::default()
        }
    }

    /// The value of the `Content-Type` header, matched case-insensitively.
    /// Empty if absent.
    pub fn content_type(&self) -> &str {
        self.headers
            .iter()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.trim()
                    .eq_ignore_ascii_case("content-type")
                    .then(|| value.trim())
            })
            .unwrap_or("")
    }
}

/// The slot-scoped callbacks registered for one request. Each closure already
/// knows which slot it belongs to, so chunks never need a side channel to find
/// their owner.
pub struct ResponseCallbacks {
    pub on_complete: CompleteCallback,
    pub on_chunk: Option<ChunkCallback>,
}

impl ResponseCallbacks {
    pub fn complete(self, response: TransportResponse) {
        (self.on_complete)(response)
    }
}

impl fmt::Debug for ResponseCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCallbacks")
            .field("streaming", &self.on_chunk.is_some())
            .finish()
    }
}

/// An HTTP transport.
///
/// `send` must not block. It returns `None` if the request could not be
/// started, in which case neither callback will ever run. Otherwise the
/// transport calls `on_chunk` zero or more times and then `on_complete`
/// exactly once, serially for a given request.
pub trait Transport: Send + Sync + fmt::Debug {
    fn send(
        &self,
        request: OutboundRequest,
        callbacks: ResponseCallbacks,
    ) -> Option<TransportHandle>;
}
