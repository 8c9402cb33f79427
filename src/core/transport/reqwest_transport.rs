// src/core/transport/reqwest_transport.rs

//! A [`Transport`] backed by `reqwest`, running each request as a task on a
//! tokio runtime.

use super::{
    ChunkCallback, OutboundRequest, ResponseCallbacks, Transport, TransportHandle,
    TransportResponse,
};
use crate::core::errors::HttpMuxError;
use crate::core::request::HttpVerb;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use tokio::runtime::Handle;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    runtime: Handle,
}

impl ReqwestTransport {
    /// Builds a client and binds to the runtime of the calling context.
    /// Must be called from within a tokio runtime.
    pub fn new(user_agent: Option<&str>) -> Result<Self, HttpMuxError> {
        let mut builder = Client::builder();
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent);
        }
        let runtime = Handle::try_current()
            .map_err(|e| HttpMuxError::Internal(format!("no tokio runtime available: {e}")))?;
        Ok(Self::with_client(builder.build()?, runtime))
    }

    pub fn with_client(client: Client, runtime: Handle) -> Self {
        Self { client, runtime }
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: OutboundRequest,
        callbacks: ResponseCallbacks,
    ) -> Option<TransportHandle> {
        let mut builder = self
            .client
            .request(method_for(request.verb), &request.url)
            .timeout(request.timeout)
            .body(request.body);
        for header in &request.headers {
            builder = builder.header(header.name.as_str(), header.value.as_str());
        }
        let built = match builder.build() {
            Ok(built) => built,
            Err(e) => {
                warn!("Could not build {} request to '{}': {}", request.verb, request.url, e);
                return None;
            }
        };

        let handle = TransportHandle::new();
        let task_handle = handle.clone();
        let client = self.client.clone();
        let ResponseCallbacks {
            on_complete,
            on_chunk,
        } = callbacks;

        self.runtime.spawn(async move {
            let response = execute(&client, built, on_chunk.as_ref()).await;
            task_handle.mark_finished();
            on_complete(response);
        });
        Some(handle)
    }
}

fn method_for(verb: HttpVerb) -> Method {
    match verb {
        HttpVerb::Get => Method::GET,
        HttpVerb::Post => Method::POST,
        HttpVerb::Put => Method::PUT,
        HttpVerb::Patch => Method::PATCH,
        HttpVerb::Delete => Method::DELETE,
    }
}

/// Renders headers as `"Name: Value"` lines.
fn header_lines(headers: &HeaderMap) -> Vec<String> {
    headers
        .iter()
        .map(|(name, value)| {
            format!(
                "{}: {}",
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes())
            )
        })
        .collect()
}

async fn execute(
    client: &Client,
    request: reqwest::Request,
    on_chunk: Option<&ChunkCallback>,
) -> TransportResponse {
    let url = request.url().to_string();
    let response = match client.execute(request).await {
        Ok(response) => response,
        Err(e) => {
            warn!("HTTP request to '{}' failed: {}", url, e);
            return TransportResponse::failed(e.status().map_or(0, |s| s.as_u16()));
        }
    };

    let status = response.status().as_u16();
    let headers = header_lines(response.headers());
    let body = match on_chunk {
        Some(on_chunk) => read_streaming(response, on_chunk).await,
        None => response.bytes().await,
    };

    match body {
        Ok(content) => TransportResponse {
            content,
            headers,
            status,
            success: true,
        },
        Err(e) => {
            warn!("Reading the body from '{}' failed: {}", url, e);
            TransportResponse::failed(status)
        }
    }
}

/// Hands every body chunk to `on_chunk` as it arrives and returns the whole
/// body once the stream ends.
async fn read_streaming(
    response: reqwest::Response,
    on_chunk: &ChunkCallback,
) -> Result<Bytes, reqwest::Error> {
    let mut body = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if !on_chunk(&chunk) {
            debug!("Chunk of {} bytes was not accepted.", chunk.len());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}
