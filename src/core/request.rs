// src/core/request.rs

//! Request-side types: verbs, header parameters, bodies and the submit
//! descriptor handed to the multiplexer.

use crate::core::classify::FormatHint;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The header name that disables the default content type. Matched
/// case-sensitively.
pub const CONTENT_TYPE: &str = "Content-Type";

const DEFAULT_TEXT_CONTENT_TYPE: &str = "application/json";
const DEFAULT_BINARY_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request header.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn from_int(name: impl Into<String>, value: i64) -> Self {
        Self::new(name, value.to_string())
    }

    /// Floats are always rendered with a `.` decimal separator.
    pub fn from_float(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value.to_string())
    }

    pub fn content_json() -> Self {
        Self::new(CONTENT_TYPE, "application/json")
    }

    pub fn content_mpeg() -> Self {
        Self::new(CONTENT_TYPE, "audio/mpeg")
    }

    pub fn content_wav() -> Self {
        Self::new(CONTENT_TYPE, "audio/wav")
    }

    pub fn content_html() -> Self {
        Self::new(CONTENT_TYPE, "text/html")
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for Header {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}

/// A request body. Text bodies are sent as UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
}

impl RequestBody {
    /// The content type used when the caller did not set one: JSON for a
    /// non-empty text body, octet-stream otherwise.
    pub fn default_content_type(&self) -> &'static str {
        match self {
            RequestBody::Text(text) if !text.is_empty() => DEFAULT_TEXT_CONTENT_TYPE,
            _ => DEFAULT_BINARY_CONTENT_TYPE,
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Text(text) => Bytes::from(text),
            RequestBody::Bytes(bytes) => bytes,
        }
    }
}

/// Everything the caller provides for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub keyword: Arc<str>,
    pub url: String,
    pub verb: HttpVerb,
    pub headers: Vec<Header>,
    pub body: RequestBody,
    pub hint: FormatHint,
}

impl SubmitRequest {
    pub fn new(keyword: impl Into<Arc<str>>, url: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            url: url.into(),
            verb: HttpVerb::default(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            hint: FormatHint::Default,
        }
    }

    pub fn verb(mut self, verb: HttpVerb) -> Self {
        self.verb = verb;
        self
    }

    pub fn header(mut self, header: impl Into<Header>) -> Self {
        self.headers.push(header.into());
        self
    }

    pub fn headers(mut self, headers: impl IntoIterator<Item = Header>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.body = RequestBody::Text(body.into());
        self
    }

    pub fn binary_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes(body.into());
        self
    }

    pub fn hint(mut self, hint: FormatHint) -> Self {
        self.hint = hint;
        self
    }

    /// The final header list, with the default content type appended unless
    /// the caller supplied a `Content-Type` header.
    pub fn effective_headers(&self) -> Vec<Header> {
        let mut headers = self.headers.clone();
        if !headers.iter().any(|h| h.name == CONTENT_TYPE) {
            headers.push(Header::new(CONTENT_TYPE, self.body.default_content_type()));
        }
        headers
    }
}
