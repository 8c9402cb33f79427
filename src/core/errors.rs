// src/core/errors.rs

//! Defines the primary error type for the entire crate.

use crate::core::slots::SlotId;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing every failure the multiplexer and the
/// JSON document can report.
#[derive(Error, Debug)]
pub enum HttpMuxError {
    #[error("Transport reported failure (status {status})")]
    TransportFailure { status: u16 },

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Path syntax error: {0}")]
    PathSyntax(String),

    #[error("Wrong JSON kind: expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unknown request slot {0}")]
    UnknownSlot(SlotId),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP client error: {0}")]
    HttpClientError(String),

    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Internal Error: {0}")]
    Internal(String),
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
impl Clone for HttpMuxError {
    fn clone(&self) -> Self {
        match self {
            HttpMuxError::TransportFailure { status } => {
                HttpMuxError::TransportFailure { status: *status }
            }
            HttpMuxError::InvalidJson(s) => HttpMuxError::InvalidJson(s.clone()),
            HttpMuxError::PathNotFound(s) => HttpMuxError::PathNotFound(s.clone()),
            HttpMuxError::PathSyntax(s) => HttpMuxError::PathSyntax(s.clone()),
            HttpMuxError::WrongKind { expected, found } => HttpMuxError::WrongKind {
                expected: *expected,
                found: *found,
            },
            HttpMuxError::UnknownSlot(id) => HttpMuxError::UnknownSlot(*id),
            HttpMuxError::InvalidRequest(s) => HttpMuxError::InvalidRequest(s.clone()),
            HttpMuxError::HttpClientError(s) => HttpMuxError::HttpClientError(s.clone()),
            HttpMuxError::Io(e) => HttpMuxError::Io(Arc::clone(e)),
            HttpMuxError::Internal(s) => HttpMuxError::Internal(s.clone()),
        }
    }
}

impl PartialEq for HttpMuxError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                HttpMuxError::TransportFailure { status: s1 },
                HttpMuxError::TransportFailure { status: s2 },
            ) => s1 == s2,
            (HttpMuxError::InvalidJson(s1), HttpMuxError::InvalidJson(s2)) => s1 == s2,
            (HttpMuxError::PathNotFound(s1), HttpMuxError::PathNotFound(s2)) => s1 == s2,
            (HttpMuxError::PathSyntax(s1), HttpMuxError::PathSyntax(s2)) => s1 == s2,
            (
                HttpMuxError::WrongKind {
                    expected: e1,
                    found: f1,
                },
                HttpMuxError::WrongKind {
                    expected: e2,
                    found: f2,
                },
            ) => e1 == e2 && f1 == f2,
            (HttpMuxError::UnknownSlot(a), HttpMuxError::UnknownSlot(b)) => a == b,
            (HttpMuxError::InvalidRequest(s1), HttpMuxError::InvalidRequest(s2)) => s1 == s2,
            (HttpMuxError::HttpClientError(s1), HttpMuxError::HttpClientError(s2)) => s1 == s2,
            (HttpMuxError::Io(e1), HttpMuxError::Io(e2)) => e1.to_string() == e2.to_string(),
            (HttpMuxError::Internal(s1), HttpMuxError::Internal(s2)) => s1 == s2,
            _ => false,
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for HttpMuxError {
    fn from(e: std::io::Error) -> Self {
        HttpMuxError::Io(Arc::new(e))
    }
}

impl From<reqwest::Error> for HttpMuxError {
    fn from(e: reqwest::Error) -> Self {
        HttpMuxError::HttpClientError(e.to_string())
    }
}

impl From<serde_json::Error> for HttpMuxError {
    fn from(e: serde_json::Error) -> Self {
        HttpMuxError::InvalidJson(e.to_string())
    }
}

impl From<url::ParseError> for HttpMuxError {
    fn from(e: url::ParseError) -> Self {
        HttpMuxError::InvalidRequest(format!("Invalid URL: {e}"))
    }
}
