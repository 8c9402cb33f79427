// src/core/mod.rs

//! The central module containing the request multiplexer and the
//! path-addressable JSON document.

pub mod classify;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod json;
pub mod metrics;
pub mod multiplexer;
pub mod request;
pub mod slots;
pub mod stream;
pub mod tasks;
pub mod transport;

pub use classify::{ContentKind, FormatHint};
pub use errors::HttpMuxError;
pub use events::{EventBus, MuxEvent};
pub use json::{JsonDocument, JsonKind};
pub use multiplexer::RequestMultiplexer;
pub use request::{Header, HttpVerb, SubmitRequest};
