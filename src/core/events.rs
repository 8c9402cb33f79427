// src/core/events.rs

//! Defines the completion and streaming events and the bus that multicasts
//! them to subscribers.

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::debug;

/// The default capacity of the broadcast channel. A subscriber that falls
/// further behind than this observes a `Lagged` error and skips ahead.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// An event published for a request. Every variant carries the caller's
/// keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum MuxEvent {
    TextCompleted {
        keyword: Arc<str>,
        status: u16,
        headers: Vec<String>,
        text: String,
    },
    BinaryCompleted {
        keyword: Arc<str>,
        status: u16,
        headers: Vec<String>,
        bytes: Bytes,
    },
    Error {
        keyword: Arc<str>,
        status: u16,
    },
    TextChunk {
        keyword: Arc<str>,
        text: String,
    },
    BinaryChunk {
        keyword: Arc<str>,
        bytes: Bytes,
    },
}

impl MuxEvent {
    pub fn keyword(&self) -> &str {
        match self {
            MuxEvent::TextCompleted { keyword, .. }
            | MuxEvent::BinaryCompleted { keyword, .. }
            | MuxEvent::Error { keyword, .. }
            | MuxEvent::TextChunk { keyword, .. }
            | MuxEvent::BinaryChunk { keyword, .. } => keyword,
        }
    }

    /// True for the three terminal events.
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            MuxEvent::TextCompleted { .. }
                | MuxEvent::BinaryCompleted { .. }
                | MuxEvent::Error { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MuxEvent::TextCompleted { .. } => "text",
            MuxEvent::BinaryCompleted { .. } => "binary",
            MuxEvent::Error { .. } => "error",
            MuxEvent::TextChunk { .. } => "text_chunk",
            MuxEvent::BinaryChunk { .. } => "binary_chunk",
        }
    }
}

/// Multicasts events to zero or more subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Sender<MuxEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event. Returns how many subscribers received it; having
    /// none is not an error.
    pub fn publish(&self, event: MuxEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!(
                    "Published a {} event for '{}' with no active subscribers.",
                    event.kind(),
                    event.keyword()
                );
                0
            }
        }
    }

    pub fn subscribe(&self) -> Receiver<MuxEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}
