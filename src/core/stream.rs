// src/core/stream.rs

//! Turns streamed body chunks into chunk events for the slot that owns them.

use crate::core::events::MuxEvent;
use crate::core::json::clean_json_response;
use crate::core::metrics::CHUNKS_ROUTED_TOTAL;
use crate::core::slots::{SlotTable, SlotTicket};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct StreamAssembler {
    slots: Arc<SlotTable>,
}

impl StreamAssembler {
    pub fn new(slots: Arc<SlotTable>) -> Self {
        Self { slots }
    }

    /// Stores a chunk in its slot and builds the event to publish for it.
    ///
    /// Each chunk replaces the slot's previous buffer contents. Text-hinted
    /// slots get the chunk decoded and stripped of SSE `data:` framing.
    /// Returns `None` for empty chunks and for tickets whose request is no
    /// longer live.
    pub fn on_chunk(&self, ticket: &SlotTicket, chunk: &[u8]) -> Option<MuxEvent> {
        if chunk.is_empty() {
            return None;
        }
        let Some((keyword, hint)) = self.slots.route(ticket) else {
            debug!(
                "Ignoring {} byte chunk for slot {} that is no longer live.",
                chunk.len(),
                ticket.id
            );
            return None;
        };

        let bytes = Bytes::copy_from_slice(chunk);
        if !self.slots.store_binary(ticket, bytes.clone()) {
            return None;
        }

        let event = if hint.forces_text() {
            let decoded = String::from_utf8_lossy(&bytes);
            let text = clean_json_response(&decoded).to_string();
            self.slots.store_text(ticket, text.clone());
            MuxEvent::TextChunk { keyword, text }
        } else {
            MuxEvent::BinaryChunk { keyword, bytes }
        };

        debug!("Routed {} chunk to slot {}.", event.kind(), ticket.id);
        CHUNKS_ROUTED_TOTAL.with_label_values(&[event.kind()]).inc();
        Some(event)
    }
}
