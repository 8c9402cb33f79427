// src/core/multiplexer.rs

//! The request multiplexer: accepts keyword-tagged requests, tracks them in
//! reusable slots and turns transport callbacks into published events.
//!
//! Per-slot lifecycle: `Sent` on submit, any number of chunk deliveries for
//! streaming hints, then exactly one completion which publishes one of
//! `TextCompleted`, `BinaryCompleted` or `Error` and frees the slot.
//!
//! Transport callbacks capture a [`SlotTicket`] and only a weak reference to
//! the multiplexer, so dropping the multiplexer (or calling
//! [`shutdown`](RequestMultiplexer::shutdown)) unbinds every pending callback.

use crate::config::{Config, SecurityConfig};
use crate::core::classify::{ContentKind, classify};
use crate::core::dispatch::Dispatcher;
use crate::core::events::{EventBus, MuxEvent};
use crate::core::metrics::{
    COMPLETIONS_TOTAL, IN_FLIGHT_REQUESTS, REQUESTS_REJECTED_TOTAL, REQUESTS_SUBMITTED_TOTAL,
};
use crate::core::request::SubmitRequest;
use crate::core::slots::{SlotId, SlotSnapshot, SlotTable, SlotTicket};
use crate::core::stream::StreamAssembler;
use crate::core::tasks::event_pump::EventPump;
use crate::core::transport::{
    ChunkCallback, CompleteCallback, OutboundRequest, ResponseCallbacks, Transport,
    TransportResponse,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, info, warn};

/// A cheaply cloneable handle to a multiplexer.
#[derive(Debug, Clone)]
pub struct RequestMultiplexer {
    inner: Arc<MuxInner>,
}

#[derive(Debug)]
struct MuxInner {
    slots: Arc<SlotTable>,
    assembler: StreamAssembler,
    dispatcher: Dispatcher,
    transport: Arc<dyn Transport>,
    security: SecurityConfig,
    timeout: Duration,
    default_keyword: Arc<str>,
    shut_down: AtomicBool,
}

impl RequestMultiplexer {
    /// Creates a multiplexer from configuration.
    ///
    /// With `dispatch_to_primary` set, the calling thread becomes the primary
    /// thread and the returned [`EventPump`] must be driven on it.
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> (Self, Option<EventPump>) {
        let bus = EventBus::new(config.event_bus_capacity);
        if config.dispatch_to_primary {
            let (dispatcher, pump) = Dispatcher::on_current_thread(bus);
            (Self::with_dispatcher(config, transport, dispatcher), Some(pump))
        } else {
            let dispatcher = Dispatcher::direct(bus);
            (Self::with_dispatcher(config, transport, dispatcher), None)
        }
    }

    pub fn with_dispatcher(
        config: &Config,
        transport: Arc<dyn Transport>,
        dispatcher: Dispatcher,
    ) -> Self {
        let slots = Arc::new(SlotTable::new());
        Self {
            inner: Arc::new(MuxInner {
                assembler: StreamAssembler::new(slots.clone()),
                slots,
                dispatcher,
                transport,
                security: config.security.clone(),
                timeout: config.timeout(),
                default_keyword: Arc::from(config.default_keyword.as_str()),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Submits a request. Returns whether the transport accepted it, not
    /// whether it will succeed.
    pub fn submit(&self, request: SubmitRequest) -> bool {
        let inner = &self.inner;
        if inner.shut_down.load(Ordering::Acquire) {
            warn!("Rejecting request '{}': multiplexer is shut down.", request.keyword);
            REQUESTS_REJECTED_TOTAL.inc();
            return false;
        }
        if let Err(e) = inner.security.check_url(&request.url) {
            warn!("Rejecting request '{}': {:#}", request.keyword, e);
            REQUESTS_REJECTED_TOTAL.inc();
            return false;
        }

        let headers = request.effective_headers();
        let SubmitRequest {
            keyword,
            url,
            verb,
            body,
            hint,
            ..
        } = request;

        let ticket = inner.slots.allocate(keyword.clone(), hint);
        IN_FLIGHT_REQUESTS.inc();

        let outbound = OutboundRequest {
            verb,
            url,
            headers,
            body: body.into_bytes(),
            timeout: inner.timeout,
        };
        let callbacks = ResponseCallbacks {
            on_complete: complete_callback(Arc::downgrade(inner), ticket),
            on_chunk: hint
                .is_streaming()
                .then(|| chunk_callback(Arc::downgrade(inner), ticket)),
        };

        match inner.transport.send(outbound, callbacks) {
            Some(handle) => {
                if !inner.slots.attach(&ticket, handle) {
                    debug!("Slot {} finished before its handle was attached.", ticket.id);
                }
                REQUESTS_SUBMITTED_TOTAL.inc();
                info!("Submitted {} request '{}' as slot {}.", verb, keyword, ticket.id);
                true
            }
            None => {
                warn!("Transport refused {} request '{}'.", verb, keyword);
                if inner.slots.release_ticket(&ticket) {
                    IN_FLIGHT_REQUESTS.dec();
                }
                REQUESTS_REJECTED_TOTAL.inc();
                false
            }
        }
    }

    /// Entry point for a transport completion. Normally reached through the
    /// callback registered by [`submit`](Self::submit).
    pub fn on_complete(&self, ticket: SlotTicket, response: TransportResponse) {
        self.inner.on_complete(ticket, response)
    }

    /// Entry point for a streamed chunk. Returns whether it was routed.
    pub fn on_chunk(&self, ticket: SlotTicket, chunk: &[u8]) -> bool {
        self.inner.on_chunk(ticket, chunk)
    }

    /// Unbinds every pending callback and frees all slots. Late transport
    /// callbacks are ignored and further submits are rejected.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let released = self.inner.slots.release_all();
        IN_FLIGHT_REQUESTS.sub(released as f64);
        info!("Multiplexer shut down; {} in-flight requests abandoned.", released);
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> Receiver<MuxEvent> {
        self.inner.dispatcher.bus().subscribe()
    }

    pub fn bus(&self) -> &EventBus {
        self.inner.dispatcher.bus()
    }

    pub fn slot_snapshot(&self, id: SlotId) -> Option<SlotSnapshot> {
        self.inner.slots.get(id)
    }

    pub fn in_flight(&self) -> usize {
        self.inner.slots.in_flight()
    }

    pub fn default_keyword(&self) -> &str {
        &self.inner.default_keyword
    }
}

fn complete_callback(inner: Weak<MuxInner>, ticket: SlotTicket) -> CompleteCallback {
    Box::new(move |response| match inner.upgrade() {
        Some(inner) => inner.on_complete(ticket, response),
        None => debug!("Dropping completion for slot {}: multiplexer is gone.", ticket.id),
    })
}

fn chunk_callback(inner: Weak<MuxInner>, ticket: SlotTicket) -> ChunkCallback {
    Arc::new(move |chunk: &[u8]| {
        inner
            .upgrade()
            .is_some_and(|inner| inner.on_chunk(ticket, chunk))
    })
}

impl MuxInner {
    fn on_complete(&self, ticket: SlotTicket, response: TransportResponse) {
        if self.shut_down.load(Ordering::Acquire) {
            debug!("Ignoring completion for slot {} after shutdown.", ticket.id);
            return;
        }

        let Some((keyword, hint)) = self.slots.route(&ticket) else {
            warn!(
                "Completion for unknown slot {} (status {}); reporting it as '{}'.",
                ticket.id, response.status, self.default_keyword
            );
            COMPLETIONS_TOTAL.with_label_values(&["error"]).inc();
            self.dispatcher.dispatch(MuxEvent::Error {
                keyword: self.default_keyword.clone(),
                status: response.status,
            });
            return;
        };

        let status = response.status;
        let event = if !response.success {
            warn!(
                "Request '{}' (slot {}) failed with status {}.",
                keyword, ticket.id, status
            );
            MuxEvent::Error { keyword, status }
        } else {
            match classify(response.content_type(), hint) {
                ContentKind::Binary => {
                    self.slots.store_binary(&ticket, response.content.clone());
                    MuxEvent::BinaryCompleted {
                        keyword,
                        status,
                        headers: response.headers,
                        bytes: response.content,
                    }
                }
                ContentKind::Text => {
                    let text = String::from_utf8_lossy(&response.content).into_owned();
                    self.slots.store_text(&ticket, text.clone());
                    MuxEvent::TextCompleted {
                        keyword,
                        status,
                        headers: response.headers,
                        text,
                    }
                }
            }
        };

        // Freed before publishing, so a subscriber reacting to the event can
        // already reuse the id.
        if self.slots.release_ticket(&ticket) {
            IN_FLIGHT_REQUESTS.dec();
        }
        info!(
            "Request '{}' (slot {}) completed as {} with status {}.",
            event.keyword(),
            ticket.id,
            event.kind(),
            status
        );
        COMPLETIONS_TOTAL.with_label_values(&[event.kind()]).inc();
        self.dispatcher.dispatch(event);
    }

    fn on_chunk(&self, ticket: SlotTicket, chunk: &[u8]) -> bool {
        if self.shut_down.load(Ordering::Acquire) {
            return false;
        }
        match self.assembler.on_chunk(&ticket, chunk) {
            Some(event) => {
                self.dispatcher.dispatch(event);
                true
            }
            None => false,
        }
    }
}
