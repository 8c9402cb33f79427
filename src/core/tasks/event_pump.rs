// src/core/tasks/event_pump.rs

//! The consumer side of primary-thread dispatch: drains queued events and
//! publishes them on the bus from the thread that owns the pump.

use crate::core::events::{EventBus, MuxEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, mpsc};
use tracing::info;

/// Publishes queued events. Not `Clone`: there is exactly one pump per
/// dispatcher.
#[derive(Debug)]
pub struct EventPump {
    rx: mpsc::UnboundedReceiver<MuxEvent>,
    bus: EventBus,
    pending: Arc<AtomicUsize>,
}

impl EventPump {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<MuxEvent>,
        bus: EventBus,
        pending: Arc<AtomicUsize>,
    ) -> Self {
        Self { rx, bus, pending }
    }

    /// Publishes everything queued so far without waiting. Meant to be called
    /// once per tick of a host loop. Returns the number of events published.
    pub fn pump(&mut self) -> usize {
        let mut published = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.publish(event);
            published += 1;
        }
        published
    }

    /// Runs until shutdown or until every dispatcher is dropped, publishing
    /// events as they arrive. Whatever is still queued at shutdown is flushed.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Event pump task started.");
        loop {
            tokio::select! {
                maybe_event = self.rx.recv() => {
                    match maybe_event {
                        Some(event) => self.publish(event),
                        None => {
                            info!("Event pump queue closed.");
                            return;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    let flushed = self.pump();
                    info!("Event pump shutting down ({} queued events flushed).", flushed);
                    return;
                }
            }
        }
    }

    fn publish(&self, event: MuxEvent) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
        self.bus.publish(event);
    }
}
