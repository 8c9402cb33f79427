// src/core/dispatch.rs

//! Decides on which thread an event is published.
//!
//! With primary-thread dispatch disabled, events are published immediately on
//! whatever thread the transport used for its callback. With it enabled,
//! events raised off the primary thread are queued and published by an
//! [`EventPump`](crate::core::tasks::event_pump::EventPump) that runs on the
//! primary thread. A single queue keeps each request's chunk-then-completion
//! order intact.

use crate::core::events::{EventBus, MuxEvent};
use crate::core::tasks::event_pump::EventPump;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug)]
enum Mode {
    Direct,
    Primary {
        thread: ThreadId,
        queue: mpsc::UnboundedSender<MuxEvent>,
        /// Events queued but not yet published by the pump.
        pending: Arc<AtomicUsize>,
    },
}

#[derive(Debug)]
pub struct Dispatcher {
    bus: EventBus,
    mode: Mode,
}

impl Dispatcher {
    /// Publishes every event on the calling thread.
    pub fn direct(bus: EventBus) -> Self {
        Self {
            bus,
            mode: Mode::Direct,
        }
    }

    /// Treats the calling thread as the primary thread. The returned pump must
    /// be driven on this same thread.
    pub fn on_current_thread(bus: EventBus) -> (Self, EventPump) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let pump = EventPump::new(rx, bus.clone(), pending.clone());
        let dispatcher = Self {
            bus,
            mode: Mode::Primary {
                thread: thread::current().id(),
                queue: tx,
                pending,
            },
        };
        (dispatcher, pump)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn is_primary_dispatch(&self) -> bool {
        matches!(self.mode, Mode::Primary { .. })
    }

    /// Publishes now, or queues for the primary thread.
    pub fn dispatch(&self, event: MuxEvent) {
        match &self.mode {
            Mode::Direct => {
                self.bus.publish(event);
            }
            Mode::Primary {
                thread,
                queue,
                pending,
            } => {
                // On the primary thread with nothing queued, publishing directly
                // cannot overtake an earlier event.
                if thread::current().id() == *thread && pending.load(Ordering::Acquire) == 0 {
                    self.bus.publish(event);
                    return;
                }
                pending.fetch_add(1, Ordering::AcqRel);
                if let Err(mpsc::error::SendError(event)) = queue.send(event) {
                    pending.fetch_sub(1, Ordering::AcqRel);
                    warn!(
                        "Event pump is gone; dropping {} event for '{}'.",
                        event.kind(),
                        event.keyword()
                    );
                }
            }
        }
    }
}
