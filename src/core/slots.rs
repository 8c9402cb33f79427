// src/core/slots.rs

//! The request slot table: owns every in-flight (and recently completed)
//! request and hands out small integer identifiers, reusing the lowest free one.

use crate::core::classify::FormatHint;
use crate::core::transport::TransportHandle;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Identifier of a request slot. Unique among live slots, reused once free.
pub type SlotId = u32;

/// A slot id plus the generation it was handed out with. Callbacks hold a
/// ticket, so a late callback for a request whose id has since been reused
/// cannot touch the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotTicket {
    pub id: SlotId,
    pub generation: u64,
}

/// One table entry.
#[derive(Debug)]
pub struct RequestSlot {
    pub id: SlotId,
    generation: u64,
    pub keyword: Arc<str>,
    pub hint: FormatHint,
    /// Present while the transport is working on the request.
    handle: Option<TransportHandle>,
    /// Set between `allocate` and `attach` so the id cannot be handed out twice.
    reserved: bool,
    binary: Bytes,
    text: String,
}

impl RequestSlot {
    fn new(id: SlotId, generation: u64, keyword: Arc<str>, hint: FormatHint) -> Self {
        Self {
            id,
            generation,
            keyword,
            hint,
            handle: None,
            reserved: true,
            binary: Bytes::new(),
            text: String::new(),
        }
    }

    /// A slot is live from allocation until release.
    pub fn is_live(&self) -> bool {
        self.reserved || self.handle.is_some()
    }

    fn is_free(&self) -> bool {
        !self.is_live()
    }

    fn holds(&self, ticket: &SlotTicket) -> bool {
        self.generation == ticket.generation && self.is_live()
    }

    fn clear_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.mark_finished();
        }
        self.reserved = false;
    }

    fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            id: self.id,
            keyword: self.keyword.clone(),
            hint: self.hint,
            in_flight: self.is_live(),
            binary: self.binary.clone(),
            text: self.text.clone(),
        }
    }
}

/// A read-only copy of a slot, for inspection and for routing decisions made
/// outside the table lock.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSnapshot {
    pub id: SlotId,
    pub keyword: Arc<str>,
    pub hint: FormatHint,
    pub in_flight: bool,
    pub binary: Bytes,
    pub text: String,
}

/// Thread-safe slot table. All operations take the internal lock for their
/// whole duration, so `allocate`, `release` and lookups are serialized.
#[derive(Debug, Default)]
pub struct SlotTable {
    inner: Mutex<Slots>,
}

#[derive(Debug, Default)]
struct Slots {
    entries: BTreeMap<SlotId, RequestSlot>,
    next_generation: u64,
}

impl SlotTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Reserves a slot for a new request.
    ///
    /// The lowest-numbered free slot is reused (its buffers are reset);
    /// otherwise a new slot is created with `max id + 1`.
    pub fn allocate(&self, keyword: impl Into<Arc<str>>, hint: FormatHint) -> SlotTicket {
        let keyword = keyword.into();
        let mut slots = self.inner.lock();
        slots.next_generation += 1;
        let generation = slots.next_generation;

        if let Some(slot) = slots.entries.values_mut().find(|slot| slot.is_free()) {
            let id = slot.id;
            *slot = RequestSlot::new(id, generation, keyword, hint);
            debug!("Reusing request slot {}", id);
            return SlotTicket { id, generation };
        }

        let id = slots.entries.keys().next_back().map_or(0, |max| max + 1);
        slots
            .entries
            .insert(id, RequestSlot::new(id, generation, keyword, hint));
        debug!("Allocated new request slot {}", id);
        SlotTicket { id, generation }
    }

    /// Stores the transport handle of a reserved slot. Returns false if the
    /// request already completed (or the slot was released) in the meantime.
    pub fn attach(&self, ticket: &SlotTicket, handle: TransportHandle) -> bool {
        let mut slots = self.inner.lock();
        match slots.entries.get_mut(&ticket.id) {
            Some(slot) if slot.holds(ticket) && slot.reserved => {
                slot.reserved = false;
                slot.handle = Some(handle);
                true
            }
            _ => false,
        }
    }

    /// Looks up a slot. `None` means unknown.
    pub fn get(&self, id: SlotId) -> Option<SlotSnapshot> {
        self.inner.lock().entries.get(&id).map(RequestSlot::snapshot)
    }

    /// Keyword and hint of the request a ticket belongs to, if it is still
    /// live.
    pub fn route(&self, ticket: &SlotTicket) -> Option<(Arc<str>, FormatHint)> {
        let slots = self.inner.lock();
        slots
            .entries
            .get(&ticket.id)
            .filter(|slot| slot.holds(ticket))
            .map(|slot| (slot.keyword.clone(), slot.hint))
    }

    /// Replaces (does not append to) the binary buffer. Returns false if the
    /// ticket's request is no longer live.
    pub fn store_binary(&self, ticket: &SlotTicket, data: Bytes) -> bool {
        let mut slots = self.inner.lock();
        match slots.entries.get_mut(&ticket.id) {
            Some(slot) if slot.holds(ticket) => {
                slot.binary = data;
                true
            }
            _ => false,
        }
    }

    /// Replaces the text buffer.
    pub fn store_text(&self, ticket: &SlotTicket, text: String) -> bool {
        let mut slots = self.inner.lock();
        match slots.entries.get_mut(&ticket.id) {
            Some(slot) if slot.holds(ticket) => {
                slot.text = text;
                true
            }
            _ => false,
        }
    }

    /// Clears the transport handle and marks the slot reusable. Buffers are
    /// kept until the id is handed out again.
    pub fn release(&self, id: SlotId) -> bool {
        let mut slots = self.inner.lock();
        match slots.entries.get_mut(&id) {
            Some(slot) => {
                slot.clear_handle();
                debug!("Released request slot {}", id);
                true
            }
            None => false,
        }
    }

    /// Releases the slot only if it still belongs to the ticket's request.
    pub fn release_ticket(&self, ticket: &SlotTicket) -> bool {
        let mut slots = self.inner.lock();
        match slots.entries.get_mut(&ticket.id) {
            Some(slot) if slot.holds(ticket) => {
                slot.clear_handle();
                debug!("Released request slot {}", ticket.id);
                true
            }
            _ => false,
        }
    }

    /// Releases every live slot. Returns how many were live.
    pub fn release_all(&self) -> usize {
        let mut slots = self.inner.lock();
        let mut released = 0;
        for slot in slots.entries.values_mut().filter(|slot| slot.is_live()) {
            slot.clear_handle();
            released += 1;
        }
        released
    }

    /// Number of live slots.
    pub fn in_flight(&self) -> usize {
        self.inner
            .lock()
            .entries
            .values()
            .filter(|s| s.is_live())
            .count()
    }

    /// Total number of slots ever created (live or reusable).
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}
