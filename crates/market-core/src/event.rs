//! Typed feedback events with pre-allocated ring buffers.
//!
//! Events are emitted while a tick runs and delivered in one batch at the end
//! of the tick, after every state change for that tick has happened. Each
//! event kind has its own [`EventBuffer`]. Hosts hang audio cues, particle
//! effects, and analytics off passive listeners; listeners only observe and
//! can never change world state.
//!
//! Kinds can be suppressed with [`EventBus::suppress`], which stops them from
//! being buffered at all.

use crate::economy::UpgradeKind;
use crate::fixed::Ticks;
use crate::id::{CustomerId, FixtureId, ItemKind};

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Player --
    ItemCollected {
        fixture: FixtureId,
        item: ItemKind,
        tick: Ticks,
    },
    ItemDeposited {
        fixture: FixtureId,
        item: ItemKind,
        tick: Ticks,
    },
    MoneyCollected {
        value: u64,
        tick: Ticks,
    },

    // -- Fixtures --
    ItemProduced {
        fixture: FixtureId,
        item: ItemKind,
        tick: Ticks,
    },

    // -- Customers --
    CustomerSpawned {
        customer: CustomerId,
        target: FixtureId,
        tick: Ticks,
    },
    SpawnVetoed {
        tick: Ticks,
    },
    SaleCompleted {
        customer: CustomerId,
        fixture: FixtureId,
        value: u64,
        tick: Ticks,
    },
    SaleAbandoned {
        customer: CustomerId,
        fixture: FixtureId,
        tick: Ticks,
    },
    CustomerDespawned {
        customer: CustomerId,
        purchased: bool,
        tick: Ticks,
    },

    // -- Economy --
    DropExpired {
        value: u64,
        tick: Ticks,
    },
    UpgradePurchased {
        kind: UpgradeKind,
        level: u32,
        cost: u64,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ItemCollected,
    ItemDeposited,
    MoneyCollected,
    ItemProduced,
    CustomerSpawned,
    SpawnVetoed,
    SaleCompleted,
    SaleAbandoned,
    CustomerDespawned,
    DropExpired,
    UpgradePurchased,
}

const EVENT_KIND_COUNT: usize = 11;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ItemCollected { .. } => EventKind::ItemCollected,
            Event::ItemDeposited { .. } => EventKind::ItemDeposited,
            Event::MoneyCollected { .. } => EventKind::MoneyCollected,
            Event::ItemProduced { .. } => EventKind::ItemProduced,
            Event::CustomerSpawned { .. } => EventKind::CustomerSpawned,
            Event::SpawnVetoed { .. } => EventKind::SpawnVetoed,
            Event::SaleCompleted { .. } => EventKind::SaleCompleted,
            Event::SaleAbandoned { .. } => EventKind::SaleAbandoned,
            Event::CustomerDespawned { .. } => EventKind::CustomerDespawned,
            Event::DropExpired { .. } => EventKind::DropExpired,
            Event::UpgradePurchased { .. } => EventKind::UpgradePurchased,
        }
    }

    pub fn tick(&self) -> Ticks {
        match *self {
            Event::ItemCollected { tick, .. }
            | Event::ItemDeposited { tick, .. }
            | Event::MoneyCollected { tick, .. }
            | Event::ItemProduced { tick, .. }
            | Event::CustomerSpawned { tick, .. }
            | Event::SpawnVetoed { tick }
            | Event::SaleCompleted { tick, .. }
            | Event::SaleAbandoned { tick, .. }
            | Event::CustomerDespawned { tick, .. }
            | Event::DropExpired { tick, .. }
            | Event::UpgradePurchased { tick, .. } => tick,
        }
    }
}

impl EventKind {
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::ItemCollected,
        EventKind::ItemDeposited,
        EventKind::MoneyCollected,
        EventKind::ItemProduced,
        EventKind::CustomerSpawned,
        EventKind::SpawnVetoed,
        EventKind::SaleCompleted,
        EventKind::SaleAbandoned,
        EventKind::CustomerDespawned,
        EventKind::DropExpired,
        EventKind::UpgradePurchased,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer. When full, the oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Next write position.
    head: usize,
    len: usize,
    /// Total events ever written, including dropped ones.
    total_written: u64,
    /// Events overwritten before they were read.
    dropped: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        let capacity = self.capacity();
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        } else {
            self.dropped += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events lost to overflow since the buffer was created. Clearing does
    /// not reset it.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        // Once full, head is the oldest slot.
        let start = if self.len < self.capacity() { 0 } else { self.head };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A read-only observer. `Send` so worlds can be stepped on worker threads.
pub type PassiveListener = Box<dyn FnMut(&Event) + Send>;

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One ring buffer per event kind, listener lists, and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<PassiveListener>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            default_capacity,
        }
    }

    /// Stop buffering `kind`. Drops its buffer.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event for the next delivery. No-op if its kind is
    /// suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Register a listener for `kind`. Listeners run in registration order.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.listeners[kind.index()].push(listener);
    }

    /// Hand every buffered event to its listeners, then clear the buffers.
    ///
    /// Kinds are delivered in [`EventKind::ALL`] order; within a kind, each
    /// listener sees events oldest first.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            let events: Vec<Event> = buffer.iter().cloned().collect();
            buffer.clear();

            for listener in &mut self.listeners[idx] {
                for event in &events {
                    listener(event);
                }
            }
        }
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()].as_ref().map_or(0, EventBuffer::len)
    }

    /// Total events ever emitted for `kind`, including dropped ones.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map_or(0, EventBuffer::total_written)
    }

    /// Events of `kind` lost because more were emitted in one tick than the
    /// buffer holds.
    pub fn total_dropped(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map_or(0, EventBuffer::dropped_count)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::sync::{Arc, Mutex};

    fn fixture_id() -> FixtureId {
        let mut sm = SlotMap::<FixtureId, ()>::with_key();
        sm.insert(())
    }

    fn collected(tick: Ticks) -> Event {
        Event::ItemCollected {
            fixture: fixture_id(),
            item: ItemKind::Banana,
            tick,
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<Event>>>, PassiveListener) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, Box::new(move |e: &Event| sink.lock().unwrap().push(e.clone())))
    }

    #[test]
    fn buffer_iterates_oldest_first() {
        let mut buf = EventBuffer::new(8);
        buf.push(collected(1));
        buf.push(collected(2));
        let ticks: Vec<Ticks> = buf.iter().map(Event::tick).collect();
        assert_eq!(ticks, vec![1, 2]);
        assert_eq!(buf.dropped_count(), 0);
    }

    #[test]
    fn buffer_wraps_and_drops_oldest() {
        let mut buf = EventBuffer::new(3);
        for t in 0..5 {
            buf.push(collected(t));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_written(), 5);
        assert_eq!(buf.dropped_count(), 2);
        let ticks: Vec<Ticks> = buf.iter().map(Event::tick).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
    }

    #[test]
    fn clearing_is_not_dropping() {
        let mut buf = EventBuffer::new(4);
        for round in 0..100 {
            buf.push(collected(round));
            buf.clear();
        }
        buf.push(collected(100));
        assert_eq!(buf.total_written(), 101);
        assert_eq!(buf.dropped_count(), 0);

        for t in 0..6 {
            buf.push(collected(t));
        }
        assert_eq!(buf.dropped_count(), 3);
        buf.clear();
        buf.push(collected(7));
        assert_eq!(buf.dropped_count(), 3);
    }

    #[test]
    fn zero_capacity_clamped() {
        let mut buf = EventBuffer::new(0);
        buf.push(collected(1));
        buf.push(collected(2));
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.iter().next().map(Event::tick), Some(2));
    }

    #[test]
    fn deliver_reaches_listener_and_clears() {
        let mut bus = EventBus::default();
        let (log, listener) = recorder();
        bus.on_passive(EventKind::ItemCollected, listener);
        bus.emit(collected(7));
        assert_eq!(bus.buffered_count(EventKind::ItemCollected), 1);
        bus.deliver();
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(bus.buffered_count(EventKind::ItemCollected), 0);
        bus.deliver();
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn suppressed_kinds_are_not_buffered() {
        let mut bus = EventBus::default();
        bus.suppress(EventKind::MoneyCollected);
        bus.emit(Event::MoneyCollected { value: 10, tick: 0 });
        assert_eq!(bus.total_emitted(EventKind::MoneyCollected), 0);
        bus.unsuppress(EventKind::MoneyCollected);
        bus.emit(Event::MoneyCollected { value: 10, tick: 0 });
        assert_eq!(bus.total_emitted(EventKind::MoneyCollected), 1);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let mut bus = EventBus::default();
        let order = Arc::new(Mutex::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.on_passive(
                EventKind::SpawnVetoed,
                Box::new(move |_: &Event| order.lock().unwrap().push(label)),
            );
        }
        bus.emit(Event::SpawnVetoed { tick: 0 });
        bus.deliver();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn listeners_only_hear_their_kind() {
        let mut bus = EventBus::default();
        let (log, listener) = recorder();
        bus.on_passive(EventKind::MoneyCollected, listener);
        bus.emit(Event::SpawnVetoed { tick: 0 });
        bus.emit(Event::MoneyCollected { value: 60, tick: 1 });
        bus.deliver();
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].tick(), 1);
    }

    #[test]
    fn bus_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<EventBus>();
    }
}
