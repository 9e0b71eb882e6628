//! Typed stage events with per-kind ring buffers.
//!
//! Events are emitted while the stage runs due tasks, re-checks visibility or
//! routes input, and are delivered in batch at the end of each
//! [`Stage::advance_to`](crate::stage::Stage::advance_to) or
//! [`Stage::dispatch`](crate::stage::Stage::dispatch). Each event kind has its
//! own [`EventBuffer`] with a configurable capacity; the oldest events are
//! dropped when a buffer is full.
//!
//! Listeners are passive (read-only). Anything that changes the page goes
//! through the stage, never through a listener.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use crate::id::{Millis, NodeId, ParticleId};
use crate::sequencer::StepAction;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A stage event. All events carry the clock time at which they occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // -- Reveal --
    ElementEntered {
        node: NodeId,
        at: Millis,
    },
    StepApplied {
        element: NodeId,
        target: NodeId,
        action: StepAction,
        at: Millis,
    },
    /// A step whose target was missing or detached. Never aborts siblings.
    StepSkipped {
        element: NodeId,
        target_class: Option<String>,
        at: Millis,
    },

    // -- Ramps --
    RampStarted {
        node: NodeId,
        goal: u64,
        at: Millis,
    },
    RampSettled {
        node: NodeId,
        goal: u64,
        at: Millis,
    },

    // -- Particles --
    ParticleSpawned {
        particle: ParticleId,
        node: NodeId,
        lifetime_ms: Millis,
        at: Millis,
    },
    ParticleRemoved {
        particle: ParticleId,
        at: Millis,
    },

    // -- Input reactions --
    Scrolled {
        from: f64,
        to: f64,
        at: Millis,
    },
    Navigated {
        href: String,
        at: Millis,
    },
    Toggled {
        node: NodeId,
        open: bool,
        at: Millis,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ElementEntered,
    StepApplied,
    StepSkipped,
    RampStarted,
    RampSettled,
    ParticleSpawned,
    ParticleRemoved,
    Scrolled,
    Navigated,
    Toggled,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 10;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ElementEntered { .. } => EventKind::ElementEntered,
            Event::StepApplied { .. } => EventKind::StepApplied,
            Event::StepSkipped { .. } => EventKind::StepSkipped,
            Event::RampStarted { .. } => EventKind::RampStarted,
            Event::RampSettled { .. } => EventKind::RampSettled,
            Event::ParticleSpawned { .. } => EventKind::ParticleSpawned,
            Event::ParticleRemoved { .. } => EventKind::ParticleRemoved,
            Event::Scrolled { .. } => EventKind::Scrolled,
            Event::Navigated { .. } => EventKind::Navigated,
            Event::Toggled { .. } => EventKind::Toggled,
        }
    }

    /// Clock time at which the event occurred.
    pub fn at(&self) -> Millis {
        match self {
            Event::ElementEntered { at, .. }
            | Event::StepApplied { at, .. }
            | Event::StepSkipped { at, .. }
            | Event::RampStarted { at, .. }
            | Event::RampSettled { at, .. }
            | Event::ParticleSpawned { at, .. }
            | Event::ParticleRemoved { at, .. }
            | Event::Scrolled { at, .. }
            | Event::Navigated { at, .. }
            | Event::Toggled { at, .. } => *at,
        }
    }
}

impl EventKind {
    /// All kinds, in buffer order.
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::ElementEntered,
        EventKind::StepApplied,
        EventKind::StepSkipped,
        EventKind::RampStarted,
        EventKind::RampSettled,
        EventKind::ParticleSpawned,
        EventKind::ParticleRemoved,
        EventKind::Scrolled,
        EventKind::Navigated,
        EventKind::Toggled,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
    /// Events overwritten while still buffered. Survives `clear`.
    dropped: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
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

    /// Push an event. If full, the oldest event is dropped.
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

    /// Number of events dropped because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            self.head
        };
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

/// Iterator over events in an [`EventBuffer`], from oldest to newest.
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

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One ring buffer per event kind, listener lists, and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<PassiveListener>; EVENT_KIND_COUNT],
    default_capacity: usize,
    /// Totals survive `deliver`, which clears the buffers.
    totals: [u64; EVENT_KIND_COUNT],
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .field("totals", &self.totals)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given default buffer capacity per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: std::array::from_fn(|_| Vec::new()),
            default_capacity,
            totals: [0; EVENT_KIND_COUNT],
        }
    }

    /// Suppress an event kind. Suppressed events are never buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Record an event. No-op if its kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
        self.totals[idx] += 1;
    }

    /// Register a listener. Listeners of one kind run in registration order.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.listeners[kind.index()].push(listener);
    }

    /// Deliver all buffered events to listeners, then clear the buffers.
    ///
    /// Kinds are delivered in [`EventKind::ALL`] order. Within a kind,
    /// listeners run in registration order and each sees events oldest to
    /// newest.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            if self.suppressed[idx] {
                continue;
            }
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }

            let events: Vec<Event> = buffer.iter().cloned().collect();
            buffer.clear();

            for listener in self.listeners[idx].iter_mut() {
                for event in &events {
                    listener(event);
                }
            }
        }
    }

    /// Buffered (undelivered) events of one kind.
    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map_or(0, EventBuffer::len)
    }

    /// Total events ever emitted for a kind, delivered or not.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.totals[kind.index()]
    }

    /// Clear all buffers. Listeners and suppression settings stay.
    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
