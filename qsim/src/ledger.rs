use std::collections::BTreeMap;

use crate::{CustomerId, ServerId, Tick};

/// Kind of a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A new customer enters the system.
    Arrival,
    /// A customer finishes service and leaves its server.
    Departure {
        /// The departing customer.
        customer: CustomerId,
        /// The server that is vacated.
        server: ServerId,
    },
}

/// An event scheduled to occur at a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// The tick at which the event occurs.
    pub time: Tick,
    /// What happens.
    pub kind: EventKind,
}

impl Event {
    /// An arrival at `time`.
    #[must_use]
    pub fn arrival(time: Tick) -> Self {
        Self {
            time,
            kind: EventKind::Arrival,
        }
    }

    /// A departure of `customer` from `server` at `time`.
    #[must_use]
    pub fn departure(time: Tick, customer: CustomerId, server: ServerId) -> Self {
        Self {
            time,
            kind: EventKind::Departure { customer, server },
        }
    }

    /// Whether this is an arrival.
    #[must_use]
    pub fn is_arrival(&self) -> bool {
        matches!(self.kind, EventKind::Arrival)
    }

    /// Whether this is a departure.
    #[must_use]
    pub fn is_departure(&self) -> bool {
        matches!(self.kind, EventKind::Departure { .. })
    }
}

/// Future event list: pending events grouped by the tick at which they occur.
///
/// Any number of events can share a tick; they are kept in insertion order. The ledger does not
/// enforce that events are never scheduled before the last processed tick. This is up to the
/// caller.
#[derive(Debug, Default)]
pub struct EventLedger {
    events: BTreeMap<Tick, Vec<Event>>,
    len: usize,
}

impl EventLedger {
    /// Adds an event at `time`. Never fails.
    pub fn schedule(&mut self, time: Tick, kind: EventKind) {
        self.events
            .entry(time)
            .or_default()
            .push(Event { time, kind });
        self.len += 1;
    }

    /// Removes and returns all events scheduled at exactly `time`.
    pub fn events_at(&mut self, time: Tick) -> Vec<Event> {
        let batch = self.events.remove(&time).unwrap_or_default();
        self.len -= batch.len();
        batch
    }

    /// Removes and returns the events scheduled at exactly `time` that satisfy `predicate`.
    /// The remaining events at `time` stay in the ledger in their original order.
    pub fn take_at<P>(&mut self, time: Tick, mut predicate: P) -> Vec<Event>
    where
        P: FnMut(&Event) -> bool,
    {
        let batch = match self.events.get_mut(&time) {
            Some(batch) => batch,
            None => return Vec::new(),
        };
        let (taken, kept): (Vec<Event>, Vec<Event>) =
            batch.drain(..).partition(|event| predicate(event));
        if kept.is_empty() {
            self.events.remove(&time);
        } else {
            *batch = kept;
        }
        self.len -= taken.len();
        taken
    }

    /// Whether no events are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// The earliest tick with a pending event.
    #[must_use]
    pub fn next_time(&self) -> Option<Tick> {
        self.events.keys().next().copied()
    }
}
