// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The HSM event alphabet and its bounded, task/ISR-producible queue.

use userlib::{Guarded, QueueFull, StaticQueue};

/// Capacity of the bounded event queue. The HSM services at most one event
/// per tick, so this bounds how many ticks a burst of posted events can lag
/// behind before a producer observes `QueueFull`.
pub const EVENT_QUEUE_CAPACITY: usize = 8;

/// Tags drawn by producers (the SCPI `CONTrol` endpoints, the health
/// supervisor, ISR handlers) and consumed one per tick by the HSM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    None,
    Run,
    Stop,
    Abort,
    Calibration,
    ClearError,
    Error,
}

pub type EventQueue = StaticQueue<Event, EVENT_QUEUE_CAPACITY>;

/// The process-wide event queue: any task (or ISR) posts here; only the
/// HSM supervisor's tick loop ever drains it, one event per tick.
static EVENT_QUEUE: Guarded<EventQueue> = Guarded::new(EventQueue::new());

/// Task-context producer with a millisecond timeout (`0` is non-blocking).
/// Mirrors `hsm_post_event`.
pub fn post_event(event: Event, timeout_ms: u32) -> Result<(), QueueFull> {
    EVENT_QUEUE.lock(|queue| queue.send(event, timeout_ms))
}

/// ISR-context producer. Mirrors `hsm_post_event_isr`: returns whether the
/// post succeeded and whether it should wake the HSM supervisor task (an
/// empty-to-nonempty transition).
pub fn post_event_from_isr(event: Event) -> (Result<(), QueueFull>, bool) {
    EVENT_QUEUE.lock(|queue| queue.send_from_isr(event))
}

pub(crate) fn recv() -> Option<Event> {
    EVENT_QUEUE.lock(|queue| queue.recv(0))
}

#[cfg(test)]
pub(crate) fn drain_for_test() {
    EVENT_QUEUE.lock(|queue| while queue.recv(0).is_some() {});
}
