//! Timer services for the retransmission and ack-delay timers.
//!
//! A timer never touches engine state. When it fires it only posts its
//! [`Event`] into the engine's event stream, so cancellation can race with
//! firing: an event may still arrive after `cancel`. The engine treats every
//! timeout as advisory and re-validates it against the current window.
//!
//! - [`TokioTimers`] runs each timer as a tokio task and aborts it on cancel.
//! - [`ManualTimers`] keeps a virtual clock that the caller advances, which
//!   makes timer races and expiry order fully deterministic.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event::Event;

/// Schedules delayed events and cancels them before they fire.
pub trait TimerService {
    /// Identifies one scheduled timer.
    type Handle;

    /// Arrange for `event` to be posted after `delay`.
    fn schedule(&mut self, delay: Duration, event: Event) -> Self::Handle;

    /// Cancel a pending timer. Cancelling a timer that already fired is a no-op.
    fn cancel(&mut self, handle: Self::Handle);
}

/// Timer service backed by tokio tasks.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioTimers {
    events: mpsc::UnboundedSender<Event>,
}

impl TokioTimers {
    pub fn new(events: mpsc::UnboundedSender<Event>) -> Self {
        Self { events }
    }
}

impl TimerService for TokioTimers {
    type Handle = JoinHandle<()>;

    fn schedule(&mut self, delay: Duration, event: Event) -> Self::Handle {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The engine may already be gone; nothing to do then.
            let _ = events.send(event);
        })
    }

    fn cancel(&mut self, handle: Self::Handle) {
        handle.abort();
    }
}

/// Handle for a [`ManualTimers`] entry: its deadline and a tie-breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId {
    deadline: Duration,
    id: u64,
}

impl TimerId {
    /// Virtual time at which this timer fires.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

/// Virtual-clock timer service.
///
/// Time only moves when [`advance`](Self::advance) is called. Timers that
/// share a deadline fire in the order they were scheduled.
#[derive(Debug, Default)]
pub struct ManualTimers {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<TimerId, Event>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers scheduled and not yet fired or cancelled.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Deadline of the earliest pending timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(TimerId::deadline)
    }

    /// Whether any pending timer would post `event`.
    pub fn is_armed(&self, event: &Event) -> bool {
        self.pending.values().any(|e| e == event)
    }

    /// Move the clock forward by `by` and return every event that fired,
    /// earliest first.
    pub fn advance(&mut self, by: Duration) -> Vec<Event> {
        self.now += by;
        let later = self.pending.split_off(&TimerId {
            deadline: self.now,
            id: u64::MAX,
        });
        let fired = std::mem::replace(&mut self.pending, later);
        fired.into_values().collect()
    }

    /// Jump to the earliest deadline and fire everything due at that instant.
    pub fn fire_next(&mut self) -> Vec<Event> {
        match self.next_deadline() {
            Some(deadline) => {
                let by = deadline.saturating_sub(self.now);
                self.advance(by)
            }
            None => Vec::new(),
        }
    }
}

impl TimerService for ManualTimers {
    type Handle = TimerId;

    fn schedule(&mut self, delay: Duration, event: Event) -> TimerId {
        let handle = TimerId {
            deadline: self.now + delay,
            id: self.next_id,
        };
        self.next_id += 1;
        self.pending.insert(handle, event);
        handle
    }

    fn cancel(&mut self, handle: TimerId) {
        self.pending.remove(&handle);
    }
}
