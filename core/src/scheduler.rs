//! Event scheduler — the time-ordered queue of pending wakeups.
//!
//! RULES:
//!   - Time is virtual. It advances only when a wakeup is popped.
//!   - Equal due times resolve in scheduling order (FIFO by sequence).
//!   - Wakeups due after the horizon are never popped. Their processes
//!     are left where they are; nothing forces them to finish.

use crate::{
    clock::SimClock,
    error::SimResult,
    types::{EntityId, SimTime},
};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Identifies a logical process the scheduler can resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessId {
    Arrivals,
    Child(EntityId),
}

/// Handle to a scheduled wakeup, used only for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WakeKey(u64);

#[derive(Debug, Clone, Copy)]
pub struct Wakeup {
    pub at:      SimTime,
    pub process: ProcessId,
    seq:         u64,
}

impl Wakeup {
    pub fn key(&self) -> WakeKey {
        WakeKey(self.seq)
    }
}

impl PartialEq for Wakeup {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Wakeup {}

impl PartialOrd for Wakeup {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Wakeup {
    // BinaryHeap is a max-heap: invert so the earliest (at, seq) is on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .total_cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct Scheduler {
    pub clock: SimClock,
    queue:     BinaryHeap<Wakeup>,
    cancelled: HashSet<u64>,
    next_seq:  u64,
    popped:    u64,
}

impl Scheduler {
    pub fn new(horizon: SimTime) -> Self {
        Self {
            clock:     SimClock::new(horizon),
            queue:     BinaryHeap::new(),
            cancelled: HashSet::new(),
            next_seq:  0,
            popped:    0,
        }
    }

    pub fn now(&self) -> SimTime {
        self.clock.now
    }

    /// Register a resumption of `process` `delay` time units from now.
    /// Negative delays are treated as zero.
    pub fn schedule_after(&mut self, process: ProcessId, delay: SimTime) -> WakeKey {
        let at = self.clock.now + delay.max(0.0);
        let seq = self.next_seq;
        self.next_seq += 1;
        log::trace!("schedule {process:?} at {at:.4} (seq {seq})");
        self.queue.push(Wakeup { at, process, seq });
        WakeKey(seq)
    }

    /// Drop a pending wakeup. Cancelling one that already fired is a no-op.
    pub fn cancel(&mut self, key: WakeKey) {
        if key.0 < self.next_seq {
            self.cancelled.insert(key.0);
        }
    }

    /// Pop the next live wakeup due at or before the horizon and move
    /// the clock to its due time. Returns `None` when nothing is left
    /// inside the horizon.
    pub fn advance(&mut self) -> SimResult<Option<Wakeup>> {
        while let Some(top) = self.queue.peek() {
            if self.clock.is_past_horizon(top.at) {
                return Ok(None);
            }
            let Some(wakeup) = self.queue.pop() else { break };
            if self.cancelled.remove(&wakeup.seq) {
                continue;
            }
            self.clock.advance_to(wakeup.at)?;
            self.popped += 1;
            return Ok(Some(wakeup));
        }
        Ok(None)
    }

    /// Advance repeatedly, handing each wakeup to `resume`, until no
    /// live wakeup is due at or before the horizon. Returns the number
    /// of wakeups delivered.
    pub fn run_until<F>(&mut self, mut resume: F) -> SimResult<u64>
    where
        F: FnMut(&mut Self, Wakeup) -> SimResult<()>,
    {
        let mut delivered = 0;
        while let Some(wakeup) = self.advance()? {
            resume(self, wakeup)?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Wakeups still queued (including cancelled ones not yet discarded).
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Total wakeups delivered so far.
    pub fn delivered(&self) -> u64 {
        self.popped
    }
}
