//! Global discrete-event timeline.
//!
//! Events are keyed by `(time, sequence)`. The sequence number is assigned
//! at enqueue time, so events scheduled for the same instant pop in the
//! order they were scheduled.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::network::NodeId;
use crate::time::SimTime;

/// Key for ordering events in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventKey {
    /// When the event fires.
    pub time: SimTime,
    /// Enqueue order, for FIFO among equal times.
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => self.sequence.cmp(&other.sequence),
            ord => ord,
        }
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Events popped and dispatched.
    pub events_processed: u64,
    /// Events enqueued.
    pub events_scheduled: u64,
    /// Batches dispatched to nodes.
    pub batches: u64,
    /// Simulated time of the last event.
    pub final_time_ns: f64,
}

/// Events for one node at one instant, in enqueue order.
#[derive(Debug)]
pub struct Batch<E> {
    pub time: SimTime,
    pub node: NodeId,
    pub events: Vec<E>,
}

/// The event queue and the only source of the current time.
#[derive(Debug)]
pub struct Scheduler<E> {
    queue: BTreeMap<EventKey, (NodeId, E)>,
    sequence: u64,
    now: SimTime,
    stats: SchedulerStats,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            sequence: 0,
            now: SimTime::ZERO,
            stats: SchedulerStats::default(),
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Enqueue `event` for `node` at `now + delay_ns`.
    pub fn schedule(&mut self, delay_ns: f64, node: NodeId, event: E) -> EventKey {
        let time = self.now.after(delay_ns);
        self.schedule_at(time, node, event)
    }

    /// Enqueue `event` for `node` at an absolute time, never in the past.
    pub fn schedule_at(&mut self, time: SimTime, node: NodeId, event: E) -> EventKey {
        self.sequence += 1;
        let key = EventKey {
            time: time.max(self.now),
            sequence: self.sequence,
        };
        self.queue.insert(key, (node, event));
        self.stats.events_scheduled += 1;
        key
    }

    /// Pop the earliest event together with every other event for the same
    /// node at the same instant, advancing the clock.
    pub fn pop_batch(&mut self) -> Option<Batch<E>> {
        let (key, (node, first)) = self.queue.pop_first()?;
        self.now = key.time;
        let same_instant: Vec<EventKey> = self
            .queue
            .range(key..)
            .take_while(|(k, _)| k.time == key.time)
            .filter(|(_, (n, _))| *n == node)
            .map(|(k, _)| *k)
            .collect();
        let mut events = Vec::with_capacity(same_instant.len() + 1);
        events.push(first);
        for k in same_instant {
            if let Some((_, event)) = self.queue.remove(&k) {
                events.push(event);
            }
        }
        self.stats.events_processed += events.len() as u64;
        self.stats.batches += 1;
        self.stats.final_time_ns = self.now.as_ns();
        Some(Batch {
            time: self.now,
            node,
            events,
        })
    }
}
