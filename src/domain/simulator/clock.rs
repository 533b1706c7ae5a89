//! Simulated clock and the time-ordered event queue driving it.
//!
//! Events are popped by `(time, band, insertion order)`. Within one band, events sharing a timestamp
//! are processed in the order they were scheduled. The [`EventBand::Late`] band runs after every
//! [`EventBand::Normal`] event of the same instant, which is how completions win over deadlines.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::SimError;

/// Simulated time in seconds.
pub type SimTime = f64;

/// Position of an event inside its instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventBand {
    Normal,
    Late,
}

/// Handle of a scheduled event, unique within one clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u64);

#[derive(Debug)]
struct Scheduled<E> {
    time: SimTime,
    band: EventBand,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, reversed to pop the earliest event first.
        other.time.total_cmp(&self.time).then_with(|| other.band.cmp(&self.band)).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// The single clock of a run. Time never decreases.
#[derive(Debug)]
pub struct Clock<E> {
    now: SimTime,
    heap: BinaryHeap<Scheduled<E>>,
    next_seq: u64,
}

impl<E> Clock<E> {
    pub fn new() -> Self {
        Self { now: 0.0, heap: BinaryHeap::new(), next_seq: 0 }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Enqueues `event` at `time` in the normal band.
    pub fn schedule(&mut self, time: SimTime, event: E) -> Result<EventId, SimError> {
        self.schedule_in(time, EventBand::Normal, event)
    }

    /// Enqueues `event` at `time` after all normal events of that instant.
    pub fn schedule_late(&mut self, time: SimTime, event: E) -> Result<EventId, SimError> {
        self.schedule_in(time, EventBand::Late, event)
    }

    pub fn schedule_in(&mut self, time: SimTime, band: EventBand, event: E) -> Result<EventId, SimError> {
        if time.is_nan() {
            return Err(SimError::Ordering("cannot schedule an event at NaN".to_string()));
        }
        if time < self.now {
            return Err(SimError::Ordering(format!("cannot schedule an event at {} before the current time {}", time, self.now)));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { time, band, seq, event });

        Ok(EventId(seq))
    }

    /// Time of the next pending event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|s| s.time)
    }

    /// Pops the next event if it is due at or before `stop_time`, advancing the clock to it.
    pub fn pop_until(&mut self, stop_time: SimTime) -> Option<(SimTime, E)> {
        if self.peek_time()? > stop_time {
            return None;
        }

        let scheduled = self.heap.pop()?;
        self.now = scheduled.time;

        Some((scheduled.time, scheduled.event))
    }

    /// Moves the clock forward without processing anything.
    pub fn advance_to(&mut self, time: SimTime) -> Result<(), SimError> {
        if time < self.now {
            return Err(SimError::Ordering(format!("cannot move the clock back from {} to {}", self.now, time)));
        }
        if let Some(next) = self.peek_time() {
            if next < time {
                return Err(SimError::Ordering(format!("cannot skip the pending event at {} while advancing to {}", next, time)));
            }
        }

        self.now = time;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drops every pending event and rewinds to zero.
    pub fn reset(&mut self) {
        self.heap.clear();
        self.now = 0.0;
        self.next_seq = 0;
    }
}

impl<E> Default for Clock<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_time_order() {
        let mut clock = Clock::new();
        clock.schedule(3.0, "c").unwrap();
        clock.schedule(1.0, "a").unwrap();
        clock.schedule(2.0, "b").unwrap();

        let order: Vec<&str> = std::iter::from_fn(|| clock.pop_until(10.0)).map(|(_, e)| e).collect();

        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(clock.now(), 3.0);
    }

    #[test]
    fn test_equal_times_are_fifo() {
        let mut clock = Clock::new();
        for i in 0..100 {
            clock.schedule(5.0, i).unwrap();
        }

        let order: Vec<i32> = std::iter::from_fn(|| clock.pop_until(5.0)).map(|(_, e)| e).collect();

        assert_eq!(order, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_late_band_runs_after_normal_band() {
        let mut clock = Clock::new();
        clock.schedule_late(1.0, "deadline").unwrap();
        clock.schedule(1.0, "completion").unwrap();
        clock.schedule(0.5, "earlier").unwrap();

        let order: Vec<&str> = std::iter::from_fn(|| clock.pop_until(1.0)).map(|(_, e)| e).collect();

        assert_eq!(order, vec!["earlier", "completion", "deadline"]);
    }

    #[test]
    fn test_stops_before_events_after_stop_time() {
        let mut clock = Clock::new();
        clock.schedule(1.0, 1).unwrap();
        clock.schedule(2.0, 2).unwrap();

        assert_eq!(clock.pop_until(1.5), Some((1.0, 1)));
        assert_eq!(clock.pop_until(1.5), None);
        assert_eq!(clock.len(), 1);
    }

    #[test]
    fn test_scheduling_in_the_past_fails() {
        let mut clock = Clock::new();
        clock.schedule(2.0, ()).unwrap();
        clock.pop_until(2.0);

        assert!(matches!(clock.schedule(1.0, ()), Err(SimError::Ordering(_))));
        assert!(clock.schedule(2.0, ()).is_ok());
    }

    #[test]
    fn test_advance_cannot_skip_pending_events() {
        let mut clock: Clock<()> = Clock::new();
        clock.schedule(1.0, ()).unwrap();

        assert!(clock.advance_to(2.0).is_err());
        assert!(clock.advance_to(1.0).is_ok());
        assert!(clock.advance_to(0.5).is_err());
    }
}
