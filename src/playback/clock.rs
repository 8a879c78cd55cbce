// Audio clock abstraction
// Timers carry a payload instead of a callback: the owner polls the clock and
// dispatches fired payloads itself, so no closure ever borrows engine state.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Handle of a scheduled timer, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// A timer that reached its due time
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<T> {
    pub handle: TimerHandle,
    /// Scheduled time (seconds on the audio clock), not the poll time
    pub time: f64,
    pub payload: T,
}

/// Host audio clock contract.
///
/// `poll` hands out due timers in time order (ties in scheduling order) and
/// never returns a timer scheduled later than `until`. A cancelled timer is
/// never returned.
pub trait AudioClock<T> {
    /// Current audio time in seconds
    fn now(&self) -> f64;

    fn schedule_at(&mut self, time: f64, payload: T) -> TimerHandle;

    /// Returns false if the timer already fired or was cancelled
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    fn poll(&mut self, until: f64) -> Option<Fired<T>>;

    fn pending(&self) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct Due {
    time: f64,
    seq: u64,
}

impl PartialEq for Due {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Due {}

impl PartialOrd for Due {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Due {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Deterministic clock driven by explicit polling.
///
/// Time only moves when a timer fires or when `poll` drains everything up to
/// `until`, which makes it the reference clock for tests and offline rendering.
/// It also serves as the timer queue behind the hardware clock.
#[derive(Debug)]
pub struct ManualClock<T> {
    now: f64,
    next_seq: u64,
    queue: BTreeMap<Due, (TimerHandle, T)>,
    index: HashMap<TimerHandle, Due>,
}

impl<T> ManualClock<T> {
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    pub fn starting_at(now: f64) -> Self {
        Self {
            now,
            next_seq: 0,
            queue: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Move the clock forward without firing anything
    pub fn advance_to(&mut self, time: f64) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Pop the earliest timer due at or before `until`, leaving the clock time untouched
    pub fn pop_due(&mut self, until: f64) -> Option<Fired<T>> {
        let due = *self.queue.keys().next()?;
        if due.time > until {
            return None;
        }
        let (handle, payload) = self.queue.remove(&due)?;
        self.index.remove(&handle);
        Some(Fired {
            handle,
            time: due.time,
            payload,
        })
    }
}

impl<T> Default for ManualClock<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AudioClock<T> for ManualClock<T> {
    fn now(&self) -> f64 {
        self.now
    }

    fn schedule_at(&mut self, time: f64, payload: T) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        let handle = TimerHandle(seq);
        let due = Due { time, seq };
        self.queue.insert(due, (handle, payload));
        self.index.insert(handle, due);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.index.remove(&handle) {
            Some(due) => self.queue.remove(&due).is_some(),
            None => false,
        }
    }

    /// Fires the next due timer and moves the clock to its time. Once nothing
    /// is due, the clock rests at `until`.
    fn poll(&mut self, until: f64) -> Option<Fired<T>> {
        match self.pop_due(until) {
            Some(fired) => {
                self.advance_to(fired.time);
                Some(fired)
            }
            None => {
                self.advance_to(until);
                None
            }
        }
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_time_order() {
        let mut clock = ManualClock::new();
        clock.schedule_at(0.3, "c");
        clock.schedule_at(0.1, "a");
        clock.schedule_at(0.2, "b");

        let mut order = Vec::new();
        while let Some(fired) = clock.poll(1.0) {
            assert_eq!(clock.now(), fired.time);
            order.push(fired.payload);
        }
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(clock.now(), 1.0);
    }

    #[test]
    fn test_ties_keep_scheduling_order() {
        let mut clock = ManualClock::new();
        clock.schedule_at(0.5, 1);
        clock.schedule_at(0.5, 2);
        clock.schedule_at(0.5, 3);

        let fired: Vec<_> = std::iter::from_fn(|| clock.poll(0.5))
            .map(|f| f.payload)
            .collect();
        assert_eq!(fired, vec![1, 2, 3]);
    }

    #[test]
    fn test_poll_respects_until() {
        let mut clock = ManualClock::new();
        clock.schedule_at(2.0, ());
        assert!(clock.poll(1.0).is_none());
        assert_eq!(clock.now(), 1.0);
        assert_eq!(clock.pending(), 1);
        assert!(clock.poll(2.0).is_some());
    }

    #[test]
    fn test_cancel() {
        let mut clock = ManualClock::new();
        let keep = clock.schedule_at(0.1, "keep");
        let drop = clock.schedule_at(0.2, "drop");

        assert!(clock.cancel(drop));
        assert!(!clock.cancel(drop));

        let fired = clock.poll(1.0).unwrap();
        assert_eq!(fired.handle, keep);
        assert!(clock.poll(1.0).is_none());
        assert!(!clock.cancel(keep));
    }

    #[test]
    fn test_time_never_goes_backwards() {
        let mut clock = ManualClock::starting_at(5.0);
        clock.schedule_at(1.0, ());
        let fired = clock.poll(6.0).unwrap();
        assert_eq!(fired.time, 1.0);
        assert_eq!(clock.now(), 5.0);
    }
}
