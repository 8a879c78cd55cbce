// Stream clock - AudioClock backed by the output stream's frame counter

use super::timing::AudioTiming;
use crate::playback::clock::{AudioClock, Fired, ManualClock, TimerHandle};

/// How far ahead of the stream position timers are handed out. Triggers are
/// sent early and start on their exact frame in the mixer.
pub const LOOKAHEAD: f64 = 0.05;

/// `now()` follows the rendered frames; timers live in a `ManualClock` queue
/// and fire once they fall inside the polling window.
pub struct StreamClock<T> {
    timing: AudioTiming,
    timers: ManualClock<T>,
}

impl<T> StreamClock<T> {
    pub fn new(timing: AudioTiming) -> Self {
        Self {
            timing,
            timers: ManualClock::new(),
        }
    }

    /// Polling horizon for the current stream position
    pub fn horizon(&self) -> f64 {
        self.timing.seconds() + LOOKAHEAD
    }
}

impl<T> AudioClock<T> for StreamClock<T> {
    fn now(&self) -> f64 {
        self.timing.seconds()
    }

    fn schedule_at(&mut self, time: f64, payload: T) -> TimerHandle {
        self.timers.schedule_at(time, payload)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.cancel(handle)
    }

    /// Hands out timers due by `until`; the stream time is not affected
    fn poll(&mut self, until: f64) -> Option<Fired<T>> {
        self.timers.pop_due(until)
    }

    fn pending(&self) -> usize {
        self.timers.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_follows_stream_position() {
        let timing = AudioTiming::new(1000.0);
        let clock: StreamClock<u8> = StreamClock::new(timing.clone());
        assert_eq!(clock.now(), 0.0);
        timing.advance(250);
        assert_eq!(clock.now(), 0.25);
        assert!((clock.horizon() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_poll_uses_window_without_moving_time() {
        let timing = AudioTiming::new(1000.0);
        let mut clock = StreamClock::new(timing.clone());
        clock.schedule_at(0.04, 'a');
        clock.schedule_at(0.2, 'b');

        let fired = clock.poll(clock.horizon()).unwrap();
        assert_eq!(fired.payload, 'a');
        assert!(clock.poll(clock.horizon()).is_none());
        assert_eq!(clock.now(), 0.0);

        timing.advance(160);
        assert_eq!(clock.poll(clock.horizon()).map(|f| f.payload), Some('b'));
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_cancel_delegates() {
        let mut clock = StreamClock::new(AudioTiming::new(1000.0));
        let handle = clock.schedule_at(0.01, ());
        assert!(clock.cancel(handle));
        assert!(clock.poll(1.0).is_none());
    }
}
