// Communication channels lock-free

use crate::messaging::command::AudioCommand;
use crate::messaging::notification::Notification;
use ringbuf::{HeapRb, traits::Split};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub type CommandProducer = ringbuf::HeapProd<AudioCommand>;
pub type CommandConsumer = ringbuf::HeapCons<AudioCommand>;

/// Sample triggers and flushes for the audio callback
pub fn create_trigger_channel(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::<AudioCommand>::new(capacity);
    rb.split()
}

/// Stop requests for the audio callback, outside the trigger ring.
///
/// Requesting silence only bumps an atomic epoch, so it cannot be lost when
/// the ring is full. The callback syncs the mixer to the epoch before
/// draining triggers, and triggers stamped with an older epoch are dropped.
#[derive(Debug, Clone, Default)]
pub struct SilenceSignal(Arc<AtomicU64>);

impl SilenceSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new epoch; returns it
    pub fn request(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn epoch(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}
