// Engine player - SamplePlayer that queues triggers for the audio callback

use std::collections::HashSet;
use std::sync::Arc;

use log::warn;
use ringbuf::traits::Producer;

use super::samples::SampleBank;
use super::timing::AudioTiming;
use crate::messaging::channels::{CommandProducer, SilenceSignal};
use crate::messaging::command::AudioCommand;
use crate::playback::sink::SamplePlayer;

/// Resolves instrument names against the sample bank and converts audio-clock
/// seconds to absolute stream frames.
///
/// Stops go through the shared `SilenceSignal`, never through the trigger
/// ring, so a full queue cannot keep old triggers alive.
pub struct EnginePlayer {
    commands: CommandProducer,
    silence: SilenceSignal,
    bank: Arc<SampleBank>,
    timing: AudioTiming,
    /// Instruments already reported as missing
    missing: HashSet<String>,
    dropped: usize,
}

impl EnginePlayer {
    pub fn new(
        commands: CommandProducer,
        silence: SilenceSignal,
        bank: Arc<SampleBank>,
        timing: AudioTiming,
    ) -> Self {
        Self {
            commands,
            silence,
            bank,
            timing,
            missing: HashSet::new(),
            dropped: 0,
        }
    }

    /// Triggers lost because the channel was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn send(&mut self, command: AudioCommand) {
        if self.commands.try_push(command).is_err() {
            self.dropped += 1;
            warn!("Trigger queue full, dropping {:?}", command);
        }
    }
}

impl SamplePlayer for EnginePlayer {
    fn trigger(&mut self, instrument: &str, gain: f32, at_time: f64) {
        let Some(sample) = self.bank.index_of(instrument) else {
            if self.missing.insert(instrument.to_string()) {
                warn!("No sample loaded for instrument '{}'", instrument);
            }
            return;
        };
        let at_frame = self.timing.seconds_to_frames(at_time);
        self.send(AudioCommand::Trigger {
            sample,
            gain,
            at_frame,
            epoch: self.silence.epoch(),
        });
    }

    fn silence_all(&mut self) {
        let epoch = self.silence.request();
        log::debug!("Silence requested (epoch {})", epoch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mixer::Mixer;
    use crate::audio::samples::SampleBuffer;
    use crate::messaging::channels::create_trigger_channel;
    use ringbuf::traits::Consumer;

    fn bank() -> Arc<SampleBank> {
        let mut bank = SampleBank::new();
        for name in ["click", "kick"] {
            bank.insert(SampleBuffer {
                name: name.to_string(),
                frames: vec![1.0],
                sample_rate: 44100,
            });
        }
        Arc::new(bank)
    }

    fn player(tx: CommandProducer) -> EnginePlayer {
        EnginePlayer::new(
            tx,
            SilenceSignal::new(),
            bank(),
            AudioTiming::new(44100.0),
        )
    }

    #[test]
    fn test_trigger_resolves_sample_and_frame() {
        let (tx, mut rx) = create_trigger_channel(8);
        let mut player = player(tx);

        player.trigger("kick", 0.5, 0.5);
        assert_eq!(
            rx.try_pop(),
            Some(AudioCommand::Trigger {
                sample: 1,
                gain: 0.5,
                at_frame: 22050,
                epoch: 0,
            })
        );
    }

    #[test]
    fn test_missing_instrument_sends_nothing() {
        let (tx, mut rx) = create_trigger_channel(8);
        let mut player = player(tx);

        player.trigger("cowbell", 1.0, 0.0);
        player.trigger("cowbell", 1.0, 0.1);
        assert!(rx.try_pop().is_none());
        assert_eq!(player.missing.len(), 1);
    }

    #[test]
    fn test_full_queue_counts_drops() {
        let (tx, mut rx) = create_trigger_channel(1);
        let mut player = player(tx);

        player.trigger("click", 1.0, 0.0);
        player.trigger("click", 1.0, 0.1);
        assert_eq!(player.dropped(), 1);
        assert!(matches!(rx.try_pop(), Some(AudioCommand::Trigger { .. })));
    }

    #[test]
    fn test_silence_survives_full_queue() {
        let (tx, mut rx) = create_trigger_channel(1);
        let silence = SilenceSignal::new();
        let mut player = EnginePlayer::new(
            tx,
            silence.clone(),
            bank(),
            AudioTiming::new(44100.0),
        );
        let mut mixer = Mixer::new(bank(), 44100.0);

        player.trigger("kick", 1.0, 0.0);
        player.silence_all();
        assert_eq!(player.dropped(), 0);

        // one callback: sync the epoch, then drain the ring
        mixer.handle(AudioCommand::Silence {
            epoch: silence.epoch(),
        });
        while let Some(command) = rx.try_pop() {
            mixer.handle(command);
        }
        assert_eq!(mixer.pending_triggers(), 0);

        // triggers sent after the stop still play
        player.trigger("kick", 1.0, 0.0);
        mixer.handle(rx.try_pop().unwrap());
        assert_eq!(mixer.pending_triggers(), 1);
    }
}
