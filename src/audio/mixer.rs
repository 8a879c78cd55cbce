// Mixer - sample-accurate one-shot playback inside the audio callback
//
// SACRED ZONE rules apply to `handle` and `render`: no allocation, no I/O,
// no blocking. Voice and pending lists are pre-allocated and never grow.

use std::sync::Arc;

use super::samples::SampleBank;
use crate::messaging::command::AudioCommand;

/// Samples sounding at the same time
pub const MAX_VOICES: usize = 64;

/// Triggers waiting for their start frame
pub const MAX_PENDING: usize = 256;

#[derive(Debug, Clone, Copy)]
struct Voice {
    sample: usize,
    position: f64,
    /// Source frames per output frame
    step: f64,
    gain: f32,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    sample: usize,
    gain: f32,
    at_frame: u64,
}

#[inline]
fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Saturation douce (tanh) pour éviter le clipping dur quand les voix s'empilent
#[inline]
fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

pub struct Mixer {
    bank: Arc<SampleBank>,
    output_rate: f64,
    voices: Vec<Voice>,
    pending: Vec<Pending>,
    master: f32,
    /// Latest silence epoch seen
    epoch: u64,
}

impl Mixer {
    pub fn new(bank: Arc<SampleBank>, output_rate: f32) -> Self {
        Self {
            bank,
            output_rate: output_rate as f64,
            voices: Vec::with_capacity(MAX_VOICES),
            pending: Vec::with_capacity(MAX_PENDING),
            master: 0.8,
            epoch: 0,
        }
    }

    pub fn set_master(&mut self, gain: f32) {
        self.master = gain.clamp(0.0, 1.0);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn pending_triggers(&self) -> usize {
        self.pending.len()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Move to a newer silence epoch, dropping everything from older ones
    fn enter_epoch(&mut self, epoch: u64) {
        if epoch > self.epoch {
            self.epoch = epoch;
            self.voices.clear();
            self.pending.clear();
        }
    }

    pub fn handle(&mut self, command: AudioCommand) {
        match command {
            AudioCommand::Trigger {
                sample,
                gain,
                at_frame,
                epoch,
            } => {
                if epoch < self.epoch {
                    // sent before the last stop
                    return;
                }
                self.enter_epoch(epoch);
                if self.bank.get(sample).is_none() || gain <= 0.0 {
                    return;
                }
                if self.pending.len() == MAX_PENDING {
                    // queue full: drop the trigger rather than allocate
                    return;
                }
                self.pending.push(Pending {
                    sample,
                    gain,
                    at_frame,
                });
            }
            AudioCommand::Silence { epoch } => self.enter_epoch(epoch),
        }
    }

    /// Render mono output; `out[0]` is frame `start_frame` of the stream
    pub fn render(&mut self, out: &mut [f32], start_frame: u64) {
        for (offset, slot) in out.iter_mut().enumerate() {
            self.start_due(start_frame + offset as u64);

            let mut mix = 0.0;
            let mut i = 0;
            while i < self.voices.len() {
                let voice = &mut self.voices[i];
                let Some(sample) = self.bank.get(voice.sample) else {
                    self.voices.swap_remove(i);
                    continue;
                };
                let data = &sample.frames;
                let index = voice.position as usize;
                if index >= data.len() {
                    self.voices.swap_remove(i);
                    continue;
                }
                let fraction = voice.position.fract() as f32;
                let a = data[index];
                let b = data.get(index + 1).copied().unwrap_or(0.0);
                mix += (a + (b - a) * fraction) * voice.gain;
                voice.position += voice.step;
                i += 1;
            }

            *slot = soft_clip(flush_denormals_to_zero(mix * self.master));
        }
    }

    fn start_due(&mut self, frame: u64) {
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].at_frame > frame {
                i += 1;
                continue;
            }
            let trigger = self.pending.swap_remove(i);
            let step = self
                .bank
                .get(trigger.sample)
                .map(|s| s.sample_rate as f64 / self.output_rate)
                .unwrap_or(1.0);
            let voice = Voice {
                sample: trigger.sample,
                position: 0.0,
                step,
                gain: trigger.gain,
            };
            if self.voices.len() < MAX_VOICES {
                self.voices.push(voice);
            } else if let Some(oldest) = self
                .voices
                .iter_mut()
                .max_by(|a, b| a.position.total_cmp(&b.position))
            {
                // steal the voice furthest into its sample
                *oldest = voice;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::samples::SampleBuffer;

    fn bank() -> Arc<SampleBank> {
        let mut bank = SampleBank::new();
        bank.insert(SampleBuffer {
            name: "click".into(),
            frames: vec![0.5, 0.5, 0.5],
            sample_rate: 48000,
        });
        Arc::new(bank)
    }

    fn mixer() -> Mixer {
        let mut mixer = Mixer::new(bank(), 48000.0);
        mixer.set_master(1.0);
        mixer
    }

    #[test]
    fn test_trigger_starts_on_its_frame() {
        let mut mixer = mixer();
        mixer.handle(AudioCommand::Trigger {
            sample: 0,
            gain: 1.0,
            at_frame: 102,
            epoch: 0,
        });
        let mut out = [0.0; 8];
        mixer.render(&mut out, 100);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
        assert!((out[2] - 0.5_f32.tanh()).abs() < 1e-6);
        assert!(out[4] > 0.0);
        assert_eq!(out[5], 0.0);
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_late_trigger_starts_immediately() {
        let mut mixer = mixer();
        mixer.handle(AudioCommand::Trigger {
            sample: 0,
            gain: 0.5,
            at_frame: 10,
            epoch: 0,
        });
        let mut out = [0.0; 2];
        mixer.render(&mut out, 50);
        assert!((out[0] - 0.25_f32.tanh()).abs() < 1e-6);
    }

    #[test]
    fn test_overlapping_triggers_sum() {
        let mut mixer = mixer();
        for _ in 0..2 {
            mixer.handle(AudioCommand::Trigger {
                sample: 0,
                gain: 1.0,
                at_frame: 0,
                epoch: 0,
            });
        }
        let mut out = [0.0; 1];
        mixer.render(&mut out, 0);
        assert!((out[0] - 1.0_f32.tanh()).abs() < 1e-6);
    }

    fn trigger(at_frame: u64, epoch: u64) -> AudioCommand {
        AudioCommand::Trigger {
            sample: 0,
            gain: 1.0,
            at_frame,
            epoch,
        }
    }

    #[test]
    fn test_silence_and_invalid_triggers() {
        let mut mixer = mixer();
        mixer.handle(AudioCommand::Trigger {
            sample: 7,
            gain: 1.0,
            at_frame: 0,
            epoch: 0,
        });
        mixer.handle(AudioCommand::Trigger {
            sample: 0,
            gain: 0.0,
            at_frame: 0,
            epoch: 0,
        });
        assert_eq!(mixer.pending_triggers(), 0);

        mixer.handle(trigger(1000, 0));
        mixer.handle(AudioCommand::Silence { epoch: 1 });
        let mut out = [0.0; 4];
        mixer.render(&mut out, 1000);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(mixer.epoch(), 1);
    }

    #[test]
    fn test_stale_triggers_dropped_after_silence() {
        let mut mixer = mixer();
        mixer.handle(trigger(0, 0));
        let mut out = [0.0; 1];
        mixer.render(&mut out, 0);
        assert_eq!(mixer.active_voices(), 1);

        mixer.handle(AudioCommand::Silence { epoch: 2 });
        assert_eq!(mixer.active_voices(), 0);
        // still queued from before the stop
        mixer.handle(trigger(1, 1));
        assert_eq!(mixer.pending_triggers(), 0);
        // repeated silence for the same epoch keeps new triggers
        mixer.handle(trigger(1, 2));
        mixer.handle(AudioCommand::Silence { epoch: 2 });
        assert_eq!(mixer.pending_triggers(), 1);
    }

    #[test]
    fn test_newer_trigger_enters_its_epoch() {
        let mut mixer = mixer();
        mixer.handle(trigger(50, 0));
        // a trigger sent after a stop the callback has not synced yet
        mixer.handle(trigger(60, 1));
        assert_eq!(mixer.epoch(), 1);
        assert_eq!(mixer.pending_triggers(), 1);
        mixer.handle(AudioCommand::Silence { epoch: 1 });
        assert_eq!(mixer.pending_triggers(), 1);
    }

    #[test]
    fn test_voice_limit_steals() {
        let mut mixer = mixer();
        for frame in 0..(MAX_VOICES as u64 + 4) {
            mixer.handle(AudioCommand::Trigger {
                sample: 0,
                gain: 0.1,
                at_frame: frame / 40,
                epoch: 0,
            });
        }
        let mut out = [0.0; 2];
        mixer.render(&mut out, 0);
        assert_eq!(mixer.active_voices(), MAX_VOICES);
    }
}
