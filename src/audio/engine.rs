// Moteur audio - Callback CPAL temps-réel
//
// Le device est ouvert avec son format préféré (F32, I16 ou U16). Tout le
// mixage se fait en f32 mono, puis chaque frame est recopiée sur tous les
// canaux avec conversion via `FromSample<f32>` au moment de l'écriture.
//
// Sur macOS (CoreAudio) le Stream n'est pas Send : l'engine doit rester sur
// le thread qui l'a créé.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{error, info};
use ringbuf::traits::{Consumer, Producer};
use std::sync::{Arc, Mutex};

use super::AudioError;
use super::mixer::Mixer;
use super::samples::SampleBank;
use super::timing::AudioTiming;
use crate::messaging::channels::{CommandConsumer, NotificationProducer, SilenceSignal};
use crate::messaging::command::AudioCommand;
use crate::messaging::notification::{Notification, NotificationCategory};

/// Mono frames rendered per mixer call inside one callback
const SCRATCH_FRAMES: usize = 4096;

pub struct AudioEngine {
    _device: Device,
    _stream: Stream,
    timing: AudioTiming,
    channels: usize,
}

impl AudioEngine {
    /// Open the default output device and start mixing triggers from `commands`
    pub fn start(
        bank: Arc<SampleBank>,
        commands: CommandConsumer,
        silence: SilenceSignal,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported_config = device.default_output_config()?;
        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        info!(
            "Audio config: {} Hz, {} channel(s), {:?}",
            sample_rate, channels, sample_format
        );

        let config: StreamConfig = supported_config.into();
        let timing = AudioTiming::new(sample_rate);
        let mixer = Mixer::new(bank, sample_rate);

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config,
                channels,
                mixer,
                commands,
                silence,
                timing.clone(),
                notification_tx,
            ),
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config,
                channels,
                mixer,
                commands,
                silence,
                timing.clone(),
                notification_tx,
            ),
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config,
                channels,
                mixer,
                commands,
                silence,
                timing.clone(),
                notification_tx,
            ),
            other => return Err(AudioError::UnsupportedFormat(other)),
        }?;

        stream.play()?;

        Ok(Self {
            _device: device,
            _stream: stream,
            timing,
            channels,
        })
    }

    /// Shared frame counter of the running stream
    pub fn timing(&self) -> &AudioTiming {
        &self.timing
    }

    pub fn sample_rate(&self) -> f32 {
        self.timing.sample_rate()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        mut mixer: Mixer,
        mut commands: CommandConsumer,
        silence: SilenceSignal,
        timing: AudioTiming,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let mut scratch = vec![0.0_f32; SCRATCH_FRAMES];

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // ========== SACRED ZONE ==========
                // No allocations, No I/O, No blocking locks

                mixer.handle(AudioCommand::Silence {
                    epoch: silence.epoch(),
                });
                while let Some(command) = commands.try_pop() {
                    mixer.handle(command);
                }

                for chunk in data.chunks_mut(SCRATCH_FRAMES * channels) {
                    let frames = chunk.len() / channels;
                    let mono = &mut scratch[..frames];
                    mixer.render(mono, timing.current_frame());
                    write_mono_to_interleaved(chunk, mono, channels);
                    timing.advance(frames);
                }
                // ========== END SACRED ZONE ==========
            },
            move |err| {
                error!("Audio stream error: {}", err);
                if let Ok(mut tx) = notification_tx.try_lock() {
                    let notification = Notification::error(
                        NotificationCategory::Audio,
                        format!("Audio stream error: {}", err),
                    );
                    let _ = tx.try_push(notification);
                }
            },
            None,
        )?;

        Ok(stream)
    }
}

/// Copy each mono frame to every output channel, converting to the device format
#[inline]
fn write_mono_to_interleaved<T>(output: &mut [T], mono: &[f32], channels: usize)
where
    T: Sample + FromSample<f32>,
{
    for (frame, &value) in output.chunks_mut(channels).zip(mono) {
        let converted = T::from_sample(value);
        for slot in frame.iter_mut() {
            *slot = converted;
        }
    }
}
