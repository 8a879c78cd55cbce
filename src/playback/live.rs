// Live engine - installs a derived live schedule on an audio clock
//
// Lifecycle: create -> start -> stop -> dispose. Each voice keeps its own
// self-rescheduling timer; every firing schedules the next one at
// `fired.time + interval`, so rounding never accumulates against the clock.

use log::{debug, info};

use super::clock::{AudioClock, TimerHandle};
use super::sink::{SamplePlayer, VisualizationSink};
use crate::sequencer::live::{
    LiveError, LiveSchedule, RhythmConfig, VoiceId, VoiceSchedule, derive_schedule,
};
use crate::sequencer::transport::{Generation, TransportState};

/// Delay between `start` and the first click, leaving room for the audio queue
pub const START_LATENCY: f64 = 0.1;

/// Timer payload of the live engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveTick {
    pub voice: VoiceId,
    pub generation: Generation,
}

#[derive(Debug)]
struct VoiceRuntime {
    schedule: VoiceSchedule,
    step: usize,
    generation: Generation,
    handle: Option<TimerHandle>,
}

pub struct LiveEngine<C, P, V>
where
    C: AudioClock<LiveTick>,
    P: SamplePlayer,
    V: VisualizationSink,
{
    clock: C,
    player: P,
    sink: V,
    config: RhythmConfig,
    state: TransportState,
    generation: Generation,
    voices: Vec<VoiceRuntime>,
}

impl<C, P, V> LiveEngine<C, P, V>
where
    C: AudioClock<LiveTick>,
    P: SamplePlayer,
    V: VisualizationSink,
{
    pub fn new(clock: C, player: P, sink: V, config: RhythmConfig) -> Self {
        Self {
            clock,
            player,
            sink,
            config,
            state: TransportState::Idle,
            generation: Generation::default(),
            voices: Vec::new(),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn config(&self) -> &RhythmConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn sink(&self) -> &V {
        &self.sink
    }

    /// Current step of a voice (the step the next firing will play)
    pub fn step_of(&self, voice: VoiceId) -> Option<usize> {
        self.voices
            .iter()
            .find(|rt| rt.schedule.voice == voice)
            .map(|rt| rt.step)
    }

    /// Start looping. Returns false if already looping.
    pub fn start(&mut self) -> bool {
        if self.state.is_playing() {
            return false;
        }
        self.state = TransportState::Looping;

        let at = self.clock.now() + START_LATENCY;
        let schedule = derive_schedule(&self.config);
        self.voices = schedule
            .voices
            .into_iter()
            .map(|schedule| VoiceRuntime {
                schedule,
                step: 0,
                generation: Generation::default(),
                handle: None,
            })
            .collect();
        for index in 0..self.voices.len() {
            self.install(index, at);
        }

        info!(
            "Live engine started: {} bpm, {}, {} rhythm voice(s)",
            self.config.bpm(),
            self.config.time_signature(),
            self.config.voices().len()
        );
        true
    }

    /// Stop looping and reset every step counter. Returns false if already idle.
    pub fn stop(&mut self) -> bool {
        if !self.state.is_playing() {
            return false;
        }
        for voice in &mut self.voices {
            if let Some(handle) = voice.handle.take() {
                self.clock.cancel(handle);
            }
        }
        self.voices.clear();
        self.generation.bump();
        self.player.silence_all();
        self.state = TransportState::Idle;
        info!("Live engine stopped");
        true
    }

    /// Replace the configuration. While looping, only voices whose step table
    /// changed are torn down and restarted from step 0.
    pub fn set_config(&mut self, config: RhythmConfig) {
        let next = derive_schedule(&config);
        self.config = config;
        if !self.state.is_playing() {
            return;
        }

        let current = LiveSchedule {
            voices: self.voices.iter().map(|rt| rt.schedule.clone()).collect(),
        };
        let changed = current.changed_voices(&next);
        if changed.is_empty() {
            return;
        }
        debug!("Rescheduling live voices: {:?}", changed);

        for id in &changed {
            if let Some(position) = self.voices.iter().position(|rt| rt.schedule.voice == *id) {
                let mut runtime = self.voices.remove(position);
                if let Some(handle) = runtime.handle.take() {
                    self.clock.cancel(handle);
                }
            }
        }

        let at = self.clock.now();
        for schedule in next.voices {
            if !changed.contains(&schedule.voice) {
                continue;
            }
            self.voices.push(VoiceRuntime {
                schedule,
                step: 0,
                generation: Generation::default(),
                handle: None,
            });
            let index = self.voices.len() - 1;
            self.install(index, at);
        }
        self.voices.sort_by_key(|rt| rt.schedule.voice);
    }

    /// Edit the configuration in place and apply it
    pub fn update_config<F>(&mut self, edit: F) -> Result<(), LiveError>
    where
        F: FnOnce(&mut RhythmConfig) -> Result<(), LiveError>,
    {
        let mut config = self.config.clone();
        edit(&mut config)?;
        self.set_config(config);
        Ok(())
    }

    pub fn tap_tempo(&mut self) -> Result<(), LiveError> {
        Err(LiveError::Unimplemented("tap tempo"))
    }

    /// Fire every timer due up to `until`
    pub fn pump(&mut self, until: f64) {
        while let Some(fired) = self.clock.poll(until) {
            self.on_tick(fired.payload, fired.time);
        }
    }

    /// Stop and hand back the collaborators
    pub fn dispose(mut self) -> (C, P, V) {
        self.stop();
        (self.clock, self.player, self.sink)
    }

    fn install(&mut self, index: usize, at: f64) {
        let generation = self.generation.bump();
        let runtime = &mut self.voices[index];
        runtime.generation = generation;
        runtime.step = 0;
        let handle = self.clock.schedule_at(
            at,
            LiveTick {
                voice: runtime.schedule.voice,
                generation,
            },
        );
        runtime.handle = Some(handle);
    }

    fn on_tick(&mut self, tick: LiveTick, time: f64) {
        if !self.state.is_playing() {
            return;
        }
        let Some(runtime) = self
            .voices
            .iter_mut()
            .find(|rt| rt.schedule.voice == tick.voice)
        else {
            return;
        };
        // Late timer from a cancelled run or a replaced voice
        if runtime.generation != tick.generation {
            return;
        }

        let steps = runtime.schedule.steps.len();
        if steps == 0 {
            runtime.handle = None;
            return;
        }
        let step = runtime.step % steps;
        if let Some(hit) = &runtime.schedule.steps[step]
            && hit.is_audible()
        {
            self.player.trigger(&hit.instrument, hit.gain, time);
        }
        self.sink.report_step(tick.voice, step);

        runtime.step = (step + 1) % steps;
        let next = time + runtime.schedule.interval;
        runtime.handle = Some(self.clock.schedule_at(next, tick));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::clock::ManualClock;
    use crate::playback::sink::{StepLog, TriggerLog};
    use crate::sequencer::accent::LiveAccent;
    use crate::sequencer::live::{LiveVoice, RhythmUnit};

    type TestEngine = LiveEngine<ManualClock<LiveTick>, TriggerLog, StepLog>;

    fn engine(config: RhythmConfig) -> TestEngine {
        LiveEngine::new(ManualClock::new(), TriggerLog::new(), StepLog::new(), config)
    }

    fn with_voice(n: u8, m: u8) -> RhythmConfig {
        let mut config = RhythmConfig::default();
        config
            .add_voice(LiveVoice::new(RhythmUnit::new(n, m).unwrap()))
            .unwrap();
        config
    }

    #[test]
    fn test_click_cycle() {
        let mut engine = engine(RhythmConfig::default());
        assert!(engine.start());
        engine.pump(START_LATENCY + 2.01);

        // 120 bpm: clicks at 0.1, 0.6, 1.1, 1.6, 2.1
        let clicks: Vec<_> = engine.player().triggers.iter().map(|t| t.at_time).collect();
        assert_eq!(clicks.len(), 5);
        for (i, time) in clicks.iter().enumerate() {
            assert!((time - (START_LATENCY + 0.5 * i as f64)).abs() < 1e-9);
        }
        assert_eq!(
            engine.sink().steps_of(VoiceId::Click),
            vec![0, 1, 2, 3, 0]
        );
        assert_eq!(engine.player().triggers[0].instrument, "click_high");
        assert_eq!(engine.player().triggers[1].instrument, "click");
    }

    #[test]
    fn test_silent_accent_reports_step_without_trigger() {
        let mut config = RhythmConfig::default();
        config.set_accent(1, LiveAccent::None).unwrap();
        let mut engine = engine(config);
        engine.start();
        engine.pump(START_LATENCY + 1.9);

        assert_eq!(engine.player().triggers.len(), 3);
        assert_eq!(engine.sink().steps_of(VoiceId::Click), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_rhythm_voice_runs_on_its_own_period() {
        // 3 hits per beat at 120 bpm
        let mut engine = engine(with_voice(1, 3));
        engine.start();
        engine.pump(START_LATENCY + 0.99);

        let kicks = engine.player().times_of("kick");
        assert_eq!(kicks.len(), 6);
        let spacing = kicks[1] - kicks[0];
        assert!((spacing - 0.5 / 3.0).abs() < 1e-9);
        assert_eq!(
            engine.sink().steps_of(VoiceId::Rhythm(0)),
            vec![0, 1, 2, 0, 1, 2]
        );
    }

    #[test]
    fn test_no_drift_over_long_runs() {
        let mut engine = engine(with_voice(1, 7));
        engine.start();
        engine.pump(START_LATENCY + 60.0);

        let kicks = engine.player().times_of("kick");
        let interval = 0.5 / 7.0;
        let last = *kicks.last().unwrap();
        let expected = START_LATENCY + interval * (kicks.len() - 1) as f64;
        assert!((last - expected).abs() < 1e-6);
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let mut engine = engine(RhythmConfig::default());
        assert!(!engine.stop());
        assert!(engine.start());
        assert!(!engine.start());
        assert_eq!(engine.clock().pending(), 1);

        assert!(engine.stop());
        assert!(!engine.stop());
        assert_eq!(engine.state(), TransportState::Idle);
        assert_eq!(engine.clock().pending(), 0);
        assert_eq!(engine.player().silenced, 1);
    }

    #[test]
    fn test_stop_cancels_future_clicks() {
        let mut engine = engine(RhythmConfig::default());
        engine.start();
        engine.pump(START_LATENCY + 0.6);
        let before = engine.player().triggers.len();
        engine.stop();
        engine.pump(10.0);
        assert_eq!(engine.player().triggers.len(), before);
    }

    #[test]
    fn test_restart_resets_steps() {
        let mut engine = engine(RhythmConfig::default());
        engine.start();
        engine.pump(START_LATENCY + 1.0);
        engine.stop();
        engine.start();
        assert_eq!(engine.step_of(VoiceId::Click), Some(0));
        engine.pump(engine.clock().now() + START_LATENCY);
        assert_eq!(*engine.sink().steps_of(VoiceId::Click).last().unwrap(), 0);
    }

    #[test]
    fn test_config_change_restarts_only_changed_voices() {
        let mut config = with_voice(1, 2);
        config.add_voice(LiveVoice::new(RhythmUnit::new(1, 4).unwrap())).unwrap();
        let mut engine = engine(config);
        engine.start();
        engine.pump(START_LATENCY + 0.3);
        let click_step = engine.step_of(VoiceId::Click);
        let voice_one_step = engine.step_of(VoiceId::Rhythm(1));
        assert_ne!(voice_one_step, Some(0));

        engine
            .update_config(|c| c.set_unit(0, RhythmUnit::new(1, 3).unwrap()))
            .unwrap();

        assert_eq!(engine.step_of(VoiceId::Rhythm(0)), Some(0));
        assert_eq!(engine.step_of(VoiceId::Click), click_step);
        assert_eq!(engine.step_of(VoiceId::Rhythm(1)), voice_one_step);
        // one timer per voice, never two
        assert_eq!(engine.clock().pending(), 3);
    }

    #[test]
    fn test_bpm_change_restarts_everything() {
        let mut engine = engine(with_voice(1, 2));
        engine.start();
        engine.pump(START_LATENCY + 0.7);
        engine.update_config(|c| {
            c.set_bpm(60.0);
            Ok(())
        })
        .unwrap();

        assert_eq!(engine.step_of(VoiceId::Click), Some(0));
        assert_eq!(engine.step_of(VoiceId::Rhythm(0)), Some(0));
        assert_eq!(engine.clock().pending(), 2);

        let restart = engine.clock().now();
        engine.pump(restart + 1.5);
        let clicks: Vec<_> = engine
            .player()
            .triggers
            .iter()
            .filter(|t| t.instrument.starts_with("click") && t.at_time >= restart)
            .map(|t| t.at_time)
            .collect();
        assert_eq!(clicks.len(), 2);
        assert!((clicks[1] - clicks[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_change_while_idle_is_stored() {
        let mut engine = engine(RhythmConfig::default());
        engine
            .update_config(|c| c.set_numerator(3))
            .unwrap();
        assert_eq!(engine.config().accents().len(), 3);
        assert_eq!(engine.clock().pending(), 0);
    }

    #[test]
    fn test_rejected_edit_leaves_config_untouched() {
        let mut engine = engine(RhythmConfig::default());
        let before = engine.config().clone();
        assert!(engine.update_config(|c| c.set_numerator(0)).is_err());
        assert_eq!(engine.config(), &before);
    }

    #[test]
    fn test_tap_tempo_not_implemented() {
        let mut engine = engine(RhythmConfig::default());
        assert_eq!(
            engine.tap_tempo(),
            Err(LiveError::Unimplemented("tap tempo"))
        );
    }

    #[test]
    fn test_dispose_stops_engine() {
        let mut engine = engine(RhythmConfig::default());
        engine.start();
        let (clock, player, _sink) = engine.dispose();
        assert_eq!(clock.pending(), 0);
        assert_eq!(player.silenced, 1);
    }
}
