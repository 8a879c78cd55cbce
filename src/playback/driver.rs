// Training driver - plays a compiled program step by step on an audio clock
//
// Within a step every voice starts at the same timestamp and each event is
// offset by the summed durations of the events before it in that voice. The
// next step starts when the longest voice ends; shorter voices are padded
// with silence.

use log::{debug, info};

use super::clock::{AudioClock, TimerHandle};
use super::live::START_LATENCY;
use super::sink::{SamplePlayer, VisualizationSink};
use crate::sequencer::instruments::{Hit, training_click};
use crate::sequencer::live::VoiceId;
use crate::sequencer::transport::{Generation, TransportState};
use crate::training::compiler::{CompiledProgram, CompiledStep};

/// A trigger placed on the timeline of one step
#[derive(Debug, Clone, PartialEq)]
pub struct TimedTrigger {
    pub voice: VoiceId,
    /// Position of the event within its voice
    pub index: usize,
    pub time: f64,
    pub hit: Hit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepLayout {
    pub triggers: Vec<TimedTrigger>,
    /// Start of the next step
    pub end: f64,
}

/// Place every event of a step relative to `start`
pub fn layout_step(step: &CompiledStep, start: f64) -> StepLayout {
    let mut triggers = Vec::new();
    let mut end = start;

    let mut time = start;
    for (index, click) in step.clicks.iter().enumerate() {
        triggers.push(TimedTrigger {
            voice: VoiceId::Click,
            index,
            time,
            hit: training_click(click.accent),
        });
        time += click.duration();
    }
    end = end.max(time);

    for (voice, events) in step.voices.iter().enumerate() {
        let mut time = start;
        for (index, event) in events.iter().enumerate() {
            triggers.push(TimedTrigger {
                voice: VoiceId::Rhythm(voice),
                index,
                time,
                hit: Hit::new(event.sound.clone(), event.volume),
            });
            time += event.duration();
        }
        end = end.max(time);
    }

    StepLayout { triggers, end }
}

/// Timer payload of the training driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverTick {
    Trigger { generation: Generation, index: usize },
    StepEnd { generation: Generation },
}

struct Run {
    program: CompiledProgram,
    step: usize,
    layout: StepLayout,
    handles: Vec<TimerHandle>,
}

pub struct TrainingDriver<C, P, V>
where
    C: AudioClock<DriverTick>,
    P: SamplePlayer,
    V: VisualizationSink,
{
    clock: C,
    player: P,
    sink: V,
    state: TransportState,
    generation: Generation,
    run: Option<Run>,
}

impl<C, P, V> TrainingDriver<C, P, V>
where
    C: AudioClock<DriverTick>,
    P: SamplePlayer,
    V: VisualizationSink,
{
    pub fn new(clock: C, player: P, sink: V) -> Self {
        Self {
            clock,
            player,
            sink,
            state: TransportState::Idle,
            generation: Generation::default(),
            run: None,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Index of the step being played
    pub fn current_step(&self) -> Option<usize> {
        self.run.as_ref().map(|run| run.step)
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

    /// Start playing `program` shortly after now. Returns false if a run is
    /// already in flight or the program is empty.
    pub fn start(&mut self, program: CompiledProgram) -> bool {
        if self.state.is_playing() || program.is_empty() {
            return false;
        }
        self.generation.bump();
        self.state = TransportState::Looping;
        info!(
            "Training playback started: {} steps, {:.1}s",
            program.len(),
            program.total_seconds()
        );

        let at = self.clock.now() + START_LATENCY;
        self.run = Some(Run {
            program,
            step: 0,
            layout: StepLayout {
                triggers: Vec::new(),
                end: at,
            },
            handles: Vec::new(),
        });
        self.begin_step(at);
        true
    }

    /// Cancel every pending trigger and silence sounding samples.
    /// Returns false if nothing was playing.
    pub fn stop(&mut self) -> bool {
        if !self.state.is_playing() {
            return false;
        }
        if let Some(run) = self.run.take() {
            for handle in run.handles {
                self.clock.cancel(handle);
            }
        }
        self.generation.bump();
        self.player.silence_all();
        self.state = TransportState::Idle;
        info!("Training playback stopped");
        true
    }

    /// Fire every timer due up to `until`
    pub fn pump(&mut self, until: f64) {
        while let Some(fired) = self.clock.poll(until) {
            self.on_tick(fired.payload, fired.time);
        }
    }

    pub fn dispose(mut self) -> (C, P, V) {
        self.stop();
        (self.clock, self.player, self.sink)
    }

    fn begin_step(&mut self, start: f64) {
        let generation = self.generation;
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let step = &run.program.steps[run.step];
        let count_in = step.is_count_in();
        run.layout = layout_step(step, start);
        run.handles.clear();
        for (index, trigger) in run.layout.triggers.iter().enumerate() {
            let handle = self
                .clock
                .schedule_at(trigger.time, DriverTick::Trigger { generation, index });
            run.handles.push(handle);
        }
        let handle = self
            .clock
            .schedule_at(run.layout.end, DriverTick::StepEnd { generation });
        run.handles.push(handle);

        debug!(
            "Step {} at {:.3}s: {} triggers, next at {:.3}s",
            run.step,
            start,
            run.layout.triggers.len(),
            run.layout.end
        );
        self.sink.report_loop(run.step, count_in);
    }

    fn on_tick(&mut self, tick: DriverTick, time: f64) {
        if !self.state.is_playing() {
            return;
        }
        match tick {
            DriverTick::Trigger { generation, index } => {
                if generation != self.generation {
                    return;
                }
                let Some(trigger) = self
                    .run
                    .as_ref()
                    .and_then(|run| run.layout.triggers.get(index))
                else {
                    return;
                };
                if trigger.hit.is_audible() {
                    self.player
                        .trigger(&trigger.hit.instrument, trigger.hit.gain, time);
                }
                self.sink.report_step(trigger.voice, trigger.index);
            }
            DriverTick::StepEnd { generation } => {
                if generation != self.generation {
                    return;
                }
                let finished = match self.run.as_mut() {
                    Some(run) => {
                        run.step += 1;
                        run.step >= run.program.len()
                    }
                    None => true,
                };
                if finished {
                    self.run = None;
                    self.state = TransportState::Idle;
                    info!("Training playback finished");
                } else {
                    self.begin_step(time);
                }
            }
        }
    }
}
