// Collaborators driven by the playback engines

use crate::sequencer::live::VoiceId;

/// Sample playback primitive.
///
/// Triggers are fire-and-forget and independent of each other: the same
/// instrument may be triggered from several voices at once.
pub trait SamplePlayer {
    fn trigger(&mut self, instrument: &str, gain: f32, at_time: f64);

    /// Drop every pending trigger and cut every sounding sample
    fn silence_all(&mut self);
}

/// Receives the current step of each voice for display
pub trait VisualizationSink {
    fn report_step(&mut self, voice: VoiceId, step: usize);

    /// Called when the training driver enters a new program step
    fn report_loop(&mut self, _step: usize, _count_in: bool) {}
}

/// Visualization sink that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl VisualizationSink for NullSink {
    fn report_step(&mut self, _voice: VoiceId, _step: usize) {}
}

/// One recorded sample trigger
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRecord {
    pub instrument: String,
    pub gain: f32,
    pub at_time: f64,
}

/// Sample player that records triggers instead of playing them.
/// Used for offline rendering and in tests.
#[derive(Debug, Default, Clone)]
pub struct TriggerLog {
    pub triggers: Vec<TriggerRecord>,
    pub silenced: usize,
}

impl TriggerLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn times_of(&self, instrument: &str) -> Vec<f64> {
        self.triggers
            .iter()
            .filter(|t| t.instrument == instrument)
            .map(|t| t.at_time)
            .collect()
    }
}

impl SamplePlayer for TriggerLog {
    fn trigger(&mut self, instrument: &str, gain: f32, at_time: f64) {
        self.triggers.push(TriggerRecord {
            instrument: instrument.to_string(),
            gain,
            at_time,
        });
    }

    fn silence_all(&mut self) {
        self.silenced += 1;
    }
}

/// Visualization sink that records every report
#[derive(Debug, Default, Clone)]
pub struct StepLog {
    pub steps: Vec<(VoiceId, usize)>,
    pub loops: Vec<(usize, bool)>,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps reported for one voice, in order
    pub fn steps_of(&self, voice: VoiceId) -> Vec<usize> {
        self.steps
            .iter()
            .filter(|(v, _)| *v == voice)
            .map(|(_, step)| *step)
            .collect()
    }
}

impl VisualizationSink for StepLog {
    fn report_step(&mut self, voice: VoiceId, step: usize) {
        self.steps.push((voice, step));
    }

    fn report_loop(&mut self, step: usize, count_in: bool) {
        self.loops.push((step, count_in));
    }
}
