// Metal Metronome - Library exports for the CLI, tests and benchmarks

pub mod audio;
pub mod messaging;
pub mod playback;
pub mod project;
pub mod sequencer;
pub mod training;

// Re-export commonly used types for convenience
pub use audio::{AudioEngine, AudioError, AudioTiming, EnginePlayer, SampleBank, StreamClock};
pub use messaging::{
    Notification, Notify, SilenceSignal, create_notification_channel, create_trigger_channel,
};
pub use playback::{
    AudioClock, LiveEngine, ManualClock, SamplePlayer, TrainingDriver, VisualizationSink,
};
pub use project::{PresetLibrary, ProjectError, ProjectManager, TrainingSnapshot};
pub use sequencer::{
    LiveAccent, NoteValue, RhythmConfig, RhythmUnit, TimeSignature, TrainingAccent,
    TransportState, VoiceId,
};
pub use training::{
    BeatMap, CompiledProgram, LoopMode, TempoChangeProgram, TrainingSession, compile, generate,
};
