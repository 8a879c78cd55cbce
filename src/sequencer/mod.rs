// Sequencer module - musical time, accents and live rhythm scheduling

pub mod accent;
pub mod instruments;
pub mod live;
pub mod timeline;
pub mod transport;

pub use accent::{LiveAccent, TrainingAccent};
pub use instruments::{DEFAULT_SOUND, Hit, live_click, training_click};
pub use live::{
    LiveError, LiveSchedule, LiveVoice, RhythmConfig, RhythmUnit, VoiceId, derive_schedule,
};
pub use timeline::{
    Denominator, NoteValue, TimeSignature, seconds_per_beat, subdivision_seconds,
    training_seconds_per_beat,
};
pub use transport::{Generation, TransportState};
