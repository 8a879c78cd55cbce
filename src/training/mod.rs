// Training mode - multi-section programs with tempo ramps

pub mod addressing;
pub mod beat_map;
pub mod compiler;
pub mod section;
pub mod session;
pub mod tempo_program;

pub use beat_map::{BeatMap, BeatMapError, SectionSnapshot};
pub use compiler::{
    ClickEvent, CompileError, CompiledProgram, CompiledStep, StepKind, VoiceNoteEvent, compile,
};
pub use section::{Beat, Part, PulseField, Section};
pub use session::{SessionError, TrainingSession};
pub use tempo_program::{LoopMode, LoopStep, TempoChangeProgram, TempoProgramError, generate};
